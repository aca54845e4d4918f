//! Settings structs, one per `[section]` of the INI file.

use crate::executor::QueuePolicy;

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub loader: LoaderSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

/// `[loader]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Number of decode workers (and gate permits).
    pub workers: usize,
    pub queue_policy: QueuePolicy,
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache budget in bytes. `None` means `auto` (an eighth of system memory).
    pub memory_size: Option<usize>,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: String,
    pub file: String,
}
