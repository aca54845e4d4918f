//! Configuration.
//!
//! [`LoaderConfig`] is what an [`ImageLoader`](crate::ImageLoader) is built
//! from. [`ConfigFile`] is the user-editable INI form of it, plus logging
//! settings, stored at `~/.imageloader/config.ini`:
//!
//! ```ini
//! [loader]
//! workers = 4
//! queue_policy = lifo
//!
//! [cache]
//! memory_size = 256MB
//!
//! [logging]
//! directory = logs
//! file = imageloader.log
//! ```

mod defaults;
mod file;
mod loader;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::{
    default_cache_budget, recommended_worker_count, CACHE_BUDGET_DIVISOR, DEFAULT_LOG_DIRECTORY,
    DEFAULT_LOG_FILE, DEFAULT_QUEUE_POLICY, DEFAULT_WORKER_COUNT, MAX_WORKER_COUNT,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use loader::LoaderConfig;
pub use settings::{CacheSettings, ConfigFile, LoaderSettings, LoggingSettings};
pub use size::{format_size, parse_size, SizeParseError};
