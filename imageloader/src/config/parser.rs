//! INI parsing: `Ini` → `ConfigFile`.
//!
//! Starts from defaults and overrides whatever the file sets. Unknown
//! sections and keys are ignored.

use ini::Ini;

use super::defaults::clamp_worker_count;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [loader]
    if let Some(section) = ini.section(Some("loader")) {
        if let Some(v) = section.get("workers") {
            let workers: usize = v
                .trim()
                .parse()
                .map_err(|_| invalid("loader", "workers", v, "must be a positive integer"))?;
            if workers == 0 {
                return Err(invalid("loader", "workers", v, "must be at least 1"));
            }
            config.loader.workers = clamp_worker_count(workers);
        }
        if let Some(v) = section.get("queue_policy") {
            config.loader.queue_policy = v
                .parse()
                .map_err(|e: crate::executor::ParsePolicyError| {
                    invalid("loader", "queue_policy", v, e.to_string())
                })?;
        }
    }

    // [cache]
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("memory_size") {
            config.cache.memory_size = if v.trim().eq_ignore_ascii_case("auto") {
                None
            } else {
                Some(parse_size(v).map_err(|e| invalid("cache", "memory_size", v, e.to_string()))?)
            };
        }
    }

    // [logging]
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            if !v.trim().is_empty() {
                config.logging.directory = v.trim().to_string();
            }
        }
        if let Some(v) = section.get("file") {
            if !v.trim().is_empty() {
                config.logging.file = v.trim().to_string();
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::QueuePolicy;

    fn parse(text: &str) -> Result<ConfigFile, ConfigFileError> {
        parse_ini(&Ini::load_from_str(text).unwrap())
    }

    #[test]
    fn test_empty_is_default() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            "[loader]\nworkers = 4\nqueue_policy = FIFO\n\n\
             [cache]\nmemory_size = 256MB\n\n\
             [logging]\ndirectory = /var/log/img\nfile = loader.log\n",
        )
        .unwrap();

        assert_eq!(config.loader.workers, 4);
        assert_eq!(config.loader.queue_policy, QueuePolicy::Fifo);
        assert_eq!(config.cache.memory_size, Some(256 * 1024 * 1024));
        assert_eq!(config.logging.directory, "/var/log/img");
        assert_eq!(config.logging.file, "loader.log");
    }

    #[test]
    fn test_auto_memory_size() {
        let config = parse("[cache]\nmemory_size = auto\n").unwrap();
        assert_eq!(config.cache.memory_size, None);
    }

    #[test]
    fn test_invalid_workers() {
        for value in ["zero", "0", "-1"] {
            let err = parse(&format!("[loader]\nworkers = {}\n", value)).unwrap_err();
            match err {
                ConfigFileError::InvalidValue { section, key, .. } => {
                    assert_eq!(section, "loader");
                    assert_eq!(key, "workers");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_invalid_policy() {
        let err = parse("[loader]\nqueue_policy = random\n").unwrap_err();
        assert!(err.to_string().contains("loader.queue_policy"));
    }

    #[test]
    fn test_invalid_memory_size() {
        let err = parse("[cache]\nmemory_size = lots\n").unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = parse("[loader]\ncolour = blue\n[extra]\nx = 1\n").unwrap();
        assert_eq!(config, ConfigFile::default());
    }
}
