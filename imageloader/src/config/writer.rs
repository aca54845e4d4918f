//! INI serialization: `ConfigFile` → commented INI text.

use super::settings::ConfigFile;
use super::size::format_size;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let memory_size = config
        .cache
        .memory_size
        .map(format_size)
        .unwrap_or_else(|| "auto".to_string());

    format!(
        r#"[loader]
; Number of concurrent decode workers. Also caps in-flight decodes.
workers = {workers}
; Order pending requests are served in:
;   lifo - newest first (suits scrolling lists)
;   fifo - oldest first
queue_policy = {queue_policy}

[cache]
; Memory budget for decoded images, e.g. 256MB or 1GB.
; auto uses one eighth of system memory.
memory_size = {memory_size}

[logging]
directory = {log_dir}
file = {log_file}
"#,
        workers = config.loader.workers,
        queue_policy = config.loader.queue_policy,
        memory_size = memory_size,
        log_dir = config.logging.directory,
        log_file = config.logging.file,
    )
}
