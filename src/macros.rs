// src/macros.rs

/// Logs a line tagged with the pipeline stage that produced it.
/// Usage:
/// ```rust
/// use ha_ingest::stage_log;
/// use log::Level;
/// stage_log!(Level::Info, "fetch", "copied {} bytes", 4096);
/// ```
/// Logs like (timestamp, level and pid are added by the fern dispatch):
/// [2025-04-25T16:32:10+02:00][INFO ][ha_ingest::fetch][pid=4568] [fetch] copied 4096 bytes
#[macro_export]
macro_rules! stage_log {
    ($level:expr, $stage:expr, $fmt:expr $(, $($arg:tt)+)?) => {
        log::log!(
            $level,
            concat!("[", $stage, "] ", $fmt)
            $(, $($arg)+)?
        )
    };
}
