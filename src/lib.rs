/// Macro for prefixed status logging to stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("upgrade", "{} file(s) changed", count);
/// log_status!("write", "Updated {}", path);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod output;

// Re-export everything from core for ergonomic library use
// Users can write `upgrader::rules` instead of `upgrader::core::rules`
pub use core::*;
