//! Small helpers shared by the Tilda crates.

/// Panic in debug builds, log an error with a backtrace in release builds.
///
/// For invariants the window system is supposed to uphold; a misbehaving
/// server must not take the hotkey daemon down in production.
#[macro_export]
macro_rules! debug_panic {
    ( $($fmt_arg:tt)* ) => {
        if cfg!(debug_assertions) {
            panic!( $($fmt_arg)* );
        } else {
            let backtrace = std::backtrace::Backtrace::capture();
            tracing::error!("{}\n{:?}", format_args!($($fmt_arg)*), backtrace);
        }
    };
}

/// Logging for results whose failure should not abort the caller.
pub trait ResultExt<T> {
    /// Log the error at `warn` level and turn the result into an `Option`.
    fn log_err(self, what: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    #[track_caller]
    fn log_err(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                let caller = std::panic::Location::caller();
                tracing::warn!("{} failed ({}:{}): {}", what, caller.file(), caller.line(), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_err_keeps_ok_values() {
        let result: Result<u32, String> = Ok(7);
        assert_eq!(result.log_err("reading"), Some(7));
    }

    #[test]
    fn log_err_swallows_errors() {
        let result: Result<u32, String> = Err("boom".into());
        assert_eq!(result.log_err("reading"), None);
    }

    #[test]
    #[should_panic(expected = "broken invariant 3")]
    #[cfg(debug_assertions)]
    fn debug_panic_panics_in_debug_builds() {
        debug_panic!("broken invariant {}", 3);
    }
}
