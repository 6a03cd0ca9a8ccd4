//! Shared error plumbing.
//!
//! Every boundary error enum in the crate implements [`ErrorCode`] so the
//! store can turn a failure into a chat entry with a grepable code instead of
//! propagating it.

/// Grepable error code and retryable flag for user-facing error entries.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Render an error as `"<CODE>: <message>"`, suffixed with `(retryable)`
/// when trying again may succeed.
pub fn describe(err: &(impl ErrorCode + ?Sized)) -> String {
    if err.retryable() {
        format!("{}: {err} (retryable)", err.error_code())
    } else {
        format!("{}: {err}", err.error_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("busy")]
    struct Busy;

    impl ErrorCode for Busy {
        fn error_code(&self) -> &'static str {
            "E_BUSY"
        }

        fn retryable(&self) -> bool {
            true
        }
    }

    #[test]
    fn describe_prefixes_code() {
        assert_eq!(describe(&NotFound), "E_NOT_FOUND: not found");
    }

    #[test]
    fn retryable_defaults_to_false() {
        assert!(!NotFound.retryable());
    }

    #[test]
    fn describe_marks_retryable_errors() {
        assert_eq!(describe(&Busy), "E_BUSY: busy (retryable)");
    }
}
