//! Internal helper macros.

/// Early-returns with an error when a condition does not hold.
///
/// Like `assert!`, but produces an `Err` instead of a panic; used for
/// validation checks throughout the codec layer.
///
/// # Example
///
/// ```ignore
/// ensure!(tag == HEADERS_TAG, ProtocolError::violation("unexpected frame tag"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
