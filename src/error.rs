//! Unified error type.

use std::fmt;

/// A boxed error from a request body of any type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by tether's fallible operations.
///
/// Failures inside the chain are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type covers
/// what happens around the chain: reading a request body off the wire and
/// misconfiguration at startup.
#[derive(Debug)]
pub enum Error {
    /// The request body could not be read.
    Body(BoxError),
    /// [`set_root_context`](crate::set_root_context) was called more than once.
    RootContextAlreadySet,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body(e) => write!(f, "body: {e}"),
            Self::RootContextAlreadySet => f.write_str("root context factory is already set"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Body(e) => Some(&**e),
            Self::RootContextAlreadySet => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn body_error_keeps_its_source() {
        let err = Error::Body(Box::new(std::io::Error::other("connection reset")));
        assert_eq!(err.to_string(), "body: connection reset");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("connection reset"));
    }

    #[test]
    fn root_context_error_has_no_source() {
        let err = Error::RootContextAlreadySet;
        assert_eq!(err.to_string(), "root context factory is already set");
        assert!(err.source().is_none());
    }
}
