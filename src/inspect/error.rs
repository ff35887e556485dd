//! Inspection error types.

use thiserror::Error;

/// Errors raised while capturing a request for diagnostics.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The body stream failed before it was fully drained.
    #[error("failed to read request body: {0}")]
    Read(String),

    /// A header value could not be rendered as text.
    #[error("header {name} has a value that is not valid UTF-8")]
    Header { name: String },

    /// Writing the reencoded body into the output buffer failed.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] std::io::Error),

    /// Producing the raw wire dump failed.
    #[error("failed to dump request: {0}")]
    Dump(Box<InspectError>),
}

impl InspectError {
    /// Wrap an error raised on the raw dump path.
    pub fn dump(err: InspectError) -> Self {
        match err {
            InspectError::Dump(_) => err,
            other => InspectError::Dump(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_wrapping_is_not_nested() {
        let err = InspectError::dump(InspectError::dump(InspectError::Read("reset".into())));
        match err {
            InspectError::Dump(inner) => assert!(matches!(*inner, InspectError::Read(_))),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn messages_name_the_failure() {
        let err = InspectError::Header { name: "x-blob".into() };
        assert_eq!(err.to_string(), "header x-blob has a value that is not valid UTF-8");

        let err = InspectError::dump(InspectError::Read("connection reset".into()));
        assert_eq!(
            err.to_string(),
            "failed to dump request: failed to read request body: connection reset"
        );
    }
}
