// Error kinds returned by the remote API client. Every expected failure of a
// request is one of these variants; nothing in the client panics or raises
// across its boundary.

use thiserror::Error;

/// A failed request against the bot backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// DNS, refused connection, timeout or an interrupted body read.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with a status other than 200.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("request failed"))]
    Http { status: u16, message: Option<String> },

    /// A 200 response whose body is not the JSON we expected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Refused before sending: a name or ID cannot be placed in the URL.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Failure {
    /// HTTP status carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_display_prefers_server_message() {
        let failure = Failure::Http {
            status: 404,
            message: Some("collection not found".into()),
        };
        assert_eq!(failure.to_string(), "HTTP 404: collection not found");
        assert_eq!(failure.status(), Some(404));
    }

    #[test]
    fn http_display_without_message() {
        let failure = Failure::Http {
            status: 502,
            message: None,
        };
        assert_eq!(failure.to_string(), "HTTP 502: request failed");
        assert_eq!(Failure::Connection("refused".into()).status(), None);
        assert_eq!(
            Failure::InvalidRequest("'..' is not a usable name or ID".into()).to_string(),
            "invalid request: '..' is not a usable name or ID"
        );
    }
}
