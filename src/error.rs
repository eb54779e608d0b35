// Errors that end a command without being a bug: bad local input, a missing
// login, or a request the server turned down. Everything else travels as a
// plain `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// Local validation failed; nothing was sent to the server.
    #[error("{0}")]
    Invalid(String),

    #[error("Please login first.")]
    NotLoggedIn,

    /// The server answered with a non-success code. The message for it has
    /// already been printed.
    #[error("request failed with code {code}")]
    Rejected { code: i64 },
}

impl CliError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CliError::Invalid(msg.into())
    }
}
