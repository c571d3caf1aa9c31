use thiserror::Error;

use crate::domain::digest::MessageId;

/// Everything that can go wrong during a digest run.
///
/// `Connect`, `Auth` and `MissingCredential` abort a run before harvesting.
/// `Mailbox` and `ConnectionLost` abort it mid-harvest.
/// `Search`, `Fetch` and `Decode` only cost the affected source its entry.
/// `Synthesis` is fatal once the narrator's retry budget is spent.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("could not connect to {server}: {reason}")]
    Connect { server: String, reason: String },

    #[error("login rejected for {user}: {reason}")]
    Auth { user: String, reason: String },

    #[error("credential {0} is not set")]
    MissingCredential(&'static str),

    #[error("cannot select mailbox {mailbox}: {reason}")]
    Mailbox { mailbox: String, reason: String },

    #[error("connection to mail store lost: {0}")]
    ConnectionLost(String),

    #[error("search `{criteria}` failed: {reason}")]
    Search { criteria: String, reason: String },

    #[error("fetch of message {id} failed: {reason}")]
    Fetch { id: MessageId, reason: String },

    #[error("could not decode message: {0}")]
    Decode(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DigestError {
    /// Connection-level failures end the run; the rest are contained per source.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DigestError::Connect { .. }
                | DigestError::Auth { .. }
                | DigestError::MissingCredential(_)
                | DigestError::Mailbox { .. }
                | DigestError::ConnectionLost(_)
                | DigestError::Synthesis(_)
                | DigestError::Io(_)
        )
    }
}
