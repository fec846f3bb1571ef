//! Error taxonomy shared by the recording store, capture, playback and speech modules.
//!
//! Library code returns [`VoxError`]; command handlers wrap it in `anyhow` and turn it
//! into a terminal message. None of these variants are fatal to the process.

use thiserror::Error;

/// Domain errors surfaced by voxmemo operations.
#[derive(Error, Debug)]
pub enum VoxError {
    /// Microphone access was refused by the host.
    #[error("Microphone access denied: {reason}")]
    Permission {
        /// Host-provided description.
        reason: String,
    },

    /// An audio device could not be opened or driven.
    #[error("Audio device error: {reason}")]
    Device {
        /// Description of the device failure.
        reason: String,
    },

    /// A recording or its audio data does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up, e.g. "Audio data for rec_123".
        what: String,
    },

    /// Reading from or writing to local persistence failed.
    #[error("Storage error: {reason}")]
    Storage {
        /// Description of the storage failure.
        reason: String,
    },

    /// Audio bytes could not be converted into a playable form.
    #[error("Audio conversion failed: {reason}")]
    Conversion {
        /// Description of the conversion failure.
        reason: String,
    },

    /// A premium provider was selected without an API key.
    #[error("No API key configured for {provider}")]
    MissingApiKey {
        /// Provider display name.
        provider: String,
    },

    /// The provider rejected the API key (HTTP 401).
    #[error("{provider} API key is invalid or expired")]
    InvalidApiKey {
        /// Provider display name.
        provider: String,
    },

    /// The provider rate-limited the request (HTTP 429).
    #[error("Too many requests to {provider}. Please wait and try again")]
    RateLimited {
        /// Provider display name.
        provider: String,
    },

    /// Any other provider or network failure.
    #[error("{provider} error: {reason}")]
    Provider {
        /// Provider display name.
        provider: String,
        /// Human-readable failure description.
        reason: String,
    },

    /// A session operation was invoked from a state that does not allow it.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        /// Attempted operation.
        action: &'static str,
        /// Current state name.
        state: &'static str,
    },

    /// The current platform or backend cannot perform the operation.
    #[error("Unsupported: {reason}")]
    Unsupported {
        /// What is unsupported.
        reason: String,
    },
}

impl VoxError {
    pub fn storage(reason: impl std::fmt::Display) -> Self {
        VoxError::Storage {
            reason: reason.to_string(),
        }
    }

    pub fn device(reason: impl std::fmt::Display) -> Self {
        VoxError::Device {
            reason: reason.to_string(),
        }
    }

    pub fn conversion(reason: impl std::fmt::Display) -> Self {
        VoxError::Conversion {
            reason: reason.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        VoxError::NotFound { what: what.into() }
    }

    /// Whether the failure rules out any fallback for the current request.
    pub fn is_fatal_to_request(&self) -> bool {
        matches!(self, VoxError::MissingApiKey { .. })
    }
}

impl From<rusqlite::Error> for VoxError {
    fn from(err: rusqlite::Error) -> Self {
        VoxError::storage(err)
    }
}

impl From<serde_json::Error> for VoxError {
    fn from(err: serde_json::Error) -> Self {
        VoxError::storage(format!("invalid JSON: {err}"))
    }
}

impl From<hound::Error> for VoxError {
    fn from(err: hound::Error) -> Self {
        VoxError::conversion(err)
    }
}

/// Result alias for voxmemo library operations.
pub type Result<T> = std::result::Result<T, VoxError>;
