//! Error types for Murmur operations.
//!
//! Every error here is recoverable: the controller logs it at the detection
//! site and keeps ticking.

use thiserror::Error;

/// Result type for Murmur operations.
pub type Result<T> = std::result::Result<T, MurmurError>;

/// What a factory registry produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    Algorithm,
    Platform,
}

impl std::fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactoryKind::Algorithm => f.write_str("algorithm"),
            FactoryKind::Platform => f.write_str("platform"),
        }
    }
}

/// Errors that can occur in the control core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MurmurError {
    #[error("unknown {kind} '{name}'")]
    UnknownFactory { kind: FactoryKind, name: String },

    #[error("{0} name is empty")]
    EmptyName(FactoryKind),

    #[error("no group could be resolved at '{0}'")]
    UnknownGroup(String),

    #[error("{factory}: missing required argument '{arg}'")]
    MissingArgument { factory: String, arg: String },

    #[error("{factory}: invalid value '{value}' for argument '{arg}': {reason}")]
    InvalidArgument {
        factory: String,
        arg: String,
        value: String,
        reason: String,
    },

    #[error("{0} is not bound")]
    NotBound(&'static str),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MurmurError {
    fn from(e: std::io::Error) -> Self {
        MurmurError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for MurmurError {
    fn from(e: serde_json::Error) -> Self {
        MurmurError::Serialization(e.to_string())
    }
}

// Convenience constructors
impl MurmurError {
    pub fn unknown_algorithm(name: impl Into<String>) -> Self {
        MurmurError::UnknownFactory {
            kind: FactoryKind::Algorithm,
            name: name.into(),
        }
    }

    pub fn unknown_platform(name: impl Into<String>) -> Self {
        MurmurError::UnknownFactory {
            kind: FactoryKind::Platform,
            name: name.into(),
        }
    }

    pub fn missing_argument(factory: impl Into<String>, arg: impl Into<String>) -> Self {
        MurmurError::MissingArgument {
            factory: factory.into(),
            arg: arg.into(),
        }
    }

    pub fn invalid_argument(
        factory: impl Into<String>,
        arg: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        MurmurError::InvalidArgument {
            factory: factory.into(),
            arg: arg.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
