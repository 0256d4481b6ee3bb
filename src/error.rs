use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Structured error type for the bridge. Nothing here crosses into the VM as
/// an exception; the JNI layer logs these and carries on.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum BridgeError {
    InvalidArgument { index: usize, message: String },
    MissingElement { index: usize },
    WorkingDir { path: PathBuf, message: String },
    Jni { message: String },
    IoError { message: String },
    SettingsError { message: String },
    InvalidSource { path: PathBuf },
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::InvalidArgument { index, message } => {
                write!(f, "Invalid argument at index {index}: {message}")
            }
            BridgeError::MissingElement { index } => {
                write!(f, "Missing argument array element at index {index}")
            }
            BridgeError::WorkingDir { path, message } => {
                write!(f, "Failed to chdir to {}: {message}", path.display())
            }
            BridgeError::Jni { message } => write!(f, "JNI error: {message}"),
            BridgeError::IoError { message } => write!(f, "I/O error: {message}"),
            BridgeError::SettingsError { message } => {
                write!(f, "Invalid compiler settings: {message}")
            }
            BridgeError::InvalidSource { path } => {
                write!(f, "Not a pawn source file: {}", path.display())
            }
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::IoError {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::SettingsError {
            message: e.to_string(),
        }
    }
}

impl From<jni::errors::Error> for BridgeError {
    fn from(e: jni::errors::Error) -> Self {
        BridgeError::Jni {
            message: e.to_string(),
        }
    }
}
