//! Error types for devorient
//!
//! `NoForeground` is the one "expected" failure: the target display is
//! gone for now, so there is nothing to read or constrain.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No foreground display context is available")]
    NoForeground,

    #[error("Display handle `{0}` is unavailable")]
    MissingHandle(&'static str),

    #[error("Invalid orientation {0:?}, expected portrait, portrait-flipped, landscape, landscape-flipped or undefined")]
    InvalidOrientation(String),

    #[error("`{command}` failed: {status}")]
    CommandFailed { command: String, status: String },

    #[error("Wayland error: {0}")]
    Wayland(String),

    #[error("Unknown display backend {0:?}")]
    InvalidBackend(String),

    #[error("No display backend is available on this system")]
    NoPlatform,

    #[error("Underlying I/O error")]
    IOError(#[from] std::io::Error),

    #[error("JSON encoding error")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short, stable name of the error kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoForeground => "NoForeground",
            Self::MissingHandle(_) => "MissingHandle",
            Self::InvalidOrientation(_) => "InvalidOrientation",
            Self::CommandFailed { .. } => "CommandFailed",
            Self::Wayland(_) => "Wayland",
            Self::InvalidBackend(_) => "InvalidBackend",
            Self::NoPlatform => "NoPlatform",
            Self::IOError(_) => "IOError",
            Self::Json(_) => "Json",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
