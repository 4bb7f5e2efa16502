use std::path::PathBuf;

use crate::pipeline::batch::BatchStage;

/// Convenience result type used across Framestack.
pub type FramestackResult<T> = Result<T, FramestackError>;

/// Error taxonomy for a batch.
///
/// Only [`FramestackError::Decode`] and [`FramestackError::Sidecar`] are
/// recoverable inside a batch; every other variant ends the batch it was
/// raised in.
#[derive(thiserror::Error, Debug)]
pub enum FramestackError {
    /// None of the submitted paths names a `.png` or `.gif` file.
    #[error("selection error: no supported image files found (expected .png or .gif)")]
    SelectionEmpty,

    /// One input could not be decoded; the batch skips it.
    #[error("decode error: '{}': {reason}", .path.display())]
    Decode {
        /// The file that failed.
        path: PathBuf,
        /// Codec message.
        reason: String,
    },

    /// Every selected input failed to decode or produced no frames.
    #[error("decode error: none of the {attempted} selected files produced a frame ({failed} failed)")]
    AllDecodeFailed {
        /// Number of files the batch tried to decode.
        attempted: usize,
        /// Number of those that failed outright.
        failed: usize,
    },

    /// The composited image could not be encoded or written.
    #[error("write error: '{}': {reason}", .path.display())]
    Write {
        /// Destination of the image.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The sidecar could not be written. The image is kept.
    #[error("sidecar error: '{}': {reason}", .path.display())]
    Sidecar {
        /// Destination of the sidecar.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// Invalid geometry or options.
    #[error("validation error: {0}")]
    Validation(String),

    /// A batch was submitted to a pipeline that no longer accepts work.
    #[error("pipeline closed: no further batches are accepted")]
    Closed,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramestackError {
    /// Build a [`FramestackError::Decode`] value.
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`FramestackError::Write`] value.
    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`FramestackError::Sidecar`] value.
    pub fn sidecar(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Sidecar {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`FramestackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// The terminal stage a batch lands in when this error aborts it, or
    /// `None` for errors a batch recovers from.
    pub fn abort_stage(&self) -> Option<BatchStage> {
        match self {
            Self::SelectionEmpty => Some(BatchStage::SelectionEmpty),
            Self::AllDecodeFailed { .. } => Some(BatchStage::AllDecodeFailed),
            Self::Write { .. } | Self::Validation(_) | Self::Other(_) => {
                Some(BatchStage::WriteFailed)
            }
            Self::Decode { .. } | Self::Sidecar { .. } | Self::Closed => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
