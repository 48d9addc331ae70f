//! Error taxonomy for the host layer.
//!
//! Collaborator failures each get their own enum so callers can tell stages
//! apart. [`SessionError`] aggregates them at the session boundary and turns
//! any of them into a message fit for the user, keeping the original cause.

use std::path::PathBuf;

use canvas::keymap::KeymapError;
use canvas::raster::RasterError;
use canvas::render::RenderError;

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Failure reported by an external service implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The host refuses to capture this page (browser-internal pages, stores).
    #[error("page cannot be captured: {0}")]
    Restricted(String),
    #[error("no visible surface to capture")]
    NoSurface,
    #[error("capture failed: {0}")]
    Failed(String),
    #[error("captured image unreadable: {0}")]
    Image(#[from] RasterError),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("save cancelled")]
    Cancelled,
    #[error("write failed for {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("encode failed: {0}")]
    Encode(#[from] RasterError),
}

/// Share pipeline failure, one variant per stage.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("image is {size} bytes, limit is {max}")]
    FileTooLarge { size: usize, max: usize },
    #[error("authentication failed: {0}")]
    Auth(BackendError),
    #[error("upload failed: {0}")]
    Upload(BackendError),
    #[error("could not make file public: {0}")]
    Permission(BackendError),
    #[error("could not fetch share link: {0}")]
    Link(BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    /// The receiving side has not registered its listener yet. Retriable.
    #[error("receiver not ready")]
    NotReady,
    #[error("channel closed")]
    Closed,
    #[error("host rejected message: {0}")]
    Rejected(String),
    #[error("receiver still not ready after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read keymap {path}: {source}")]
    KeymapRead { path: PathBuf, source: std::io::Error },
    #[error("invalid keymap {path}: {source}")]
    Keymap { path: PathBuf, source: KeymapError },
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a capture is already in progress")]
    CaptureInFlight,
    #[error("no image is being edited")]
    NoEditor,
    #[error("sharing is not configured")]
    ShareUnavailable,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Share(#[from] ShareError),
    #[error(transparent)]
    Messaging(#[from] MessagingError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl SessionError {
    /// Text for the user. Always includes the underlying cause.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CaptureInFlight => "A capture is already in progress.".to_owned(),
            Self::NoEditor => "There is no screenshot open.".to_owned(),
            Self::ShareUnavailable => "Sharing is not set up.".to_owned(),
            Self::Capture(CaptureError::Restricted(cause)) => format!("This page can't be captured ({cause})."),
            Self::Capture(e) => format!("Couldn't capture the screen: {e}."),
            Self::Export(ExportError::Cancelled) => "Save cancelled.".to_owned(),
            Self::Export(e) => format!("Couldn't save the image: {e}."),
            Self::Share(ShareError::FileTooLarge { size, max }) => format!(
                "The image is too large to share ({:.1} MB, limit {:.1} MB).",
                megabytes(*size),
                megabytes(*max)
            ),
            Self::Share(ShareError::Auth(cause)) => format!("Couldn't sign in to share: {cause}."),
            Self::Share(e) => format!("Couldn't share the image: {e}."),
            Self::Messaging(e) => format!("Couldn't reach the page: {e}."),
            Self::Raster(e) => format!("Image processing failed: {e}."),
            Self::Render(e) => format!("Couldn't draw the annotations: {e}."),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn megabytes(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
