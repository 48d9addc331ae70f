//! Collaborator seams.
//!
//! The session never touches the browser, the filesystem, or a cloud API
//! directly; it goes through these traits. Production wires real
//! implementations, the replay tool wires file-backed ones, and tests wire
//! hand-written mocks.

use canvas::geom::Rect;
use canvas::raster::Bitmap;
use uuid::Uuid;

use crate::error::{BackendError, CaptureError, ExportError, MessagingError};
use crate::messaging::{HostMessage, HostReply};

#[cfg(test)]
#[path = "services_test.rs"]
mod services_test;

/// Grabs pixels from the visible page.
#[async_trait::async_trait]
pub trait CaptureService: Send + Sync {
    /// Capture the visible surface, cropped to `region` (viewport pixels)
    /// when given.
    async fn capture(&self, region: Option<Rect>) -> Result<Bitmap, CaptureError>;
}

/// Persists an exported image.
#[async_trait::async_trait]
pub trait ExportService: Send + Sync {
    async fn save(&self, bytes: &[u8], filename: &str) -> Result<(), ExportError>;
}

/// Cloud storage used by the share pipeline. Each call maps to one stage.
#[async_trait::async_trait]
pub trait ShareBackend: Send + Sync {
    /// Obtain an access token. `interactive` allows prompting the user.
    async fn authenticate(&self, interactive: bool) -> Result<String, BackendError>;

    /// Upload and return the remote file id.
    async fn upload(&self, token: &str, bytes: &[u8], filename: &str) -> Result<String, BackendError>;

    /// Grant anyone-with-the-link read access.
    async fn make_public(&self, token: &str, file_id: &str) -> Result<(), BackendError>;

    /// Fetch the shareable link.
    async fn link(&self, token: &str, file_id: &str) -> Result<String, BackendError>;
}

/// Message channel to the page hosting the selection overlay.
#[async_trait::async_trait]
pub trait HostChannel: Send + Sync {
    async fn send(&self, message: &HostMessage) -> Result<HostReply, MessagingError>;
}

/// Identifies one region-selection overlay on the page.
pub type OverlayId = Uuid;

/// Page side effects of showing a selection overlay.
pub trait PageHooks {
    /// Register input listeners for the overlay.
    fn attach(&mut self, overlay: OverlayId);

    /// Remove every listener registered for the overlay.
    fn detach(&mut self, overlay: OverlayId);

    fn suspend_scroll(&mut self);

    fn restore_scroll(&mut self);
}

/// Hooks that only log. Used headless, where there is no page.
#[derive(Debug, Default)]
pub struct LoggingHooks;

impl PageHooks for LoggingHooks {
    fn attach(&mut self, overlay: OverlayId) {
        tracing::debug!(%overlay, "overlay listeners attached");
    }

    fn detach(&mut self, overlay: OverlayId) {
        tracing::debug!(%overlay, "overlay listeners detached");
    }

    fn suspend_scroll(&mut self) {
        tracing::debug!("page scroll suspended");
    }

    fn restore_scroll(&mut self) {
        tracing::debug!("page scroll restored");
    }
}
