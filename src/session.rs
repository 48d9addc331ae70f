//! Per-capture orchestration.
//!
//! A [`CaptureSession`] takes a committed region (or none for the full
//! viewport), captures it, and opens a fresh [`EngineCore`] on the pixels.
//! Export and share read the editor state; a successful export ends the
//! editing session. Collaborator failures leave the editor untouched so
//! the user can retry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use canvas::assets::{AssetLookup, StaticAssets};
use canvas::doc::Annotation;
use canvas::engine::{self, EngineCore};
use canvas::keymap::Keymap;
use canvas::raster::Bitmap;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ConfigError, SessionError};
use crate::messaging::{self, CancellationToken, HostMessage, Sleeper};
use crate::selection::CommittedRegion;
use crate::services::{CaptureService, ExportService, HostChannel, ShareBackend};
use crate::share;

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn CaptureService>,
    pub export: Arc<dyn ExportService>,
    /// `None` when sharing is not configured.
    pub share: Option<Arc<dyn ShareBackend>>,
}

pub struct CaptureSession {
    id: Uuid,
    config: Config,
    keymap: Keymap,
    services: Collaborators,
    in_flight: AtomicBool,
    editor: Mutex<Option<EngineCore>>,
    lookup: Box<dyn AssetLookup + Send + Sync>,
    /// Arrowhead images the host has loaded, by asset name.
    assets: Mutex<HashMap<String, Bitmap>>,
}

/// Clears the in-flight flag when a capture finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CaptureSession {
    /// # Errors
    ///
    /// Returns an error if the configured keymap file cannot be loaded.
    pub fn new(config: Config, services: Collaborators) -> Result<Self, ConfigError> {
        let keymap = config.load_keymap()?;
        Ok(Self::with_keymap(config, keymap, services))
    }

    #[must_use]
    pub fn with_keymap(config: Config, keymap: Keymap, services: Collaborators) -> Self {
        let lookup = Box::new(StaticAssets::new(&config.asset_base_url));
        Self {
            id: Uuid::new_v4(),
            config,
            keymap,
            services,
            in_flight: AtomicBool::new(false),
            editor: Mutex::new(None),
            lookup,
            assets: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve arrowhead assets through `lookup` instead of the configured
    /// base URL.
    #[must_use]
    pub fn with_asset_lookup(mut self, lookup: Box<dyn AssetLookup + Send + Sync>) -> Self {
        self.lookup = lookup;
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // CAPTURE
    // =========================================================================

    /// Capture `region` and open a new editor on it, replacing any previous
    /// one. Returns the captured size in pixels.
    ///
    /// # Errors
    ///
    /// `CaptureInFlight` if another capture has not finished, or the capture
    /// service's error. On error any existing editor is kept.
    pub async fn capture(&self, region: Option<CommittedRegion>) -> Result<(u32, u32), SessionError> {
        if self.in_flight.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            tracing::warn!(session = %self.id, "capture rejected: another capture in flight");
            return Err(SessionError::CaptureInFlight);
        }
        let _guard = InFlight(&self.in_flight);

        let rect = region.map(CommittedRegion::into_rect);
        let bitmap = self.services.capture.capture(rect).await.inspect_err(|e| {
            tracing::warn!(session = %self.id, error = %e, "capture failed");
        })?;
        let size = (bitmap.width(), bitmap.height());

        let mut core = EngineCore::with_background(bitmap);
        core.set_keymap(self.keymap.clone());
        core.set_viewport(f64::from(size.0), f64::from(size.1), 1.0);
        *self.lock_editor() = Some(core);

        tracing::info!(session = %self.id, width = size.0, height = size.1, "capture complete; editor open");
        Ok(size)
    }

    // =========================================================================
    // EDITOR
    // =========================================================================

    /// Run `f` against the open editor.
    ///
    /// # Errors
    ///
    /// `NoEditor` if nothing has been captured or the session has ended.
    pub fn with_editor<R>(&self, f: impl FnOnce(&mut EngineCore) -> R) -> Result<R, SessionError> {
        let mut editor = self.lock_editor();
        let core = editor.as_mut().ok_or(SessionError::NoEditor)?;
        Ok(f(core))
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.lock_editor().is_some()
    }

    /// Snapshot of the annotation sequence in paint order.
    ///
    /// # Errors
    ///
    /// `NoEditor` if no editor is open.
    pub fn annotations(&self) -> Result<Vec<Annotation>, SessionError> {
        self.with_editor(|core| core.annotations().to_vec())
    }

    /// Discard the editor without exporting. Returns whether one was open.
    pub fn close(&self) -> bool {
        let closed = self.lock_editor().take().is_some();
        if closed {
            tracing::info!(session = %self.id, "editor closed");
        }
        closed
    }

    // =========================================================================
    // ASSETS
    // =========================================================================

    /// `(name, url)` for each arrowhead asset the editor uses that has not
    /// been loaded yet. Names the lookup does not know are left out; those
    /// arrows keep the vector head.
    ///
    /// # Errors
    ///
    /// `NoEditor` if nothing is being edited.
    pub fn pending_assets(&self) -> Result<Vec<(String, String)>, SessionError> {
        self.with_editor(|core| {
            let loaded = self.lock_assets();
            engine::pending_assets(core, self.lookup.as_ref(), |name| loaded.contains_key(name))
        })
    }

    /// Register a loaded arrowhead image. Exports draw it in place of the
    /// vector head.
    pub fn add_asset(&self, name: &str, image: Bitmap) {
        tracing::debug!(session = %self.id, asset = name, "arrowhead asset loaded");
        self.lock_assets().insert(name.to_owned(), image);
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Encode the flattened image and save it. Ends the editing session on
    /// success. Returns the filename used.
    ///
    /// # Errors
    ///
    /// `NoEditor`, an encoding failure, or the export service's error. The
    /// editor stays open on error.
    pub async fn export(&self, filename: Option<&str>) -> Result<String, SessionError> {
        let bytes = self.encode()?;
        let filename = filename.map_or_else(|| self.config.export_filename(), str::to_owned);

        self.services.export.save(&bytes, &filename).await.inspect_err(|e| {
            tracing::warn!(session = %self.id, error = %e, "export failed; editor kept");
        })?;

        *self.lock_editor() = None;
        tracing::info!(session = %self.id, %filename, bytes = bytes.len(), "exported; session ended");
        Ok(filename)
    }

    /// Upload the flattened image and return a public link. The editor stays
    /// open either way.
    ///
    /// # Errors
    ///
    /// `ShareUnavailable` without a backend, `NoEditor`, or the failing
    /// share stage.
    pub async fn share(&self) -> Result<String, SessionError> {
        let backend = self.services.share.clone().ok_or(SessionError::ShareUnavailable)?;
        let bytes = self.encode()?;
        let filename = self.config.export_filename();
        let link = share::share_image(backend.as_ref(), &bytes, &filename, self.config.share_max_bytes).await?;
        Ok(link)
    }

    /// Send `message` to the host page with the configured retry policy.
    ///
    /// # Errors
    ///
    /// The messaging error once retries are exhausted, cancelled, or on a
    /// non-retriable failure.
    pub async fn notify_host(
        &self,
        channel: &dyn HostChannel,
        sleeper: &dyn Sleeper,
        cancel: &CancellationToken,
        message: &HostMessage,
    ) -> Result<(), SessionError> {
        messaging::send_with_retry(channel, message, &self.config.retry_policy(), sleeper, cancel).await?;
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>, SessionError> {
        let flattened =
            self.with_editor(|core| core.flattened_with(&self.lock_assets()))??.ok_or(SessionError::NoEditor)?;
        Ok(flattened.encode_png()?)
    }

    fn lock_editor(&self) -> MutexGuard<'_, Option<EngineCore>> {
        self.editor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_assets(&self) -> MutexGuard<'_, HashMap<String, Bitmap>> {
        self.assets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
