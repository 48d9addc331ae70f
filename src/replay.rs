//! Headless replay.
//!
//! Drives a full [`CaptureSession`] without a browser: a PNG on disk stands
//! in for the captured page, a JSON event script stands in for the user,
//! and the result is written back to disk. Redraw requests run through the
//! same [`RedrawThrottle`] the browser uses, against a simulated clock, so
//! the report shows how many paints the script would have cost.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use canvas::camera::Point;
use canvas::doc::AnnotationPatch;
use canvas::engine::{Action, EngineCore};
use canvas::geom::Rect;
use canvas::input::{Button, Key, Modifiers, Tool};
use canvas::raster::Bitmap;
use canvas::schedule::{RedrawDecision, RedrawThrottle};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{CaptureError, ConfigError, ExportError, MessagingError, SessionError};
use crate::messaging::{CancellationToken, HostMessage, HostReply, TokioSleeper};
use crate::selection::{RegionSelector, SelectionEvent};
use crate::services::{CaptureService, ExportService, HostChannel, LoggingHooks};
use crate::session::{CaptureSession, Collaborators};

#[cfg(test)]
#[path = "replay_test.rs"]
mod replay_test;

/// Simulated time between consecutive script events.
const EVENT_SPACING_MS: f64 = 4.0;

// =============================================================================
// SCRIPT
// =============================================================================

/// One scripted input. Coordinates are screen pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayEvent {
    Tool {
        tool: Tool,
    },
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    DoubleClick {
        x: f64,
        y: f64,
    },
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Insert text into the annotation being edited.
    Text {
        text: String,
    },
    Style {
        patch: AnnotationPatch,
    },
    Crop,
    ConfirmCrop,
    CancelCrop,
    Undo,
    Redo,
    /// Advance the simulated clock.
    Wait {
        ms: f64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid event script: {0}")]
    Script(#[source] serde_json::Error),
    #[error("cannot encode annotations: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("region selection was too small to capture")]
    EmptyRegion,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Parse an event script: a JSON array of [`ReplayEvent`]s.
///
/// # Errors
///
/// Returns the JSON error for malformed scripts or unknown event types.
pub fn parse_script(json: &str) -> Result<Vec<ReplayEvent>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parse `x,y,width,height`.
///
/// # Errors
///
/// Returns a message if there are not four numbers or the size is not
/// positive.
pub fn parse_region(text: &str) -> Result<Rect, String> {
    let parts = text
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{p}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    let [x, y, width, height] = parts[..] else {
        return Err(format!("expected x,y,width,height, got {} values", parts.len()));
    };
    if width <= 0.0 || height <= 0.0 {
        return Err("width and height must be positive".to_owned());
    }
    Ok(Rect::new(x, y, width, height))
}

// =============================================================================
// REPLAY
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub events: usize,
    pub actions: usize,
    /// Paints that actually ran.
    pub paints: usize,
    /// Redraw requests folded into an already scheduled paint.
    pub coalesced: usize,
}

/// Feed `events` to `core`, throttling redraws on a simulated clock.
pub fn replay(core: &mut EngineCore, events: &[ReplayEvent], throttle: &mut RedrawThrottle) -> ReplayStats {
    let mut stats = ReplayStats::default();
    let mut now = 0.0;
    let mut timer_due: Option<f64> = None;

    for event in events {
        now += match event {
            ReplayEvent::Wait { ms } => ms.max(0.0),
            _ => EVENT_SPACING_MS,
        };
        if let Some(due) = timer_due.filter(|due| *due <= now) {
            timer_due = None;
            if throttle.on_timer(due) {
                stats.paints += 1;
            }
        }

        let actions = apply(core, event);
        stats.events += 1;
        stats.actions += actions.len();
        if !actions.iter().any(|a| !matches!(a, Action::SetCursor(_))) {
            continue;
        }
        match throttle.request(now) {
            RedrawDecision::PaintNow => stats.paints += 1,
            RedrawDecision::Scheduled { delay_ms } => timer_due = Some(now + delay_ms),
            RedrawDecision::Coalesced => stats.coalesced += 1,
        }
    }

    if let Some(due) = timer_due {
        if throttle.on_timer(due) {
            stats.paints += 1;
        }
    }
    tracing::debug!(?stats, "replay finished");
    stats
}

fn apply(core: &mut EngineCore, event: &ReplayEvent) -> Vec<Action> {
    match event {
        ReplayEvent::Tool { tool } => core.set_tool(*tool),
        ReplayEvent::PointerDown { x, y, button, modifiers } => {
            core.on_pointer_down(Point::new(*x, *y), *button, *modifiers)
        }
        ReplayEvent::PointerMove { x, y, modifiers } => core.on_pointer_move(Point::new(*x, *y), *modifiers),
        ReplayEvent::PointerUp { x, y, button, modifiers } => core.on_pointer_up(Point::new(*x, *y), *button, *modifiers),
        ReplayEvent::DoubleClick { x, y } => core.on_double_click(Point::new(*x, *y)),
        ReplayEvent::Key { key, modifiers } => core.on_key_down(&Key::named(key), *modifiers),
        ReplayEvent::Text { text } => core.insert_text(text),
        ReplayEvent::Style { patch } => core.apply_style(patch),
        ReplayEvent::Crop => core.begin_crop(),
        ReplayEvent::ConfirmCrop => core.confirm_crop(),
        ReplayEvent::CancelCrop => core.cancel_crop(),
        ReplayEvent::Undo => core.undo(),
        ReplayEvent::Redo => core.redo(),
        ReplayEvent::Wait { .. } => Vec::new(),
    }
}

// =============================================================================
// FILE-BACKED SERVICES
// =============================================================================

/// Captures from a PNG decoded once at open.
pub struct FileCapture {
    bitmap: Bitmap,
}

impl FileCapture {
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a decodable image.
    pub async fn open(path: &Path) -> Result<Self, CaptureError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CaptureError::Failed(format!("{}: {e}", path.display())))?;
        let bitmap = Bitmap::decode_png(&bytes)?;
        tracing::debug!(path = %path.display(), width = bitmap.width(), height = bitmap.height(), "source image loaded");
        Ok(Self { bitmap })
    }

    /// The whole image, standing in for the viewport.
    #[must_use]
    pub fn viewport(&self) -> Rect {
        self.bitmap.bounds()
    }
}

#[async_trait::async_trait]
impl CaptureService for FileCapture {
    async fn capture(&self, region: Option<Rect>) -> Result<Bitmap, CaptureError> {
        match region {
            Some(r) => Ok(self.bitmap.crop(&r)?),
            None => Ok(self.bitmap.clone()),
        }
    }
}

/// Writes exports to a fixed file, or into a directory under the export
/// filename.
pub struct FileExport {
    target: PathBuf,
}

impl FileExport {
    #[must_use]
    pub fn new(target: PathBuf) -> Self {
        Self { target }
    }

    /// Where a save of `filename` lands.
    pub async fn resolve(&self, filename: &str) -> PathBuf {
        match tokio::fs::metadata(&self.target).await {
            Ok(meta) if meta.is_dir() => self.target.join(filename),
            _ => self.target.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ExportService for FileExport {
    async fn save(&self, bytes: &[u8], filename: &str) -> Result<(), ExportError> {
        let path = self.resolve(filename).await;
        tokio::fs::write(&path, bytes).await.map_err(|source| ExportError::Io { path: path.clone(), source })?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "image written");
        Ok(())
    }
}

/// Host channel with no page behind it: logs and acknowledges.
#[derive(Debug, Default)]
pub struct LogChannel;

#[async_trait::async_trait]
impl HostChannel for LogChannel {
    async fn send(&self, message: &HostMessage) -> Result<HostReply, MessagingError> {
        tracing::info!(kind = message.kind(), session = %message.session(), "host message");
        Ok(HostReply::Ack { session: message.session() })
    }
}

// =============================================================================
// RUN
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub image: PathBuf,
    pub events: PathBuf,
    /// Overrides `Config::keymap_path` when set.
    pub keymap: Option<PathBuf>,
    /// Output PNG path, or a directory to write a generated filename into.
    pub out: PathBuf,
    /// Where to write the final annotation sequence as JSON.
    pub annotations: Option<PathBuf>,
    /// Region to select before capturing, in source-image pixels.
    pub region: Option<Rect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub stats: ReplayStats,
    pub annotations: usize,
    pub width: u32,
    pub height: u32,
    pub output: PathBuf,
}

/// Select, capture, replay, and export.
///
/// # Errors
///
/// Fails on unreadable inputs, a malformed script, a bad keymap, or any
/// session failure.
pub async fn run(mut config: Config, options: &ReplayOptions) -> Result<ReplayReport, ReplayError> {
    let script = tokio::fs::read_to_string(&options.events)
        .await
        .map_err(|source| ReplayError::Read { path: options.events.clone(), source })?;
    let events = parse_script(&script).map_err(ReplayError::Script)?;

    if let Some(keymap) = &options.keymap {
        config.keymap_path = Some(keymap.clone());
    }
    let redraw_interval = config.redraw_interval_ms;

    let capture = Arc::new(FileCapture::open(&options.image).await.map_err(SessionError::from)?);
    let export = Arc::new(FileExport::new(options.out.clone()));
    let viewport = capture.viewport();
    let services = Collaborators { capture, export: export.clone(), share: None };
    let session = CaptureSession::new(config, services)?;

    let id = session.id();
    notify(&session, HostMessage::StartCapture { session: id }).await?;

    let region = match options.region {
        None => None,
        Some(rect) => {
            let mut selector = RegionSelector::new(LoggingHooks, viewport);
            let overlay = selector.start();
            selector.pointer_down(overlay, Point::new(rect.x, rect.y));
            match selector.pointer_up(overlay, Point::new(rect.right(), rect.bottom())) {
                SelectionEvent::Committed(region) => {
                    let rect = region.rect();
                    notify(&session, HostMessage::RegionSelected { session: id, rect }).await?;
                    Some(region)
                }
                _ => {
                    notify(&session, HostMessage::Cancelled { session: id }).await?;
                    return Err(ReplayError::EmptyRegion);
                }
            }
        }
    };

    let (width, height) = session.capture(region).await?;
    notify(&session, HostMessage::CaptureComplete { session: id, width, height }).await?;

    let mut throttle = RedrawThrottle::with_interval(redraw_interval);
    let stats = session.with_editor(|core| replay(core, &events, &mut throttle))?;

    let annotations = session.annotations()?;
    if let Some(path) = &options.annotations {
        let json = serde_json::to_vec_pretty(&annotations).map_err(ReplayError::Encode)?;
        tokio::fs::write(path, json).await.map_err(|source| ReplayError::Write { path: path.clone(), source })?;
    }

    let (width, height) = session
        .with_editor(|core| core.background().map(|b| (b.width(), b.height())))?
        .unwrap_or((width, height));
    let filename = session.config().export_filename();
    let output = export.resolve(&filename).await;
    session.export(Some(&filename)).await?;

    Ok(ReplayReport { stats, annotations: annotations.len(), width, height, output })
}

async fn notify(session: &CaptureSession, message: HostMessage) -> Result<(), SessionError> {
    session.notify_host(&LogChannel, &TokioSleeper, &CancellationToken::new(), &message).await
}
