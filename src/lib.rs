//! Host-integration layer for the screenshot annotation engine.
//!
//! The interactive editor lives in the [`canvas`] crate. This crate wraps it
//! in a per-capture [`session::CaptureSession`] and talks to the outside
//! world through narrow async traits: capturing pixels, saving files,
//! sharing links, and messaging the host page.
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Environment-driven settings |
//! | [`error`] | Error taxonomy and user-facing messages |
//! | [`services`] | Collaborator traits (capture, export, share, host channel) |
//! | [`messaging`] | Host messages and the bounded retry loop |
//! | [`share`] | Size-checked authenticate/upload/publish/link pipeline |
//! | [`selection`] | Single-overlay region selection with page hooks |
//! | [`session`] | Capture → edit → export/share orchestration |
//! | [`replay`] | Headless event-script replay and file-backed services |

pub mod config;
pub mod error;
pub mod messaging;
pub mod replay;
pub mod selection;
pub mod services;
pub mod session;
pub mod share;
