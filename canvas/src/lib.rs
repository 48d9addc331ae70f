//! Annotation engine for captured screenshots.
//!
//! This crate is compiled to WebAssembly and runs in the browser, and natively
//! for tests and the headless replay tool. It owns the editing lifecycle of a
//! single capture: translating raw pointer and keyboard input into annotation
//! mutations, hit-testing and handle manipulation, undo/redo history, the
//! re-crop overlay, and rendering the scene. The host layer is responsible
//! only for wiring DOM events to the engine and acting on the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`gesture`] | Pointer handlers: the interaction state machine transitions |
//! | [`doc`] | Annotation types and the ordered annotation store |
//! | [`history`] | Bounded two-stack undo/redo over whole-store snapshots |
//! | [`input`] | Tools, modifier keys, and gesture state |
//! | [`keymap`] | Data-driven keyboard shortcut table |
//! | [`camera`] | Screen-to-image coordinate conversion |
//! | [`geom`] | Rectangles, rotation, and distance helpers |
//! | [`hit`] | Bounding boxes, point containment, and transform handles |
//! | [`crop`] | Drag-to-rectangle overlay used for capture and re-crop |
//! | [`raster`] | Background bitmap, blur/pixelate effects, PNG encoding |
//! | [`render`] | Scene painting against the [`render::Surface`] trait |
//! | [`schedule`] | Redraw coalescing to a frame budget |
//! | [`assets`] | Symbolic image-asset lookup |
//! | [`web`] | `CanvasRenderingContext2d` implementation of `Surface` |
//! | [`pixmap`] | Software `Surface` used for raster export |
//! | [`consts`] | Shared numeric constants (tolerances, minimum sizes, limits) |

pub mod assets;
pub mod camera;
pub mod consts;
pub mod crop;
pub mod doc;
pub mod engine;
pub mod geom;
pub mod gesture;
pub mod hit;
pub mod history;
pub mod input;
pub mod keymap;
pub mod pixmap;
pub mod raster;
pub mod render;
pub mod schedule;
pub mod web;
