//! Clipweave Render Engine
//!
//! Compiles a resolved content tree into a single ffmpeg filter graph and
//! drives ffmpeg to encode it.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Content tree ──┐
//!                ├── leaves: inputs, scale, padding canvas, length
//!                │          │
//!                │          ├── seq: place, gap, concat
//!                │          ├── prl: overlay layers, amix
//!                │          ▼
//!                └── root: resolution canvas, time margins, mux
//!                                 │
//!                                 ▼
//!                   -filter_complex + -map + codecs
//!                                 │
//!                                 ▼
//!                             output.mp4
//! ```

pub mod compiler;
pub mod context;
pub mod export;
pub mod filters;
pub mod graph;
pub mod preview;

pub use compiler::{compile_document, CompiledDocument};
pub use export::*;
pub use graph::{FilterGraph, VideoStream, AudioStream};
pub use preview::{compile_preview, CompiledPreview};
