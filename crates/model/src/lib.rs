//! Clipweave Model
//!
//! Defines the core data contracts shared by every stage:
//! - **Values:** graphic lengths and timeline durations with units and sentinels
//! - **Colors:** normalized RGBA with ffmpeg color codes
//! - **Style:** the resolved per-node style record
//! - **Content:** the resolved container/leaf tree
//! - **Markup:** parsed elements before styling
//!
//! Graphic values resolve against the parent box or the root resolution;
//! time values resolve against the parent length or the probed media.

pub mod color;
pub mod content;
pub mod context;
pub mod markup;
pub mod style;
pub mod tag;
pub mod value;

pub use color::*;
pub use content::*;
pub use context::*;
pub use markup::*;
pub use style::*;
pub use tag::*;
pub use value::*;
