//! Clipweave Style
//!
//! Turns markup plus stylesheets into one resolved [`Style`] per node:
//! - **Stylesheet:** rule blocks and inline declarations
//! - **Selector:** descendant-chain matching against the ancestor path
//! - **Property:** per-property value grammars
//! - **Probe:** media metadata via ffprobe, memoized per path
//! - **Cascade:** inheritance, tag defaults, declarations, and unit resolution
//!
//! [`Style`]: clipweave_model::Style

pub mod cascade;
pub mod probe;
pub mod property;
pub mod selector;
pub mod stylesheet;

pub use cascade::{StyleBuilder, StyleResolver};
pub use probe::{FfprobeProbe, MediaInfo, MediaProbe, ProbeCache};
pub use selector::{Selector, TagInfo};
pub use stylesheet::{Declaration, Stylesheet};
