pub mod check;
pub mod inspect;
pub mod preview;
pub mod render;

use std::path::Path;

use clipweave_common::config::AppConfig;
use clipweave_content::{build_document, read_document};
use clipweave_model::{Content, RenderContext};
use clipweave_style::FfprobeProbe;

/// Read a document and build its content tree, probing media with the
/// configured ffprobe.
pub fn load(config: &AppConfig, path: &Path) -> anyhow::Result<(Content, RenderContext)> {
    let document = read_document(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let probe = FfprobeProbe::new(config.render.ffprobe_binary.clone());
    let root = build_document(&document, Box::new(probe))
        .map_err(|e| anyhow::anyhow!("Failed to build {}: {e}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        nodes = root.node_count(),
        resolution = %document.context.resolution,
        "Content tree built"
    );
    Ok((root, document.context))
}
