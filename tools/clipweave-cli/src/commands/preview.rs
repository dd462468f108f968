//! Render one frame of a document.

use std::path::PathBuf;

use clipweave_common::config::AppConfig;
use clipweave_render_engine::export::{render_preview, RenderJob};

pub async fn run(config: &AppConfig, path: PathBuf, frame: u64, output: PathBuf) -> anyhow::Result<()> {
    let (root, context) = super::load(config, &path)?;

    let mut job = RenderJob::from_defaults(&output, &config.render)?;
    job.overwrite = true;

    let plan = render_preview(&root, context, frame, job).await?;
    println!(
        "Frame {frame} written to {}",
        plan.output_path.display()
    );
    Ok(())
}
