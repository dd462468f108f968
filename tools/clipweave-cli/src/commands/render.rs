//! Render a document to video.

use std::path::PathBuf;

use clipweave_common::config::AppConfig;
use clipweave_render_engine::export::{render_document, OutputFormat, RenderJob, RenderProgress};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    format: Option<String>,
    overwrite: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let format = match format {
        Some(format) => Some(format.parse::<OutputFormat>()?),
        None => None,
    };
    let output_path = match output {
        Some(output) => output,
        None => {
            let format = match format {
                Some(format) => format,
                None => config.render.format.parse::<OutputFormat>()?,
            };
            path.with_extension(format.extension())
        }
    };

    let mut job = RenderJob::from_defaults(&output_path, &config.render)?;
    if let Some(format) = format {
        job.format = format;
    }
    job.overwrite = overwrite;
    job.dry_run = dry_run;

    println!("Rendering document: {}", path.display());
    let (root, context) = super::load(config, &path)?;

    println!("  Output: {}", output_path.display());
    println!("  Format: {}", job.format);
    println!("  Resolution: {} @ {}fps", context.resolution, context.fps);

    let progress_cb: Box<dyn Fn(RenderProgress) + Send> = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
    });

    let plan = render_document(&root, context, job, Some(progress_cb)).await?;
    if dry_run {
        println!(
            "  Duration: {:.3}s ({} frames)",
            plan.expected_duration_secs, plan.total_frames
        );
        println!("\n{}", plan.debug_report);
    } else {
        println!("\nRender complete: {}", output_path.display());
    }

    Ok(())
}
