//! Show the resolved content tree.

use std::path::PathBuf;

use clipweave_common::config::AppConfig;
use clipweave_model::Content;

pub fn run(config: &AppConfig, path: PathBuf, json: bool) -> anyhow::Result<()> {
    let (root, context) = super::load(config, &path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&root)?);
        return Ok(());
    }

    println!("Document: {}", path.display());
    println!("  Resolution: {} @ {}fps", context.resolution, context.fps);
    println!("  Nodes: {}", root.node_count());
    println!();
    print_node(&root, 0);
    Ok(())
}

fn print_node(node: &Content, depth: usize) {
    let style = node.style();
    let streams = match (node.exist_video(), node.exist_audio()) {
        (true, true) => "video+audio",
        (true, false) => "video",
        (false, true) => "audio",
        (false, false) => "-",
    };
    println!(
        "{}<{}> {} x {}, length {}, {}",
        "  ".repeat(depth),
        node.tag(),
        style.width,
        style.height,
        style.object_length,
        streams,
    );
    if let Content::Wrap(wrap) = node {
        for item in &wrap.items {
            print_node(item, depth + 1);
        }
    }
}
