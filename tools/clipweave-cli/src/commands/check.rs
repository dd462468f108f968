//! Check for the external tools rendering needs.

use clipweave_common::config::AppConfig;
use clipweave_render_engine::export::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Clipweave System Check");
    println!("{}", "=".repeat(50));

    let tools = [
        ("ffmpeg", &config.render.ffmpeg_binary),
        ("ffprobe", &config.render.ffprobe_binary),
    ];
    let mut all_ok = true;
    for (role, binary) in tools {
        if command_exists(binary) {
            println!("[OK] {role}: {binary}");
        } else {
            println!("[MISSING] {role}: {binary} not found in PATH");
            all_ok = false;
        }
    }

    println!();
    println!("Config file: {}", clipweave_common::config::config_file_path().display());
    println!("Default format: {}", config.render.format);
    println!();
    if all_ok {
        println!("All required tools are available. Clipweave is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg or set the binary paths in the config file.");
    }

    Ok(())
}
