use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lesson_ngin::{config::LessonConfig, flow, lessons::LessonKind};

/// Runs one rendering lesson in a window.
#[derive(Parser, Debug)]
#[command(name = "lessons")]
struct Args {
    /// Lesson to run, e.g. `triangle` or `shadow-mapping`.
    #[arg(required_unless_present = "list")]
    lesson: Option<LessonKind>,

    /// Print every lesson and exit.
    #[arg(long)]
    list: bool,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    fullscreen: bool,

    /// Directory with the textures, models and skyboxes.
    #[arg(long)]
    assets: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list {
        for kind in LessonKind::ALL {
            println!("{:<18} {}", kind.name(), kind.chapter());
        }
        return Ok(());
    }
    let Some(kind) = args.lesson else {
        return Ok(());
    };

    let mut config = LessonConfig::from_env().with_title(kind.title());
    if let Some(width) = args.width.filter(|w| *w > 0) {
        config.width = width;
    }
    if let Some(height) = args.height.filter(|h| *h > 0) {
        config.height = height;
    }
    if args.fullscreen {
        config.fullscreen = true;
    }
    if let Some(assets) = args.assets {
        config.assets_dir = assets;
    }

    log::info!("Starting {kind} with assets from {}", config.assets_dir.display());
    flow::run(kind.constructor(), config)
}
