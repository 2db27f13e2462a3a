use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::{Path, PathBuf};

/// Files the asset-backed lessons open, relative to `assets/`.
const LESSON_FILES: [&str; 11] = [
    "container.jpg",
    "awesomeface.png",
    "container2.png",
    "container2_specular.png",
    "backpack/backpack.obj",
    "skybox/right.jpg",
    "skybox/left.jpg",
    "skybox/top.jpg",
    "skybox/bottom.jpg",
    "skybox/front.jpg",
    "skybox/back.jpg",
];

fn main() -> Result<()> {
    // An optional assets/ next to Cargo.toml (the LESSON_ASSETS default is
    // ./assets) is mirrored into OUT_DIR for packaged builds.
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    if !assets.exists() {
        return Ok(());
    }
    report_missing(&assets);

    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[&assets], env::var("OUT_DIR")?, &copy_options)?;
    Ok(())
}

fn report_missing(assets: &Path) {
    for file in LESSON_FILES {
        if !assets.join(file).exists() {
            println!("cargo:warning=assets/{file} is missing; lessons using it will fail to start");
        }
    }
}
