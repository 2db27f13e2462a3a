#[cfg(feature = "integration-tests")]
mod common;

/// A double-sided 1.6 x 2.3 slab at y = 0.5, just above the camera. Seen
/// from the default camera it stays out of the lower half of the frame,
/// while the shadow light at (4, 3, 0) throws it onto the floor below the
/// centre of the image.
#[cfg(feature = "integration-tests")]
const SLAB_OBJ: &str = "\
o slab
v 1.2 0.5 -2.5
v 2.8 0.5 -2.5
v 2.8 0.5 -0.2
v 1.2 0.5 -0.2
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 1.0 0.0
vn 0.0 -1.0 0.0
f 1/1/1 4/4/1 3/3/1 2/2/1
f 1/1/2 2/2/2 3/3/2 4/4/2
";

/// Writes every file the asset-backed lessons open into a fresh directory.
#[cfg(feature = "integration-tests")]
fn write_assets(name: &str) -> std::path::PathBuf {
    use lesson_ngin::resources::texture::SKYBOX_FACES;

    let root = std::env::temp_dir().join(format!("lesson-ngin-{name}-{}", std::process::id()));
    std::fs::create_dir_all(root.join("backpack")).unwrap();
    std::fs::create_dir_all(root.join("skybox")).unwrap();

    let checker = image::RgbImage::from_fn(4, 4, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgb([200, 120, 40])
        } else {
            image::Rgb([40, 120, 200])
        }
    });
    for file in ["container.jpg", "awesomeface.png", "container2.png", "container2_specular.png"] {
        checker.save(root.join(file)).unwrap();
    }
    for (i, face) in SKYBOX_FACES.iter().enumerate() {
        let shade = 40 * i as u8;
        image::RgbImage::from_pixel(2, 2, image::Rgb([shade, 100, 255 - shade]))
            .save(root.join("skybox").join(face))
            .unwrap();
    }
    std::fs::write(root.join("backpack/backpack.obj"), SLAB_OBJ).unwrap();
    root
}

#[cfg(feature = "integration-tests")]
fn brightness(pixel: image::Rgba<u8>) -> u32 {
    pixel.0[..3].iter().map(|c| *c as u32).sum()
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_render_every_lesson_with_local_assets() {
    use lesson_ngin::lessons::LessonKind;

    let mut config = common::config();
    config.assets_dir = write_assets("all-lessons");
    let mut ctx = common::headless(config).await;

    for kind in LessonKind::ALL {
        let mut lesson = common::start(&mut ctx, kind)
            .await
            .unwrap_or_else(|err| panic!("{kind} failed to start: {err:#}"));
        let image = common::render(&mut ctx, lesson.as_mut(), 3).await;
        assert_eq!((image.width(), image.height()), (common::WIDTH, common::HEIGHT), "{kind}");
    }
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_darken_the_floor_under_the_model() {
    use lesson_ngin::lessons::LessonKind;

    let mut config = common::config();
    config.assets_dir = write_assets("shadow-mapping");
    let mut ctx = common::headless(config).await;
    let mut lesson = common::start(&mut ctx, LessonKind::ShadowMapping).await.unwrap();
    let image = common::render(&mut ctx, lesson.as_mut(), 1).await;

    // Both pixels look at the floor about 5.6 units ahead of the camera.
    let row = common::HEIGHT - 4;
    let shadowed = *image.get_pixel(common::WIDTH / 2, row);
    let lit = *image.get_pixel(2, row);
    assert!(
        brightness(lit) > brightness(shadowed) + 30,
        "lit {lit:?} vs shadowed {shadowed:?}"
    );
    assert!(brightness(shadowed) > 0, "the floor keeps its ambient term");
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_size_the_cube_map_from_the_config() {
    use lesson_ngin::lessons::advanced_lighting::PointShadows;

    let mut config = common::config();
    config.assets_dir = write_assets("point-shadows");
    config.shadow_resolution = 256;
    let ctx = common::headless(config).await;

    let lesson = PointShadows::new(ctx.init_context()).await.unwrap();
    assert_eq!(lesson.shadow_size(), 256);
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_count_only_the_backpack_textures() {
    use lesson_ngin::lessons::common::load_backpack;

    let mut config = common::config();
    config.assets_dir = write_assets("texture-count");
    let ctx = common::headless(config).await;

    // No materials, so the model falls back to generated maps only.
    let backpack = load_backpack(&ctx.init_context()).await.unwrap();
    assert_eq!(backpack.texture_count(), 0);
    assert!((backpack.centre.x - 2.0).abs() < 1e-4, "{:?}", backpack.centre);
}
