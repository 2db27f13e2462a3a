#[cfg(feature = "integration-tests")]
mod common;

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_clear_to_the_configured_colour() {
    use lesson_ngin::lessons::LessonKind;

    let mut ctx = common::headless(common::config()).await;
    let mut lesson = common::start(&mut ctx, LessonKind::Triangle).await.unwrap();
    ctx.clear_colour = wgpu::Color::WHITE;

    let image = common::render(&mut ctx, lesson.as_mut(), 1).await;
    assert_eq!((image.width(), image.height()), (common::WIDTH, common::HEIGHT));
    // The two triangles stay clear of the corners.
    for (x, y) in [(0, 0), (common::WIDTH - 1, 0), (0, common::HEIGHT - 1)] {
        assert_eq!(*image.get_pixel(x, y), image::Rgba([255, 255, 255, 255]));
    }
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_keep_the_clear_colour_a_lesson_sets() {
    use lesson_ngin::lessons::LessonKind;

    let mut ctx = common::headless(common::config()).await;
    let mut lesson = common::start(&mut ctx, LessonKind::Rectangle).await.unwrap();
    let before = ctx.clear_colour;
    let _ = common::render(&mut ctx, lesson.as_mut(), 3).await;
    assert_eq!(ctx.clear_colour, before);
}
