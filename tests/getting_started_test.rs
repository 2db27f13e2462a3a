#[cfg(feature = "integration-tests")]
mod common;

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_draw_an_orange_rectangle_in_the_middle() {
    use lesson_ngin::lessons::LessonKind;

    let mut ctx = common::headless(common::config()).await;
    let mut lesson = common::start(&mut ctx, LessonKind::Rectangle).await.unwrap();
    ctx.clear_colour = wgpu::Color::BLACK;

    let image = common::render(&mut ctx, lesson.as_mut(), 1).await;
    let image::Rgba([r, g, b, a]) = common::centre(&image);
    // Orange (1.0, 0.5, 0.2) after sRGB encoding.
    assert_eq!((r, a), (255, 255));
    assert!((180..=195).contains(&g), "green {g}");
    assert!((115..=130).contains(&b), "blue {b}");
    assert_eq!(common::corner(&image), image::Rgba([0, 0, 0, 255]));
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_pulse_the_shader_triangle_green() {
    use lesson_ngin::lessons::LessonKind;

    let mut ctx = common::headless(common::config()).await;
    let mut lesson = common::start(&mut ctx, LessonKind::Shaders).await.unwrap();
    ctx.clear_colour = wgpu::Color::BLACK;

    // Ten frames in, sin(t) / 2 + 0.5 is well above zero.
    let image = common::render(&mut ctx, lesson.as_mut(), 10).await;
    let image::Rgba([r, g, _, _]) = common::centre(&image);
    assert!(r > 0, "the dark red base colour is missing");
    assert!(g > 100, "green {g}");
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_leave_the_camera_alone_in_flat_lessons() {
    use lesson_ngin::lessons::LessonKind;

    let mut ctx = common::headless(common::config()).await;
    let _lesson = common::start(&mut ctx, LessonKind::Triangle).await.unwrap();
    assert!(!ctx.camera.controller.is_enabled());
}
