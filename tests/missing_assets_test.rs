#[cfg(feature = "integration-tests")]
mod common;

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_name_the_missing_texture() {
    use lesson_ngin::lessons::LessonKind;

    let mut config = common::config();
    config.assets_dir = common::missing_assets();
    let mut ctx = common::headless(config).await;

    let err = common::start(&mut ctx, LessonKind::Textures).await.unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("container.jpg"), "{message}");
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_fail_model_lessons_without_the_model() {
    use lesson_ngin::lessons::LessonKind;

    let mut config = common::config();
    config.assets_dir = common::missing_assets();
    let mut ctx = common::headless(config).await;

    for kind in [LessonKind::Model, LessonKind::ShadowMapping, LessonKind::Cubemaps] {
        let err = common::start(&mut ctx, kind).await.unwrap_err();
        assert!(!format!("{err:#}").is_empty(), "{kind} started without assets");
    }
}
