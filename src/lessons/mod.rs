//! The lesson collection, one [`Lesson`](crate::flow::Lesson) per chapter
//! section.
//!
//! [`LessonKind`] names every lesson and builds it:
//!
//! ```no_run
//! use lesson_ngin::{config::LessonConfig, flow, lessons::LessonKind};
//!
//! let kind: LessonKind = "shadow-mapping".parse().unwrap();
//! flow::run(kind.constructor(), LessonConfig::from_env().with_title(kind.title())).unwrap();
//! ```

pub mod advanced_lighting;
pub mod advanced_opengl;
pub mod common;
pub mod getting_started;
pub mod lighting;
pub mod model_loading;

use std::{fmt, str::FromStr};

use anyhow::Result;

use crate::{
    context::InitContext,
    flow::{Lesson, LessonConstructor},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LessonKind {
    Triangle,
    Rectangle,
    Shaders,
    Textures,
    Coordinates,
    Camera,
    BasicLighting,
    LightingMaps,
    LightCasters,
    MultipleLights,
    Model,
    StencilTesting,
    Cubemaps,
    BlinnPhong,
    ShadowMapping,
    PointShadows,
}

impl LessonKind {
    /// In curriculum order.
    pub const ALL: [LessonKind; 16] = [
        LessonKind::Triangle,
        LessonKind::Rectangle,
        LessonKind::Shaders,
        LessonKind::Textures,
        LessonKind::Coordinates,
        LessonKind::Camera,
        LessonKind::BasicLighting,
        LessonKind::LightingMaps,
        LessonKind::LightCasters,
        LessonKind::MultipleLights,
        LessonKind::Model,
        LessonKind::StencilTesting,
        LessonKind::Cubemaps,
        LessonKind::BlinnPhong,
        LessonKind::ShadowMapping,
        LessonKind::PointShadows,
    ];

    /// Kebab-case name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Triangle => "triangle",
            Self::Rectangle => "rectangle",
            Self::Shaders => "shaders",
            Self::Textures => "textures",
            Self::Coordinates => "coordinates",
            Self::Camera => "camera",
            Self::BasicLighting => "basic-lighting",
            Self::LightingMaps => "lighting-maps",
            Self::LightCasters => "light-casters",
            Self::MultipleLights => "multiple-lights",
            Self::Model => "model",
            Self::StencilTesting => "stencil-testing",
            Self::Cubemaps => "cubemaps",
            Self::BlinnPhong => "blinn-phong",
            Self::ShadowMapping => "shadow-mapping",
            Self::PointShadows => "point-shadows",
        }
    }

    pub fn chapter(&self) -> &'static str {
        match self {
            Self::Triangle
            | Self::Rectangle
            | Self::Shaders
            | Self::Textures
            | Self::Coordinates
            | Self::Camera => "getting started",
            Self::BasicLighting | Self::LightingMaps | Self::LightCasters | Self::MultipleLights => {
                "lighting"
            }
            Self::Model => "model loading",
            Self::StencilTesting | Self::Cubemaps => "advanced OpenGL",
            Self::BlinnPhong | Self::ShadowMapping | Self::PointShadows => "advanced lighting",
        }
    }

    /// Window title.
    pub fn title(&self) -> String {
        format!("{}: {}", self.chapter(), self.name().replace('-', " "))
    }

    pub fn constructor(self) -> LessonConstructor {
        match self {
            Self::Triangle => boxed(getting_started::Triangle::new),
            Self::Rectangle => boxed(getting_started::Rectangle::new),
            Self::Shaders => boxed(getting_started::Shaders::new),
            Self::Textures => boxed(getting_started::Textures::new),
            Self::Coordinates => boxed(getting_started::Coordinates::new),
            Self::Camera => boxed(getting_started::FlyCamera::new),
            Self::BasicLighting => boxed(lighting::BasicLighting::new),
            Self::LightingMaps => boxed(lighting::LightingMaps::new),
            Self::LightCasters => boxed(lighting::LightCasters::new),
            Self::MultipleLights => boxed(lighting::MultipleLights::new),
            Self::Model => boxed(model_loading::ModelViewer::new),
            Self::StencilTesting => boxed(advanced_opengl::StencilTesting::new),
            Self::Cubemaps => boxed(advanced_opengl::Cubemaps::new),
            Self::BlinnPhong => boxed(advanced_lighting::BlinnPhong::new),
            Self::ShadowMapping => boxed(advanced_lighting::ShadowMapping::new),
            Self::PointShadows => boxed(advanced_lighting::PointShadows::new),
        }
    }
}

fn boxed<L, F, Fut>(build: F) -> LessonConstructor
where
    L: Lesson + 'static,
    F: FnOnce(InitContext) -> Fut + 'static,
    Fut: Future<Output = Result<L>> + 'static,
{
    Box::new(move |init| {
        Box::pin(async move {
            let lesson = build(init).await?;
            Ok(Box::new(lesson) as Box<dyn Lesson>)
        })
    })
}

impl fmt::Display for LessonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLesson(pub String);

impl fmt::Display for UnknownLesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown lesson '{}', expected one of: ", self.0)?;
        let names: Vec<_> = LessonKind::ALL.iter().map(LessonKind::name).collect();
        f.write_str(&names.join(", "))
    }
}

impl std::error::Error for UnknownLesson {}

impl FromStr for LessonKind {
    type Err = UnknownLesson;

    /// Accepts kebab-case, snake_case and any letter case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        LessonKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| UnknownLesson(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = LessonKind::ALL.iter().map(LessonKind::name).collect();
        assert_eq!(names.len(), LessonKind::ALL.len());
    }

    #[test]
    fn every_name_parses_back() {
        for kind in LessonKind::ALL {
            assert_eq!(kind.name().parse::<LessonKind>().unwrap(), kind);
            assert_eq!(kind.to_string().parse::<LessonKind>().unwrap(), kind);
        }
    }

    #[test]
    fn snake_case_and_capitals_are_accepted() {
        assert_eq!("shadow_mapping".parse::<LessonKind>().unwrap(), LessonKind::ShadowMapping);
        assert_eq!("Blinn-Phong".parse::<LessonKind>().unwrap(), LessonKind::BlinnPhong);
        assert_eq!(" model ".parse::<LessonKind>().unwrap(), LessonKind::Model);
    }

    #[test]
    fn unknown_names_list_the_alternatives() {
        let err = "hello-world".parse::<LessonKind>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("hello-world"));
        assert!(message.contains("point-shadows"));
    }

    #[test]
    fn titles_name_the_chapter() {
        assert_eq!(LessonKind::MultipleLights.title(), "lighting: multiple lights");
        assert_eq!(LessonKind::Triangle.title(), "getting started: triangle");
    }
}
