#![forbid(unsafe_code)]

//! What the intro animates.
//!
//! A [`Choreography`] is the one-shot cascade plus the decorative loops that
//! keep running after it. A [`MotionEngine`] produces one; loading can fail,
//! in which case the overlay skips straight to its content.
//!
//! All distances are authored at desktop size. Sampling multiplies vertical
//! travel by [`VisualScale::travel`](crate::viewport::VisualScale).

use std::fmt;
use std::time::Duration;

use overture_core::animation::{
    back_out, ease_in_out, elastic_out_bouncy, elastic_out_soft, linear,
};
use overture_core::{Pose, PoseProps, Position, Repeat, Timeline, Tween};

/// Visual groups of the overlay, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Mountain silhouette.
    Background,
    /// Sun disc.
    Accent,
    /// Logo, title and tagline.
    TextGroup,
    /// Primary call-to-action button.
    CallToAction,
    /// "Scroll to explore" chevron.
    ScrollHint,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Background,
        Layer::Accent,
        Layer::TextGroup,
        Layer::CallToAction,
        Layer::ScrollHint,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Layer::Background => "background",
            Layer::Accent => "accent",
            Layer::TextGroup => "text",
            Layer::CallToAction => "cta",
            Layer::ScrollHint => "scroll_hint",
        }
    }
}

/// Pose field a decorative loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopProp {
    /// Added to rotation, in degrees.
    Rotation,
    /// Added to scale.
    ScaleBoost,
    /// Added to y, in pixels before travel scaling.
    Y,
    /// Added to glow.
    Glow,
}

/// One infinite decorative loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopSpec {
    pub label: &'static str,
    pub layer: Layer,
    pub prop: LoopProp,
    /// Offset at loop value 1.0.
    pub amplitude: f32,
    pub repeat: Repeat,
}

impl LoopSpec {
    /// Add this loop's contribution at `value` to `pose`.
    pub fn apply(&self, pose: &mut Pose, value: f32, travel: f32) {
        let offset = self.amplitude * value;
        match self.prop {
            LoopProp::Rotation => pose.rotation += offset,
            LoopProp::ScaleBoost => pose.scale += offset,
            LoopProp::Y => pose.y += offset * travel,
            LoopProp::Glow => pose.glow = (pose.glow + offset).clamp(0.0, 1.0),
        }
    }
}

/// Intro cascade plus decorative loops.
#[derive(Debug, Clone)]
pub struct Choreography {
    pub intro: Timeline<Layer>,
    pub loops: Vec<LoopSpec>,
}

impl Choreography {
    /// The cascading reveal.
    #[must_use]
    pub fn cascade() -> Self {
        let hidden_text = Pose {
            opacity: 0.0,
            y: 100.0,
            scale: 0.5,
            rotation: 180.0,
            blur: 20.0,
            ..Pose::REST
        };
        let text_props = PoseProps::OPACITY
            | PoseProps::Y
            | PoseProps::SCALE
            | PoseProps::ROTATION
            | PoseProps::BLUR;

        let intro = Timeline::new()
            .set(
                Layer::Background,
                Pose {
                    opacity: 0.0,
                    y: 200.0,
                    skew_x: 25.0,
                    ..Pose::REST
                },
            )
            .set(
                Layer::Accent,
                Pose {
                    opacity: 0.0,
                    scale: 0.0,
                    rotation: -180.0,
                    ..Pose::REST
                },
            )
            .set(Layer::TextGroup, hidden_text)
            .set(Layer::CallToAction, hidden_text)
            .set(Layer::ScrollHint, hidden_text)
            .to(
                Layer::Background,
                Pose::REST,
                PoseProps::OPACITY | PoseProps::Y | PoseProps::SKEW_X,
                Tween::new(ms(2500)).easing(elastic_out_soft),
                Position::Append,
            )
            .to(
                Layer::Accent,
                Pose::REST,
                PoseProps::OPACITY | PoseProps::SCALE | PoseProps::ROTATION,
                Tween::new(ms(2500)).easing(elastic_out_bouncy),
                Position::Overlap(ms(1500)),
            )
            .to(
                Layer::TextGroup,
                Pose::REST,
                text_props,
                Tween::new(ms(2000)).easing(elastic_out_soft),
                Position::Append,
            )
            .to(
                Layer::CallToAction,
                Pose::REST,
                text_props,
                Tween::new(ms(1200)).easing(elastic_out_soft),
                Position::Overlap(ms(800)),
            )
            .to(
                Layer::ScrollHint,
                Pose::REST,
                text_props,
                Tween::new(ms(1000)).easing(back_out),
                Position::Overlap(ms(500)),
            );

        let loops = vec![
            LoopSpec {
                label: "accent_spin",
                layer: Layer::Accent,
                prop: LoopProp::Rotation,
                amplitude: 360.0,
                repeat: Repeat::new(ms(25000)).easing(linear),
            },
            LoopSpec {
                label: "accent_breathe",
                layer: Layer::Accent,
                prop: LoopProp::ScaleBoost,
                amplitude: 0.1,
                repeat: Repeat::new(ms(4000)).yoyo().easing(ease_in_out),
            },
            LoopSpec {
                label: "scroll_bob",
                layer: Layer::ScrollHint,
                prop: LoopProp::Y,
                amplitude: 15.0,
                repeat: Repeat::new(ms(2000)).yoyo().easing(ease_in_out),
            },
            LoopSpec {
                label: "scroll_glow",
                layer: Layer::ScrollHint,
                prop: LoopProp::Glow,
                amplitude: 1.0,
                repeat: Repeat::new(ms(1500)).yoyo().easing(ease_in_out),
            },
            LoopSpec {
                label: "text_float",
                layer: Layer::TextGroup,
                prop: LoopProp::Y,
                amplitude: -10.0,
                repeat: Repeat::new(ms(3000))
                    .yoyo()
                    .delay(ms(2000))
                    .easing(ease_in_out),
            },
        ];

        Self { intro, loops }
    }

    /// Reject choreographies the overlay cannot play.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.intro.segments().is_empty() {
            return Err(EngineError::Invalid("intro has no segments".into()));
        }
        let mut labels: Vec<&str> = self.loops.iter().map(|l| l.label).collect();
        labels.sort_unstable();
        if labels.windows(2).any(|w| w[0] == w[1]) {
            return Err(EngineError::Invalid("duplicate loop label".into()));
        }
        Ok(())
    }
}

const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Why a choreography could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine's resources could not be loaded.
    Unavailable(String),
    /// The engine produced something unplayable.
    Invalid(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Unavailable(why) => write!(f, "animation engine unavailable: {why}"),
            EngineError::Invalid(why) => write!(f, "invalid choreography: {why}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Source of the intro choreography.
pub trait MotionEngine {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Produce the choreography to play.
    fn load(&self) -> Result<Choreography, EngineError>;
}

/// Built-in engine playing [`Choreography::cascade`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CascadeEngine;

impl MotionEngine for CascadeEngine {
    fn name(&self) -> &str {
        "cascade"
    }

    fn load(&self) -> Result<Choreography, EngineError> {
        Ok(Choreography::cascade())
    }
}

/// Engine that hands out a fixed choreography.
#[derive(Debug, Clone)]
pub struct FixedEngine {
    choreography: Choreography,
}

impl FixedEngine {
    #[must_use]
    pub fn new(choreography: Choreography) -> Self {
        Self { choreography }
    }
}

impl MotionEngine for FixedEngine {
    fn name(&self) -> &str {
        "fixed"
    }

    fn load(&self) -> Result<Choreography, EngineError> {
        self.choreography.validate()?;
        Ok(self.choreography.clone())
    }
}

/// Engine whose resources never load.
#[derive(Debug, Clone, Default)]
pub struct UnavailableEngine {
    pub reason: String,
}

impl MotionEngine for UnavailableEngine {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn load(&self) -> Result<Choreography, EngineError> {
        Err(EngineError::Unavailable(self.reason.clone()))
    }
}
