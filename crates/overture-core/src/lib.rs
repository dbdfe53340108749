#![forbid(unsafe_code)]

//! Core primitives for Overture.
//!
//! Everything in this crate is pure and host-driven: time only moves when the
//! caller passes a `Duration`, nothing blocks, and nothing spawns threads.

pub mod animation;
pub mod clock;
pub mod dispose;
pub mod event;
pub mod logging;

pub use animation::{
    Animation, AnimationGroup, EasingFn, Pose, PoseProps, Position, Repeat, Timeline, Tween,
};
pub use clock::{Clock, DeterministicClock, MonotonicClock};
pub use dispose::{DisposeBag, Disposable};
pub use event::{Control, InputEvent, KeyCode};

#[cfg(feature = "tracing")]
pub use logging::{debug, trace, warn};

#[cfg(feature = "tracing-json")]
pub use logging::init_json_subscriber;
