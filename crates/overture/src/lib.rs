#![forbid(unsafe_code)]

//! Overture public facade crate.
//!
//! Re-exports the stable surface of the core and runtime crates and offers a
//! prelude for hosts embedding the intro overlay.

// --- Core re-exports -------------------------------------------------------

pub use overture_core::animation::{Callbacks, Milestone};
pub use overture_core::{
    Animation, AnimationGroup, Clock, Control, DeterministicClock, DisposeBag, Disposable,
    InputEvent, KeyCode, MonotonicClock, Pose, PoseProps, Position, Repeat, Timeline, Tween,
};

// --- Runtime re-exports ----------------------------------------------------

pub use overture_runtime::{
    AudioCue, AudioError, BackgroundOffset, CascadeEngine, Choreography, ConfigError,
    DisabledStorage, EngineError, EventSink, FrameControl, FrameHandle, FrameScheduler, IntroEvent,
    IntroEventKind, IntroOverlay, Layer, Locale, MemorySink, MemoryStorage, MotionEngine,
    MotionPreferenceDetector, NullSink, OverlayBuilder, OverlayConfig, OverlaySimulator,
    OverlayState, OverlayView, ProgressTicker, RevealReason, SilentAudio, SkipFlag, SkipPersistence,
    SkipSource, StorageBackend, StorageError, Strings, Theme, TracingSink, ViewportClass,
    ViewportDetector, VisualScale, detect_system_locale,
};

#[cfg(feature = "file-storage")]
pub use overture_runtime::FileStorage;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Control, InputEvent, IntroOverlay, KeyCode, Locale, MotionPreferenceDetector,
        OverlayConfig, OverlayState, OverlayView, SkipPersistence, Theme, ViewportDetector,
    };

    pub use crate::{core, runtime};
}

pub use overture_core as core;
pub use overture_runtime as runtime;
