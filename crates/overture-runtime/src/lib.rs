#![forbid(unsafe_code)]

//! Host-driven runtime for the Overture intro overlay.
//!
//! The host owns time and input. It builds an [`IntroOverlay`], mounts it,
//! then calls [`frame`](IntroOverlay::frame) once per display frame and
//! [`dispatch`](IntroOverlay::dispatch) for every key press, click and
//! resize. Everything the overlay starts is released when it reaches
//! `Dismissed` or is unmounted.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use overture_core::{Control, KeyCode};
//! use overture_runtime::{IntroOverlay, OverlayState};
//!
//! let done = Rc::new(Cell::new(false));
//! let flag = Rc::clone(&done);
//! let mut overlay = IntroOverlay::builder()
//!     .on_complete(move || flag.set(true))
//!     .build();
//!
//! overlay.mount(Duration::ZERO);
//! assert_eq!(overlay.state(), OverlayState::Animating);
//!
//! overlay.dispatch(KeyCode::Escape.into(), Duration::from_millis(300));
//! assert_eq!(overlay.state(), OverlayState::ContentShown);
//!
//! overlay.dispatch(Control::PrimaryCta.into(), Duration::from_millis(900));
//! assert!(done.get());
//! ```

pub mod analytics;
pub mod audio;
pub mod backdrop;
pub mod choreography;
pub mod config;
pub mod frame;
pub mod locale;
pub mod mailbox;
pub mod motion;
pub mod overlay;
pub mod progress;
pub mod reactive;
pub mod simulator;
pub mod skip_flag;
pub mod storage;
pub mod timeline_controller;
pub mod viewport;

pub use analytics::{
    EventSink, IntroEvent, IntroEventKind, MemorySink, NullSink, RevealReason, SkipSource,
    TracingSink,
};
pub use audio::{AudioCue, AudioError, SilentAudio};
pub use backdrop::{BackgroundOffset, Parallax, PointerListener, Theme, UnknownTheme};
pub use choreography::{
    CascadeEngine, Choreography, EngineError, FixedEngine, Layer, LoopProp, LoopSpec,
    MotionEngine, UnavailableEngine,
};
pub use config::{ConfigError, OverlayConfig, SkipPersistence};
pub use frame::{FrameControl, FrameHandle, FrameScheduler};
pub use locale::{Locale, Strings, UnknownLocale, detect_system_locale};
pub use mailbox::Mailbox;
pub use motion::MotionPreferenceDetector;
pub use overlay::{IntroOverlay, OverlayBuilder, OverlayState, OverlayView};
pub use progress::ProgressTicker;
pub use reactive::{Observable, Subscription};
pub use simulator::OverlaySimulator;
pub use skip_flag::{DEFAULT_SKIP_KEY, SkipFlag};
#[cfg(feature = "file-storage")]
pub use storage::FileStorage;
pub use storage::{DisabledStorage, MemoryStorage, StorageBackend, StorageError, StorageResult};
pub use timeline_controller::{Launch, TimelineController};
pub use viewport::{ViewportClass, ViewportDetector, VisualScale};
