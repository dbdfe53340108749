#![forbid(unsafe_code)]

//! The intro overlay state machine.
//!
//! # State Machine
//!
//! ```text
//!              mount()
//!                 │
//!                 ▼
//!            ┌─────────┐  skip flag set              ┌───────────┐
//!            │ Loading │────────────────────────────►│ Dismissed │
//!            └─────────┘                             └───────────┘
//!     motion ok │     │ reduced motion / engine failure     ▲
//!               ▼     └───────────────────┐                 │
//!         ┌───────────┐  timeline end     ▼                 │
//!         │ Animating │──skip────────►┌──────────────┐      │
//!         └───────────┘  timeout      │ ContentShown │──────┘
//!                        reduced ────►└──────────────┘  CTA, scroll hint, skip
//! ```
//!
//! # Invariants
//!
//! 1. A set skip flag at mount means `Animating` is never entered.
//! 2. Every transition is guarded on the current state, so whichever of
//!    {timeline end, skip, timeout} arrives first wins and the rest are
//!    no-ops.
//! 3. The completion callback runs at most once, after the skip flag write.
//! 4. Leaving `Animating` releases the progress ticker and the timeout timer.
//!    Reaching `Dismissed` or unmounting releases everything else.
//! 5. After [`unmount`](IntroOverlay::unmount) nothing changes state.
//! 6. Host listeners (motion preference, viewport, pointer) are held for the
//!    session only; none survives `Dismissed` or unmount.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use overture_core::{Control, DisposeBag, InputEvent, KeyCode, Pose};

use crate::analytics::{
    EventSink, IntroEvent, IntroEventKind, NullSink, RevealReason, SkipSource,
};
use crate::audio::{AudioCue, SilentAudio};
use crate::backdrop::{BackgroundOffset, Parallax, Theme};
use crate::choreography::{CascadeEngine, Layer, MotionEngine};
use crate::config::{OverlayConfig, SkipPersistence};
use crate::frame::{FrameControl, FrameScheduler};
use crate::locale::{Locale, Strings};
use crate::mailbox::Mailbox;
use crate::motion::MotionPreferenceDetector;
use crate::progress::ProgressTicker;
use crate::skip_flag::SkipFlag;
use crate::storage::{MemoryStorage, StorageBackend};
use crate::timeline_controller::{Launch, TimelineController};
use crate::viewport::{ViewportClass, ViewportDetector};

/// Viewport width assumed when the host provides none.
const DEFAULT_WIDTH: u32 = 1024;

/// Lifecycle state of an [`IntroOverlay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayState {
    Loading,
    Animating,
    ContentShown,
    Dismissed,
}

impl OverlayState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OverlayState::Loading => "loading",
            OverlayState::Animating => "animating",
            OverlayState::ContentShown => "content_shown",
            OverlayState::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages posted by components to the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Signal {
    TimelineCompleted,
    Timeout,
    MotionPreference(bool),
    Viewport(ViewportClass),
}

/// What the host should render this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView {
    pub state: OverlayState,
    /// Progress bar shown while the intro plays.
    pub progress_visible: bool,
    pub progress: f32,
    /// Loading spinner, shown until the first progress sample.
    pub spinner_visible: bool,
    /// Whether the overlay body is drawn at all.
    pub body_visible: bool,
    /// Whether the call to action, scroll hint and mute toggle accept input.
    pub controls_enabled: bool,
    pub layers: [(Layer, Pose); 5],
    pub muted: bool,
    /// Label of the mute toggle (names the action it performs).
    pub mute_label: &'static str,
    pub strings: &'static Strings,
    /// Text for assistive technology, set once the content is shown.
    pub announcement: Option<&'static str>,
    pub focus: Option<Control>,
    pub viewport: ViewportClass,
    pub logo_size: u16,
    pub chevron_size: u16,
    pub locale: Locale,
    pub theme: Theme,
    /// Background position, drifting with the pointer.
    pub background_offset: BackgroundOffset,
}

impl OverlayView {
    /// Pose of one layer.
    #[must_use]
    pub fn pose(&self, layer: Layer) -> Pose {
        self.layers
            .iter()
            .find(|(l, _)| *l == layer)
            .map_or(Pose::REST, |(_, p)| *p)
    }
}

/// Builder for [`IntroOverlay`].
pub struct OverlayBuilder {
    config: OverlayConfig,
    storage: Arc<dyn StorageBackend>,
    audio: Box<dyn AudioCue>,
    engine: Box<dyn MotionEngine>,
    sink: Box<dyn EventSink>,
    motion: Option<MotionPreferenceDetector>,
    viewport: Option<ViewportDetector>,
    on_complete: Option<Box<dyn FnOnce()>>,
}

impl Default for OverlayBuilder {
    fn default() -> Self {
        Self {
            config: OverlayConfig::default(),
            storage: Arc::new(MemoryStorage::new()),
            audio: Box::new(SilentAudio),
            engine: Box::new(CascadeEngine),
            sink: Box::new(NullSink),
            motion: None,
            viewport: None,
            on_complete: None,
        }
    }
}

impl OverlayBuilder {
    #[must_use]
    pub fn config(mut self, config: OverlayConfig) -> Self {
        self.config = config;
        self
    }

    /// Backend holding the skip flag. Defaults to in-memory storage.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = storage;
        self
    }

    #[must_use]
    pub fn audio(mut self, audio: impl AudioCue + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    #[must_use]
    pub fn engine(mut self, engine: impl MotionEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    #[must_use]
    pub fn event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Share a motion preference the host keeps updating.
    #[must_use]
    pub fn motion(mut self, detector: MotionPreferenceDetector) -> Self {
        self.motion = Some(detector);
        self
    }

    /// Share a viewport detector the host keeps updating.
    #[must_use]
    pub fn viewport(mut self, detector: ViewportDetector) -> Self {
        self.viewport = Some(detector);
        self
    }

    /// Called once when the host should show the page underneath.
    #[must_use]
    pub fn on_complete(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn build(self) -> IntroOverlay {
        let viewport = self
            .viewport
            .unwrap_or_else(|| ViewportDetector::new(DEFAULT_WIDTH, self.config.mobile_breakpoint));
        let scheduler = FrameScheduler::new();
        IntroOverlay {
            skip_flag: SkipFlag::new(self.storage, self.config.storage_key.clone()),
            muted: self.config.start_muted,
            locale: self.config.locale,
            theme: self.config.theme,
            parallax: Parallax::new(),
            config: self.config,
            state: OverlayState::Loading,
            history: Vec::new(),
            audio: self.audio,
            engine: self.engine,
            sink: self.sink,
            motion: self.motion.unwrap_or_default(),
            viewport,
            ticker: ProgressTicker::new(scheduler.clone()),
            scheduler,
            mailbox: Mailbox::new(),
            controller: TimelineController::new(),
            phase: DisposeBag::new(),
            session: DisposeBag::new(),
            on_complete: self.on_complete,
            skipped: false,
            mounted: false,
            unmounted: false,
        }
    }
}

/// Full-screen intro shown before the main page.
pub struct IntroOverlay {
    config: OverlayConfig,
    state: OverlayState,
    history: Vec<OverlayState>,
    skip_flag: SkipFlag,
    audio: Box<dyn AudioCue>,
    engine: Box<dyn MotionEngine>,
    sink: Box<dyn EventSink>,
    motion: MotionPreferenceDetector,
    viewport: ViewportDetector,
    scheduler: FrameScheduler,
    mailbox: Mailbox<Signal>,
    ticker: ProgressTicker,
    controller: TimelineController,
    /// Released when leaving `Animating`.
    phase: DisposeBag,
    /// Released at `Dismissed` or unmount.
    session: DisposeBag,
    on_complete: Option<Box<dyn FnOnce()>>,
    muted: bool,
    locale: Locale,
    theme: Theme,
    parallax: Parallax,
    /// The user used a skip control at some point.
    skipped: bool,
    mounted: bool,
    unmounted: bool,
}

impl fmt::Debug for IntroOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntroOverlay")
            .field("state", &self.state)
            .field("history", &self.history)
            .field("muted", &self.muted)
            .field("locale", &self.locale)
            .field("theme", &self.theme)
            .field("skipped", &self.skipped)
            .field("unmounted", &self.unmounted)
            .finish()
    }
}

impl IntroOverlay {
    #[must_use]
    pub fn builder() -> OverlayBuilder {
        OverlayBuilder::default()
    }

    /// Start the lifecycle. Only the first call has an effect.
    pub fn mount(&mut self, now: Duration) {
        if self.mounted || self.unmounted {
            return;
        }
        self.mounted = true;
        self.history.push(OverlayState::Loading);
        tracing::debug!(storage_key = %self.skip_flag.key(), "intro overlay mounted");

        let mailbox = self.mailbox.clone();
        self.session.hold(
            "motion_preference",
            self.motion
                .subscribe(move |reduced| mailbox.post(Signal::MotionPreference(reduced))),
        );
        let mailbox = self.mailbox.clone();
        self.session.hold(
            "viewport",
            self.viewport
                .subscribe(move |class| mailbox.post(Signal::Viewport(class))),
        );
        self.session.hold("pointer", self.parallax.listen());

        if self.skip_flag.read() {
            self.emit(IntroEventKind::Restored, now);
            self.dismiss(true, now);
            return;
        }

        let launch = self.controller.start(
            self.motion.prefers_reduced_motion(),
            self.engine.as_ref(),
            &self.scheduler,
            self.mailbox.clone(),
            Signal::TimelineCompleted,
            now,
        );
        match launch {
            Launch::Running => self.enter_animating(now),
            Launch::Immediate(reason) => self.reveal(reason, now),
        }
    }

    /// Handle one host input, then any messages it caused.
    pub fn dispatch(&mut self, event: InputEvent, now: Duration) {
        if !self.is_live() {
            return;
        }
        self.handle_input(event, now);
        self.process_signals(now);
    }

    /// Advance every frame callback to `now`, then handle their messages.
    pub fn frame(&mut self, now: Duration) {
        if !self.is_live() {
            return;
        }
        self.scheduler.pump(now);
        self.process_signals(now);
    }

    /// One event-loop turn: frame callbacks run, then `inputs` are handled,
    /// then the messages queued by both.
    ///
    /// A timeline that ends in the same turn as a skip loses to the skip.
    pub fn turn(&mut self, now: Duration, inputs: impl IntoIterator<Item = InputEvent>) {
        if !self.is_live() {
            return;
        }
        self.scheduler.pump(now);
        for event in inputs {
            self.handle_input(event, now);
        }
        self.process_signals(now);
    }

    /// Switch the interface language.
    pub fn set_locale(&mut self, locale: Locale) {
        if self.locale != locale {
            tracing::debug!(from = %self.locale, to = %locale, "locale changed");
            self.locale = locale;
        }
    }

    /// Release every resource without invoking the completion callback.
    ///
    /// Idempotent. Later calls into the overlay do nothing.
    pub fn unmount(&mut self) {
        if self.unmounted {
            return;
        }
        self.unmounted = true;
        self.release_phase();
        self.controller.teardown();
        self.session.dispose_all();
        self.scheduler.cancel_all();
        self.mailbox.clear();
        self.on_complete = None;
        tracing::debug!(state = %self.state, "intro overlay unmounted");
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Every state entered, in order.
    #[must_use]
    pub fn history(&self) -> &[OverlayState] {
        &self.history
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Pointer parallax state of the backdrop.
    #[must_use]
    pub fn parallax(&self) -> &Parallax {
        &self.parallax
    }

    #[must_use]
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Whether the completion callback has been handed out.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == OverlayState::Dismissed && self.on_complete.is_none()
    }

    /// The cosmetic progress ticker.
    #[must_use]
    pub fn ticker(&self) -> &ProgressTicker {
        &self.ticker
    }

    /// The intro timeline controller.
    #[must_use]
    pub fn controller(&self) -> &TimelineController {
        &self.controller
    }

    /// Frame scheduler driving this overlay.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> OverlayView {
        let class = self.viewport.class();
        let scale = class.scale();
        let strings = self.locale.strings();
        let shown = self.state == OverlayState::ContentShown;
        let animating = self.state == OverlayState::Animating;
        let layers = Layer::ALL.map(|layer| (layer, self.controller.pose(layer, scale.travel)));
        OverlayView {
            state: self.state,
            progress_visible: animating,
            progress: self.ticker.value(),
            spinner_visible: animating && self.ticker.value() == 0.0,
            body_visible: matches!(
                self.state,
                OverlayState::Animating | OverlayState::ContentShown
            ),
            controls_enabled: shown,
            layers,
            muted: self.muted,
            mute_label: if self.muted { strings.unmute } else { strings.mute },
            strings,
            announcement: shown.then_some(strings.announcement),
            focus: shown.then_some(Control::SkipButton),
            viewport: class,
            logo_size: scale.logo_size,
            chevron_size: scale.chevron_size,
            locale: self.locale,
            theme: self.theme,
            background_offset: self.parallax.offset(),
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Transitions
    // ────────────────────────────────────────────────────────────────────

    fn is_live(&self) -> bool {
        self.mounted && !self.unmounted
    }

    /// The body is on screen and its toggles respond.
    fn is_interactive(&self) -> bool {
        matches!(
            self.state,
            OverlayState::Animating | OverlayState::ContentShown
        )
    }

    fn enter(&mut self, to: OverlayState) {
        tracing::info!(from = %self.state, to = %to, "intro overlay transition");
        self.state = to;
        self.history.push(to);
    }

    fn emit(&self, kind: IntroEventKind, now: Duration) {
        self.sink.record(IntroEvent { kind, at: now });
    }

    fn enter_animating(&mut self, now: Duration) {
        self.enter(OverlayState::Animating);
        self.emit(IntroEventKind::Shown, now);

        let progress = self.ticker.start(self.config.progress_duration, now);
        self.phase.hold("progress", progress);

        if let Some(timeout) = self.config.intro_timeout {
            let deadline = now.saturating_add(timeout);
            let mailbox = self.mailbox.clone();
            let timer = self.scheduler.request("intro_timeout", move |now| {
                if now >= deadline {
                    mailbox.post(Signal::Timeout);
                    FrameControl::Stop
                } else {
                    FrameControl::Continue
                }
            });
            self.phase.hold("intro_timeout", timer);
        }

        self.play_chime();
    }

    fn play_chime(&self) {
        if self.muted || self.motion.prefers_reduced_motion() {
            return;
        }
        let Some(asset) = self.config.chime_asset.as_deref() else {
            return;
        };
        if let Err(e) = self.audio.play(asset, self.config.chime_volume) {
            tracing::debug!(asset, error = %e, "intro chime not played");
        }
    }

    /// Show the content. No-op unless still loading or animating.
    fn reveal(&mut self, reason: RevealReason, now: Duration) {
        if !matches!(self.state, OverlayState::Loading | OverlayState::Animating) {
            return;
        }
        self.release_phase();
        match reason {
            RevealReason::Skipped | RevealReason::Timeout => self.controller.finish_intro(),
            RevealReason::ReducedMotion | RevealReason::FailOpen => self.controller.teardown(),
            RevealReason::Completed => {}
        }
        self.enter(OverlayState::ContentShown);
        self.emit(IntroEventKind::Revealed { reason }, now);
    }

    /// Hand control to the host. `restored` means the flag was already set.
    fn dismiss(&mut self, restored: bool, now: Duration) {
        if self.state == OverlayState::Dismissed {
            return;
        }
        self.release_phase();
        self.controller.teardown();
        self.enter(OverlayState::Dismissed);

        let persist = !restored
            && (self.skipped || self.config.skip_persistence == SkipPersistence::OnAnyCompletion);
        if persist {
            self.skip_flag.write();
        }
        self.emit(
            IntroEventKind::Completed {
                skipped: restored || self.skipped,
            },
            now,
        );
        self.session.dispose_all();
        self.mailbox.clear();
        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
    }

    fn release_phase(&mut self) {
        self.ticker.cancel();
        self.phase.dispose_all();
    }

    fn skip(&mut self, source: SkipSource, now: Duration) {
        match self.state {
            OverlayState::Animating => {
                self.skipped = true;
                self.emit(IntroEventKind::Skipped { source }, now);
                self.reveal(RevealReason::Skipped, now);
            }
            OverlayState::ContentShown => {
                self.skipped = true;
                self.emit(IntroEventKind::Skipped { source }, now);
                self.dismiss(false, now);
            }
            OverlayState::Loading | OverlayState::Dismissed => {}
        }
    }

    fn handle_input(&mut self, event: InputEvent, now: Duration) {
        match event {
            InputEvent::Key(KeyCode::Escape) => self.skip(SkipSource::EscapeKey, now),
            InputEvent::Key(KeyCode::Enter) => self.skip(SkipSource::EnterKey, now),
            InputEvent::Key(_) => {}
            InputEvent::Click(Control::SkipButton) => self.skip(SkipSource::Button, now),
            InputEvent::Click(Control::PrimaryCta | Control::ScrollHint) => {
                if self.state == OverlayState::ContentShown {
                    self.dismiss(false, now);
                }
            }
            InputEvent::Click(Control::MuteToggle) => {
                if self.is_interactive() {
                    self.muted = !self.muted;
                    tracing::debug!(muted = self.muted, "mute toggled");
                }
            }
            InputEvent::Click(Control::ThemeToggle) => {
                if self.is_interactive() {
                    self.theme = self.theme.toggled();
                    tracing::debug!(theme = %self.theme, "theme toggled");
                }
            }
            InputEvent::Resize { width } => self.viewport.resize(width),
            InputEvent::Pointer { x, y } => {
                if self.parallax.pointer_moved(x, y) {
                    tracing::trace!(offset = %self.parallax.offset(), "backdrop moved");
                }
            }
        }
    }

    fn process_signals(&mut self, now: Duration) {
        loop {
            let signals = self.mailbox.drain();
            if signals.is_empty() {
                break;
            }
            for signal in signals {
                match signal {
                    Signal::TimelineCompleted => {
                        if self.state == OverlayState::Animating {
                            self.reveal(RevealReason::Completed, now);
                        }
                    }
                    Signal::Timeout => {
                        if self.state == OverlayState::Animating {
                            tracing::warn!("intro did not finish in time, showing content");
                            self.reveal(RevealReason::Timeout, now);
                        }
                    }
                    Signal::MotionPreference(true) => {
                        if self.state == OverlayState::Animating {
                            self.reveal(RevealReason::ReducedMotion, now);
                        }
                    }
                    Signal::MotionPreference(false) => {}
                    Signal::Viewport(class) => {
                        tracing::debug!(?class, "overlay rescaled");
                    }
                }
            }
        }
    }
}

impl Drop for IntroOverlay {
    fn drop(&mut self) {
        self.unmount();
    }
}
