#![forbid(unsafe_code)]

//! One simulated overlay session.

use std::cell::{Cell, RefCell};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use overture_core::{Clock, Control, InputEvent, KeyCode, MonotonicClock};
use overture_runtime::simulator::FRAME_INTERVAL;
use overture_runtime::{
    AudioCue, AudioError, EventSink, FileStorage, IntroEvent, IntroEventKind, IntroOverlay, Layer,
    MemorySink, MemoryStorage, MotionPreferenceDetector, OverlayConfig, OverlaySimulator,
    OverlayState, OverlayView, SkipFlag, SkipPersistence, StorageBackend, TracingSink,
    ViewportDetector,
};
use serde::Serialize;

use crate::cli::Opts;

/// Sessions never run longer than this.
pub const SESSION_LIMIT: Duration = Duration::from_secs(30);

/// Rings the terminal bell instead of playing the chime asset.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellAudio;

impl AudioCue for BellAudio {
    fn play(&self, asset: &str, _volume: f32) -> Result<(), AudioError> {
        let mut stderr = io::stderr();
        if !stderr.is_terminal() {
            return Err(AudioError::Unavailable(format!(
                "no terminal to ring for {asset}"
            )));
        }
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| AudioError::Unavailable(e.to_string()))
    }
}

/// One line of the events file.
#[derive(Debug, Serialize, PartialEq)]
pub struct EventRecord {
    pub event: &'static str,
    pub at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
}

impl From<&IntroEvent> for EventRecord {
    fn from(event: &IntroEvent) -> Self {
        let mut record = EventRecord {
            event: event.kind.name(),
            at_ms: event.at.as_millis() as u64,
            source: None,
            reason: None,
            skipped: None,
        };
        match event.kind {
            IntroEventKind::Skipped { source } => record.source = Some(source.as_str()),
            IntroEventKind::Revealed { reason } => record.reason = Some(reason.as_str()),
            IntroEventKind::Completed { skipped } => record.skipped = Some(skipped),
            IntroEventKind::Shown | IntroEventKind::Restored => {}
        }
        record
    }
}

/// Appends each event to a file as one JSON object per line.
pub struct JsonlSink {
    writer: RefCell<BufWriter<File>>,
}

impl JsonlSink {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: RefCell::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for JsonlSink {
    fn record(&self, event: IntroEvent) {
        let mut writer = self.writer.borrow_mut();
        let result = serde_json::to_writer(&mut *writer, &EventRecord::from(&event))
            .map_err(io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write event line");
        }
    }
}

/// Forwards every event to each inner sink.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Fanout {
    #[must_use]
    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for Fanout {
    fn record(&self, event: IntroEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}

/// Outcome of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub history: Vec<OverlayState>,
    pub completed: bool,
    pub events: Vec<IntroEvent>,
    pub elapsed: Duration,
    /// Whether the skip flag is set once the session ends.
    pub flag_set: bool,
}

fn storage_for(opts: &Opts) -> Arc<dyn StorageBackend> {
    match &opts.state_file {
        Some(path) => Arc::new(FileStorage::new(path)),
        None => Arc::new(MemoryStorage::new()),
    }
}

fn config_for(opts: &Opts) -> OverlayConfig {
    let mut config = OverlayConfig::from_env();
    if let Some(locale) = opts.locale {
        config = config.with_locale(locale);
    }
    if opts.muted {
        config = config.with_start_muted(true);
    }
    if opts.persistence == SkipPersistence::OnAnyCompletion {
        config = config.with_skip_persistence(SkipPersistence::OnAnyCompletion);
    }
    config
}

/// Render one status line for a frame.
#[must_use]
pub fn frame_line(now: Duration, view: &OverlayView) -> String {
    const BAR: usize = 20;
    let filled = ((view.progress.clamp(0.0, 1.0) * BAR as f32).round() as usize).min(BAR);
    let bar: String = "#".repeat(filled) + &".".repeat(BAR - filled);
    let sun = view.pose(Layer::Accent);
    let text = view.pose(Layer::TextGroup);
    let hint = view.pose(Layer::ScrollHint);
    let status = if view.spinner_visible {
        "loading"
    } else {
        view.state.as_str()
    };
    format!(
        "[{:>7.3}s] {:<13} [{bar}] {:>3.0}%  {} bg({})  sun(scale {:.2} rot {:>7.1})  text(op {:.2} y {:>6.1})  hint(y {:>5.1} glow {:.2})",
        now.as_secs_f64(),
        status,
        view.progress * 100.0,
        view.theme,
        view.background_offset,
        sun.scale,
        sun.rotation,
        text.opacity,
        text.y,
        hint.y,
        hint.glow,
    )
}

/// Run one session, writing human-readable progress to `out`.
pub fn run(opts: &Opts, out: &mut dyn Write) -> io::Result<Report> {
    let storage = storage_for(opts);
    let config = config_for(opts);
    let flag = SkipFlag::new(Arc::clone(&storage), config.storage_key.clone());
    if opts.reset && flag.clear() {
        writeln!(out, "skip flag cleared")?;
    }

    let memory = MemorySink::new();
    let mut sink = Fanout::default().with(memory.clone()).with(TracingSink);
    if let Some(path) = &opts.events_jsonl {
        sink = sink.with(JsonlSink::open(path)?);
    }

    let motion = if opts.reduced_motion {
        MotionPreferenceDetector::new(Some(true))
    } else {
        MotionPreferenceDetector::from_env()
    };
    let completed = Rc::new(Cell::new(false));
    let done = Rc::clone(&completed);
    let overlay = IntroOverlay::builder()
        .viewport(ViewportDetector::new(opts.width, config.mobile_breakpoint))
        .config(config)
        .storage(storage)
        .audio(BellAudio)
        .event_sink(sink)
        .motion(motion)
        .on_complete(move || done.set(true))
        .build();

    let mut sim = OverlaySimulator::new(overlay);
    let wall = MonotonicClock::new();
    sim.mount();
    let strings = sim.overlay().view().strings;
    writeln!(out, "mounted: {} | skip: {}", strings.start, strings.skip)?;

    let mut skip_pending = opts.skip_at_ms.map(Duration::from_millis);
    let mut resize_pending = opts.resize_at.map(|(at, w)| (Duration::from_millis(at), w));
    let cta_delay = Duration::from_millis(opts.cta_after_ms);
    let print_every = Duration::from_millis(opts.print_every_ms);
    let mut next_print = Duration::ZERO;
    let mut shown_at: Option<Duration> = None;

    while sim.state() != OverlayState::Dismissed && sim.now() < SESSION_LIMIT {
        let now = sim.now();
        if let Some(at) = skip_pending
            && now >= at
        {
            skip_pending = None;
            writeln!(out, "escape pressed at {}ms", now.as_millis())?;
            sim.dispatch(KeyCode::Escape);
        }
        if let Some((at, width)) = resize_pending
            && now >= at
        {
            resize_pending = None;
            sim.dispatch(InputEvent::Resize { width });
        }
        if sim.state() == OverlayState::ContentShown {
            let since = *shown_at.get_or_insert(now);
            if now >= since + cta_delay {
                let view = sim.overlay().view();
                writeln!(out, "{}", view.announcement.unwrap_or_default())?;
                writeln!(out, "clicking \"{}\"", view.strings.start)?;
                sim.dispatch(Control::PrimaryCta);
                continue;
            }
        }

        if opts.realtime {
            let target = now + FRAME_INTERVAL;
            let elapsed = wall.now_mono();
            if target > elapsed {
                std::thread::sleep(target - elapsed);
            }
        }
        sim.step();

        if !print_every.is_zero() && sim.now() >= next_print {
            writeln!(out, "{}", frame_line(sim.now(), &sim.overlay().view()))?;
            next_print = sim.now() + print_every;
        }
    }

    let elapsed = sim.now();
    let mut overlay = sim.into_overlay();
    let history = overlay.history().to_vec();
    overlay.unmount();
    writeln!(
        out,
        "session ended after {}ms: {}",
        elapsed.as_millis(),
        history
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    )?;

    Ok(Report {
        history,
        completed: completed.get(),
        events: memory.events(),
        elapsed,
        flag_set: flag.read(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_core::Pose;
    use overture_runtime::{
        BackgroundOffset, Locale, RevealReason, SkipSource, Theme, ViewportClass,
    };

    fn quiet() -> Opts {
        Opts {
            print_every_ms: 0,
            ..Opts::default()
        }
    }

    #[test]
    fn record_fields_follow_kind() {
        let record = EventRecord::from(&IntroEvent {
            kind: IntroEventKind::Skipped {
                source: SkipSource::Button,
            },
            at: Duration::from_millis(42),
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "intro_skipped", "at_ms": 42, "source": "button"})
        );

        let revealed = EventRecord::from(&IntroEvent {
            kind: IntroEventKind::Revealed {
                reason: RevealReason::ReducedMotion,
            },
            at: Duration::ZERO,
        });
        assert_eq!(revealed.reason, Some("reduced_motion"));
        assert_eq!(revealed.source, None);
    }

    #[test]
    fn frame_line_shape() {
        let view = OverlayView {
            state: OverlayState::Animating,
            progress_visible: true,
            progress: 0.5,
            spinner_visible: false,
            body_visible: true,
            controls_enabled: false,
            layers: Layer::ALL.map(|l| (l, Pose::REST)),
            muted: false,
            mute_label: "Mute Sound",
            strings: Locale::En.strings(),
            announcement: None,
            focus: None,
            viewport: ViewportClass::Desktop,
            logo_size: 96,
            chevron_size: 32,
            locale: Locale::En,
            theme: Theme::Dark,
            background_offset: BackgroundOffset::CENTER,
        };
        let line = frame_line(Duration::from_millis(1250), &view);
        assert!(line.starts_with("[  1.250s] animating"), "{line}");
        assert!(line.contains("[##########..........]"), "{line}");
        assert!(line.contains(" 50%"), "{line}");
        assert!(line.contains("dark bg(50% 50%)"), "{line}");

        let first = OverlayView {
            spinner_visible: true,
            progress: 0.0,
            ..view
        };
        assert!(frame_line(Duration::ZERO, &first).contains("loading"));
    }

    #[test]
    fn natural_session_completes_after_cta() {
        let mut out = Vec::new();
        let report = run(&quiet(), &mut out).unwrap();
        assert!(report.completed);
        assert_eq!(
            report.history,
            vec![
                OverlayState::Loading,
                OverlayState::Animating,
                OverlayState::ContentShown,
                OverlayState::Dismissed
            ]
        );
        assert!(!report.flag_set);
        assert!(report.elapsed >= Duration::from_millis(6400 + 1500));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Start Your Journey"));
    }

    #[test]
    fn reduced_motion_session_skips_animation() {
        let opts = Opts {
            reduced_motion: true,
            cta_after_ms: 0,
            ..quiet()
        };
        let report = run(&opts, &mut io::sink()).unwrap();
        assert!(report.completed);
        assert!(!report.history.contains(&OverlayState::Animating));
    }
}
