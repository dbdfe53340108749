#![forbid(unsafe_code)]

//! One-shot audio cue played when the intro starts.

use std::fmt;

/// Asset played when none is configured.
pub const DEFAULT_CHIME: &str = "/chime.mp3";

/// Volume used when none is configured.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Why a cue did not play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// The platform refused playback without a prior user gesture.
    AutoplayBlocked,
    /// No output device, missing asset, decoder failure.
    Unavailable(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::AutoplayBlocked => write!(f, "autoplay blocked"),
            AudioError::Unavailable(why) => write!(f, "audio unavailable: {why}"),
        }
    }
}

impl std::error::Error for AudioError {}

/// Something that can play a short sound.
pub trait AudioCue {
    /// Start playing `asset` at `volume` (0.0 to 1.0). Must not block.
    fn play(&self, asset: &str, volume: f32) -> Result<(), AudioError>;
}

/// Plays nothing, always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioCue for SilentAudio {
    fn play(&self, _asset: &str, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}
