use crate::error::Error;
use tracing::debug;

#[cfg(feature = "audio")]
mod player;
#[cfg(feature = "audio")]
pub use player::{CueHandle, CuePlayer};

/// A looping audio cue that plays while a pose is held.
pub trait AudioCue {
    fn play(&mut self) -> Result<(), Error>;

    /// Stop playback and rewind to the start of the cue.
    fn pause_and_rewind(&mut self) -> Result<(), Error>;
}

impl<T: AudioCue + ?Sized> AudioCue for Box<T> {
    fn play(&mut self) -> Result<(), Error> {
        (**self).play()
    }

    fn pause_and_rewind(&mut self) -> Result<(), Error> {
        (**self).pause_and_rewind()
    }
}

/// Cue used when no output device or cue file is configured.
#[derive(Debug, Default)]
pub struct SilentCue {
    playing: bool,
}

impl AudioCue for SilentCue {
    fn play(&mut self) -> Result<(), Error> {
        if !self.playing {
            debug!(message = "audio cue started");
            self.playing = true;
        }
        Ok(())
    }

    fn pause_and_rewind(&mut self) -> Result<(), Error> {
        if self.playing {
            debug!(message = "audio cue stopped");
            self.playing = false;
        }
        Ok(())
    }
}
