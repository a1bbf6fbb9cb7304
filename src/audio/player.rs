use super::AudioCue;
use crate::error::Error;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::{
    io::Read,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::{debug, info, warn};

/// Decode a WAV stream into mono `f32` samples, keeping the first channel.
fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<Vec<f32>, Error> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels).max(1);
    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::DecodeCue)?,
        hound::SampleFormat::Int => {
            let full_scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / full_scale))
                .collect::<Result<Vec<_>, _>>()
                .map_err(Error::DecodeCue)?
        }
    };

    let mono: Vec<_> = interleaved.into_iter().step_by(channels).collect();
    if mono.is_empty() {
        return Err(Error::EmptyCue);
    }
    Ok(mono)
}

/// Nearest-neighbour resampling from `from` Hz to `to` Hz.
fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }
    let ratio = f64::from(from) / f64::from(to);
    let len = (samples.len() as f64 / ratio).round() as usize;
    (0..len)
        .map(|i| samples[((i as f64 * ratio) as usize).min(samples.len() - 1)])
        .collect()
}

/// Resample a decoded cue for the output device, rejecting cues too short to
/// leave a single device sample.
fn device_samples(samples: &[f32], wav_rate: u32, device_rate: u32) -> Result<Vec<f32>, Error> {
    let resampled = resample(samples, wav_rate, device_rate);
    if resampled.is_empty() {
        return Err(Error::EmptyCue);
    }
    Ok(resampled)
}

#[derive(Debug, Default)]
struct PlaybackState {
    playing: AtomicBool,
    position: AtomicUsize,
}

/// Thread-safe control over a looping cue; the stream itself stays with [`CuePlayer`].
#[derive(Debug, Clone)]
pub struct CueHandle {
    samples: Arc<[f32]>,
    state: Arc<PlaybackState>,
}

impl CueHandle {
    fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into(),
            state: Arc::new(PlaybackState::default()),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing.load(Ordering::SeqCst)
    }

    /// Write the next interleaved output frames, looping at the end of the cue.
    fn fill(&self, output: &mut [f32], channels: usize) {
        if !self.is_playing() || self.samples.is_empty() {
            output.iter_mut().for_each(|sample| *sample = 0.0);
            return;
        }

        let mut position = self.state.position.load(Ordering::SeqCst);
        for frame in output.chunks_mut(channels.max(1)) {
            let value = self.samples[position % self.samples.len()];
            frame.iter_mut().for_each(|sample| *sample = value);
            position = (position + 1) % self.samples.len();
        }
        self.state.position.store(position, Ordering::SeqCst);
    }
}

impl AudioCue for CueHandle {
    fn play(&mut self) -> Result<(), Error> {
        if !self.state.playing.swap(true, Ordering::SeqCst) {
            debug!(message = "audio cue started");
        }
        Ok(())
    }

    fn pause_and_rewind(&mut self) -> Result<(), Error> {
        if self.state.playing.swap(false, Ordering::SeqCst) {
            debug!(message = "audio cue stopped");
        }
        self.state.position.store(0, Ordering::SeqCst);
        Ok(())
    }
}

/// Owns the output stream playing a [`CueHandle`]. Not `Send`; keep it on the
/// thread that created it.
pub struct CuePlayer {
    _stream: cpal::Stream,
    handle: CueHandle,
}

impl CuePlayer {
    /// Decode the WAV file at `path` and open a paused stream on the default output device.
    pub fn open<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let reader =
            hound::WavReader::open(path).map_err(|e| Error::OpenCue(path.to_path_buf(), e))?;
        let wav_rate = reader.spec().sample_rate;
        let samples = decode(reader)?;

        let device = cpal::default_host()
            .default_output_device()
            .ok_or(Error::GetOutputDevice)?;
        let supported = device
            .default_output_config()
            .map_err(Error::GetOutputConfig)?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::UnsupportedSampleFormat(supported.sample_format()));
        }
        let config: cpal::StreamConfig = supported.into();
        let channels = usize::from(config.channels);

        let handle = CueHandle::new(device_samples(&samples, wav_rate, config.sample_rate.0)?);
        let stream_handle = handle.clone();
        let stream = device
            .build_output_stream(
                &config,
                move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    stream_handle.fill(output, channels)
                },
                |error| warn!(message = "audio output stream error", %error),
                None,
            )
            .map_err(Error::BuildOutputStream)?;
        stream.play().map_err(Error::PlayOutputStream)?;

        info!(
            message = "loaded audio cue",
            path = %path.display(),
            sample_rate = config.sample_rate.0,
            channels
        );

        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    pub fn handle(&self) -> CueHandle {
        self.handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav(spec: hound::WavSpec, samples: &[i16]) -> hound::WavReader<Cursor<Vec<u8>>> {
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut bytes, spec).unwrap();
            for &sample in samples {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        hound::WavReader::new(Cursor::new(bytes.into_inner())).unwrap()
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn keeps_first_channel() {
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate: 8000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let samples = decode(wav(spec, &[16384, 0, -16384, 0])).unwrap();
            assert_eq!(samples, vec![0.5, -0.5]);
        }

        #[test]
        fn empty_is_an_error() {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 8000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            assert!(matches!(decode(wav(spec, &[])), Err(Error::EmptyCue)));
        }
    }

    #[test]
    fn resample_changes_length() {
        let samples: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(resample(&samples, 22050, 44100).len(), 200);
        assert_eq!(resample(&samples, 48000, 48000), samples);
        assert_eq!(resample(&samples, 44100, 22050)[1], 2.0);
    }

    #[test]
    fn cue_shorter_than_one_device_sample_is_empty() {
        assert!(matches!(
            device_samples(&[0.5], 48000, 8000),
            Err(Error::EmptyCue)
        ));
        assert_eq!(device_samples(&[0.5, 0.25], 8000, 8000).unwrap(), vec![0.5, 0.25]);
    }

    mod playback_tests {
        use super::*;

        #[test]
        fn paused_cue_is_silent() {
            let handle = CueHandle::new(vec![1.0, 2.0]);
            let mut output = [9.0; 4];
            handle.fill(&mut output, 2);
            assert_eq!(output, [0.0; 4]);
        }

        #[test]
        fn playing_cue_loops_across_channels() {
            let mut handle = CueHandle::new(vec![1.0, 2.0, 3.0]);
            handle.play().unwrap();
            let mut output = [0.0; 8];
            handle.fill(&mut output, 2);
            assert_eq!(output, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 1.0, 1.0]);
        }

        #[test]
        fn empty_cue_plays_silence() {
            let mut handle = CueHandle::new(Vec::new());
            handle.play().unwrap();
            let mut output = [9.0; 4];
            handle.fill(&mut output, 2);
            assert_eq!(output, [0.0; 4]);
        }

        #[test]
        fn pause_and_rewind_restarts_from_the_top() {
            let mut handle = CueHandle::new(vec![1.0, 2.0, 3.0]);
            handle.play().unwrap();
            let mut output = [0.0; 2];
            handle.fill(&mut output, 1);
            handle.pause_and_rewind().unwrap();
            assert!(!handle.is_playing());

            handle.play().unwrap();
            handle.fill(&mut output, 1);
            assert_eq!(output, [1.0, 2.0]);
        }
    }
}
