//! Software sound mixer
//!
//! Four channels mixed into signed 16-bit interleaved stereo. The mixer is
//! shared between the game loop and the audio callback of the backend, so
//! all state sits behind one mutex and [`Mixer`] is cheap to clone.

use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::util::{read_le_u16, read_le_u32};

pub const MAX_CHANNELS: usize = 4;
pub const DEFAULT_SOUND_ID: i32 = -1;

pub const SFX_VOLUME: i32 = 256;

const FRAC_STEP_BITS: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MixerError {
    #[error("Not a RIFF/WAVE pcm file")]
    InvalidWav,

    #[error("Unhandled wav/pcm format compression {compression} channels {channels} rate {rate} bits {bits}")]
    UnsupportedFormat {
        compression: u16,
        channels: u16,
        rate: u32,
        bits: u16,
    },

    #[error("No free mixer channel")]
    NoFreeChannel,
}

/// `dst + sample * volume / 256`, saturated.
pub fn mix_sample(dst: &mut i16, sample: i32, volume: i32) {
    let pcm = *dst as i32 + ((sample * volume) >> 8);
    *dst = pcm.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
}

/// A sound source. `read` adds up to `dst.len() / 2` stereo frames into
/// `dst` and returns how many were produced, 0 once the source is drained.
pub trait MixerChannel: Send {
    fn read(&mut self, dst: &mut [i16]) -> usize;
}

/// PCM wav resampled with a fixed point step.
#[derive(Debug, Clone)]
pub struct WavChannel {
    buf: Vec<u8>,
    read_offset: usize,
    read_step: usize,
    bits_per_sample: u16,
    stereo: bool,
    volume: i32,
}

impl WavChannel {
    pub fn load(data: &[u8], output_rate: u32) -> Result<Self, MixerError> {
        if data.get(8..16) != Some(b"WAVEfmt ".as_slice()) {
            return Err(MixerError::InvalidWav);
        }
        let fmt_len = read_le_u32(data, 16).ok_or(MixerError::InvalidWav)? as usize;
        let compression = read_le_u16(data, 20).ok_or(MixerError::InvalidWav)?;
        let channels = read_le_u16(data, 22).ok_or(MixerError::InvalidWav)?;
        let rate = read_le_u32(data, 24).ok_or(MixerError::InvalidWav)?;
        let bits = read_le_u16(data, 34).ok_or(MixerError::InvalidWav)?;
        if compression != 1
            || !(channels == 1 || channels == 2)
            || !matches!(rate, 11025 | 22050 | 44100)
            || !(bits == 8 || bits == 16)
        {
            return Err(MixerError::UnsupportedFormat { compression, channels, rate, bits });
        }
        // the data chunk follows the fmt chunk
        let data_pos = 20 + fmt_len;
        if data.get(data_pos..data_pos + 4) != Some(b"data".as_slice()) {
            return Err(MixerError::InvalidWav);
        }
        let size = read_le_u32(data, data_pos + 4).ok_or(MixerError::InvalidWav)? as usize;
        let start = data_pos + 8;
        let end = (start + size).min(data.len());
        Ok(Self {
            buf: data.get(start..end).unwrap_or(&[]).to_vec(),
            read_offset: 0,
            read_step: ((rate as usize) << FRAC_STEP_BITS) / output_rate.max(1) as usize,
            bits_per_sample: bits,
            stereo: channels == 2,
            volume: SFX_VOLUME,
        })
    }

    fn read_sample(&mut self) -> Option<i32> {
        let index = self.read_offset >> FRAC_STEP_BITS;
        let sample = match self.bits_per_sample {
            8 => ((*self.buf.get(index)? as u16) << 8 ^ 0x8000) as i16,
            _ => read_le_u16(&self.buf, index * 2)? as i16,
        };
        self.read_offset += self.read_step;
        Some(sample as i32)
    }
}

impl MixerChannel for WavChannel {
    fn read(&mut self, dst: &mut [i16]) -> usize {
        let frames = dst.len() / 2;
        for i in 0..frames {
            let Some(left) = self.read_sample() else {
                return i;
            };
            let right = if self.stereo {
                match self.read_sample() {
                    Some(s) => s,
                    None => return i,
                }
            } else {
                left
            };
            mix_sample(&mut dst[i * 2], left, self.volume);
            mix_sample(&mut dst[i * 2 + 1], right, self.volume);
        }
        frames
    }
}

struct Channel {
    id: i32,
    source: Box<dyn MixerChannel>,
}

struct MixerState {
    output_rate: u32,
    channels: [Option<Channel>; MAX_CHANNELS],
    id_seed: i32,
    sound_volume: i32,
    /// Replaces channel mixing while set (cutscene audio).
    stream: Option<Box<dyn MixerChannel>>,
}

impl MixerState {
    fn generate_sound_id(&mut self, channel: usize) -> i32 {
        self.id_seed = (self.id_seed + 1) & 0xFFFF;
        (self.id_seed << 4) | channel as i32
    }

    fn channel_of(&self, id: i32) -> Option<&Channel> {
        self.channels.get((id & 15) as usize)?.as_ref().filter(|c| c.id == id)
    }
}

#[derive(Clone)]
pub struct Mixer {
    state: Arc<Mutex<MixerState>>,
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer").field("output_rate", &self.output_rate()).finish()
    }
}

impl Mixer {
    pub fn new(output_rate: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(MixerState {
                output_rate,
                channels: Default::default(),
                id_seed: 0,
                sound_volume: SFX_VOLUME,
                stream: None,
            })),
        }
    }

    // a panic while mixing cannot leave the tables half updated
    fn lock(&self) -> MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn output_rate(&self) -> u32 {
        self.lock().output_rate
    }

    /// Starts a source on the first free channel and returns its id.
    pub fn start_channel(&self, source: Box<dyn MixerChannel>) -> Result<i32, MixerError> {
        let mut state = self.lock();
        let Some(channel) = state.channels.iter().position(|c| c.is_none()) else {
            tracing::warn!(target: "bermuda::mixer", "no free channel");
            return Err(MixerError::NoFreeChannel);
        };
        let id = state.generate_sound_id(channel);
        state.channels[channel] = Some(Channel { id, source });
        tracing::debug!(target: "bermuda::mixer", id = format_args!("0x{:X}", id), channel, "sound started");
        Ok(id)
    }

    /// Volume of the effects started afterwards, 256 is unity.
    pub fn set_sound_volume(&self, volume: i32) {
        self.lock().sound_volume = volume.clamp(0, 256);
    }

    /// Plays a wav file held in memory.
    pub fn play_sound(&self, wav: &[u8]) -> Result<i32, MixerError> {
        let (rate, volume) = {
            let state = self.lock();
            (state.output_rate, state.sound_volume)
        };
        let mut channel = WavChannel::load(wav, rate)?;
        channel.volume = volume;
        self.start_channel(Box::new(channel))
    }

    pub fn is_sound_playing(&self, id: i32) -> bool {
        if id == DEFAULT_SOUND_ID {
            return false;
        }
        self.lock().channel_of(id).is_some()
    }

    pub fn stop_sound(&self, id: i32) {
        if id == DEFAULT_SOUND_ID {
            return;
        }
        tracing::debug!(target: "bermuda::mixer", id = format_args!("0x{:X}", id), "stop sound");
        let mut state = self.lock();
        let channel = (id & 15) as usize;
        if state.channel_of(id).is_some() {
            state.channels[channel] = None;
        }
    }

    pub fn stop_all(&self) {
        tracing::debug!(target: "bermuda::mixer", "stop all");
        let mut state = self.lock();
        for channel in state.channels.iter_mut() {
            *channel = None;
        }
    }

    /// Routes all output to `stream` until cleared with `None`.
    pub fn set_stream(&self, stream: Option<Box<dyn MixerChannel>>) {
        self.lock().stream = stream;
    }

    /// Fills `buf` (interleaved stereo). Drained channels are released.
    pub fn mix(&self, buf: &mut [i16]) {
        buf.fill(0);
        let mut state = self.lock();
        if let Some(stream) = state.stream.as_mut() {
            stream.read(buf);
            return;
        }
        for slot in state.channels.iter_mut() {
            if let Some(channel) = slot {
                if channel.source.read(buf) == 0 {
                    *slot = None;
                }
            }
        }
    }
}

/// Builds a canonical 44 byte header wav, used by tests and tools.
pub fn make_wav(channels: u16, rate: u32, bits: u16, samples: &[u8]) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut out = Vec::with_capacity(44 + samples.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&rate.to_le_bytes());
    out.extend_from_slice(&(rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    out.extend_from_slice(samples);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_sample_clamps() {
        let mut v = 32000i16;
        mix_sample(&mut v, 2000, 256);
        assert_eq!(v, i16::MAX);
        let mut v = -32000i16;
        mix_sample(&mut v, -2000, 256);
        assert_eq!(v, i16::MIN);
        let mut v = 0i16;
        mix_sample(&mut v, 1000, 128);
        assert_eq!(v, 500);
    }

    #[test]
    fn test_wav_8bit_samples() {
        let wav = make_wav(1, 22050, 8, &[0x80, 0xFF, 0x00]);
        let mut ch = WavChannel::load(&wav, 22050).unwrap();
        let mut buf = [0i16; 8];
        assert_eq!(ch.read(&mut buf), 3);
        assert_eq!(&buf[..6], &[0, 0, 0x7F00, 0x7F00, -0x8000, -0x8000]);
    }

    #[test]
    fn test_wav_resampling_step() {
        // 11025 Hz played at 22050 Hz repeats every sample
        let wav = make_wav(1, 11025, 8, &[0x90, 0xA0]);
        let mut ch = WavChannel::load(&wav, 22050).unwrap();
        let mut buf = [0i16; 10];
        assert_eq!(ch.read(&mut buf), 4);
        assert_eq!(buf[0], buf[2]);
        assert_eq!(buf[4], buf[6]);
        assert_ne!(buf[0], buf[4]);
    }

    #[test]
    fn test_wav_rejects_unsupported() {
        let wav = make_wav(1, 8000, 8, &[0]);
        assert!(matches!(
            WavChannel::load(&wav, 22050),
            Err(MixerError::UnsupportedFormat { rate: 8000, .. })
        ));
        assert_eq!(WavChannel::load(b"RIFF", 22050).unwrap_err(), MixerError::InvalidWav);
    }

    #[test]
    fn test_sound_ids_and_lifetime() {
        let mixer = Mixer::new(22050);
        let wav = make_wav(1, 22050, 8, &[0x80; 4]);
        let id = mixer.play_sound(&wav).unwrap();
        assert_eq!(id & 15, 0);
        assert!(mixer.is_sound_playing(id));
        assert!(!mixer.is_sound_playing(DEFAULT_SOUND_ID));

        let id2 = mixer.play_sound(&wav).unwrap();
        assert_eq!(id2 & 15, 1);
        mixer.stop_sound(id2);
        assert!(!mixer.is_sound_playing(id2));

        // 4 frames are consumed by the first mix, released by the second
        let mut buf = [0i16; 16];
        mixer.mix(&mut buf);
        assert!(mixer.is_sound_playing(id));
        mixer.mix(&mut buf);
        assert!(!mixer.is_sound_playing(id));
    }

    #[test]
    fn test_sound_volume() {
        let mixer = Mixer::new(22050);
        mixer.set_sound_volume(128);
        let wav = make_wav(1, 22050, 8, &[0xC0]);
        mixer.play_sound(&wav).unwrap();
        let mut buf = [0i16; 2];
        mixer.mix(&mut buf);
        assert_eq!(buf, [0x2000, 0x2000]);
    }

    #[test]
    fn test_channels_exhausted() {
        let mixer = Mixer::new(22050);
        let wav = make_wav(1, 22050, 8, &[0x80; 4]);
        for _ in 0..MAX_CHANNELS {
            mixer.play_sound(&wav).unwrap();
        }
        assert_eq!(mixer.play_sound(&wav).unwrap_err(), MixerError::NoFreeChannel);
        mixer.stop_all();
        assert!(mixer.play_sound(&wav).is_ok());
    }
}
