//! Audio collaborators: the sink that sounds notes and the decoder that turns
//! uploaded bytes into a playable buffer.

use serde::Serialize;

use crate::{gain, Result, TranscriberError};

/// Request for the sink to sound one note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteOn {
    /// Index of the note in the loaded timeline.
    pub index: usize,
    pub pitch: String,
    pub duration: f64,
}

/// Output device driven by the playback clock. The sink owns actual sound
/// generation; the clock only tells it what to do and when.
pub trait AudioSink {
    /// Whether decoded audio is loaded and playback may start.
    fn is_ready(&self) -> bool;
    /// Replaces the backing track. A sink becomes ready once it holds one.
    fn load_buffer(&mut self, audio: &DecodedAudio);
    /// Starts (or restarts) the backing track at `offset` seconds.
    fn start(&mut self, offset: f64) -> Result<()>;
    fn stop(&mut self);
    fn note_on(&mut self, note: &NoteOn) -> Result<()>;
    /// `f64::NEG_INFINITY` means mute.
    fn set_gain_db(&mut self, gain_db: f64);
}

/// Everything a [`RecordingSink`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SinkCall {
    Load { frames: usize, sample_rate: u32 },
    Start(f64),
    Stop,
    NoteOn(NoteOn),
    Gain(f64),
}

/// Sink that remembers every call instead of producing sound. Useful for
/// headless hosts and for asserting on playback behaviour.
#[derive(Debug, Default)]
pub struct RecordingSink {
    ready: bool,
    fail_note_on: bool,
    calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Makes every subsequent `note_on` fail, simulating a device error.
    pub fn fail_note_on(&mut self, fail: bool) {
        self.fail_note_on = fail;
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    pub fn notes(&self) -> Vec<&NoteOn> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::NoteOn(note) => Some(note),
                _ => None,
            })
            .collect()
    }

    pub fn is_muted(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|call| match call {
                SinkCall::Gain(db) => Some(gain::is_mute(*db)),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl AudioSink for RecordingSink {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn load_buffer(&mut self, audio: &DecodedAudio) {
        self.ready = true;
        self.calls.push(SinkCall::Load {
            frames: audio.frames(),
            sample_rate: audio.sample_rate,
        });
    }

    fn start(&mut self, offset: f64) -> Result<()> {
        self.calls.push(SinkCall::Start(offset));
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.push(SinkCall::Stop);
    }

    fn note_on(&mut self, note: &NoteOn) -> Result<()> {
        if self.fail_note_on {
            return Err(TranscriberError::Playback(format!(
                "device rejected note {}",
                note.pitch
            )));
        }
        self.calls.push(SinkCall::NoteOn(note.clone()));
        Ok(())
    }

    fn set_gain_db(&mut self, gain_db: f64) {
        self.calls.push(SinkCall::Gain(gain_db));
    }
}

/// Interleaved PCM samples normalised to `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

pub trait AudioDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio>;
}

/// Decoder for RIFF/WAVE files carrying 16-bit integer PCM.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

const PCM_FORMAT: u16 = 1;

impl AudioDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(TranscriberError::decode("missing RIFF/WAVE header"));
        }

        let mut format: Option<(u16, u16, u32, u16)> = None;
        let mut data: Option<&[u8]> = None;
        let mut cursor = 12;

        while cursor + 8 <= bytes.len() {
            let id = &bytes[cursor..cursor + 4];
            let size = read_u32(bytes, cursor + 4)? as usize;
            let body_start = cursor + 8;
            let body_end = body_start
                .checked_add(size)
                .filter(|end| *end <= bytes.len())
                .ok_or_else(|| TranscriberError::decode("chunk runs past end of file"))?;
            let body = &bytes[body_start..body_end];

            match id {
                b"fmt " => {
                    if body.len() < 16 {
                        return Err(TranscriberError::decode("fmt chunk too short"));
                    }
                    format = Some((
                        read_u16(body, 0)?,
                        read_u16(body, 2)?,
                        read_u32(body, 4)?,
                        read_u16(body, 14)?,
                    ));
                }
                b"data" => data = Some(body),
                _ => {}
            }

            // Chunks are padded to an even length.
            cursor = body_end + (size & 1);
        }

        let (audio_format, channels, sample_rate, bits) =
            format.ok_or_else(|| TranscriberError::decode("missing fmt chunk"))?;
        let data = data.ok_or_else(|| TranscriberError::decode("missing data chunk"))?;

        if audio_format != PCM_FORMAT || bits != 16 {
            return Err(TranscriberError::decode(format!(
                "unsupported encoding (format {audio_format}, {bits} bits)"
            )));
        }
        if channels == 0 || sample_rate == 0 {
            return Err(TranscriberError::decode("zero channels or sample rate"));
        }

        let samples = data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / -(i16::MIN as f32))
            .collect();

        Ok(DecodedAudio {
            sample_rate,
            channels,
            samples,
        })
    }
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| TranscriberError::decode("truncated header"))
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| TranscriberError::decode("truncated header"))
}

/// Builds a mono 16-bit PCM WAV image in memory.
pub fn encode_wav_16bit(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = channels * (bits_per_sample / 8);
    let data_size = samples.len() as u32 * 2;

    let mut out = Vec::with_capacity(44 + data_size as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}
