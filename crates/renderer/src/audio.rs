//! Audio as a texture input.
//!
//! The pipeline only sees an [`AudioBinding`]; this module produces one from
//! either a synthetic signal or sample windows pushed by a capture thread.
//! Row 0 of the 512×2 `R32F` texture holds the waveform normalised to
//! `[-1, 1]`. Row 1 is reserved for spectra and stays zero.

use std::collections::VecDeque;
use std::f64::consts::TAU;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use preset::FilterMode;

use crate::error::ResourceError;
use crate::gpu::{GraphicsBackend, TextureDesc, TextureFormat};
use crate::types::AudioBinding;

/// Samples per uploaded window.
pub const AUDIO_WINDOW: usize = 512;
pub const AUDIO_TEXTURE_WIDTH: u32 = AUDIO_WINDOW as u32;
pub const AUDIO_TEXTURE_HEIGHT: u32 = 2;

const NORMALIZATION: f32 = 32768.0;
const SAMPLE_RATE: f64 = 44_100.0;
const PHASE_WRAP: f64 = 1000.0;

/// Deterministic test signal spread across the spectrum with slow envelopes.
#[derive(Debug, Clone, Default)]
pub struct SyntheticGenerator {
    /// Seconds, wrapped to keep `sin` arguments small.
    phase: f64,
}

/// `(frequency, amplitude, envelope base, envelope rate)` per band.
const BANDS: [(f64, f64, f64, f64); 6] = [
    (50.0, 0.15, 0.7, 0.3),
    (120.0, 0.25, 0.6, 0.7),
    (300.0, 0.2, 0.5, 1.1),
    (800.0, 0.15, 0.4, 1.7),
    (3000.0, 0.12, 0.3, 2.3),
    (7000.0, 0.08, 0.2, 3.1),
];

const HARMONICS: [(f64, f64); 3] = [(150.0, 0.05), (250.0, 0.04), (450.0, 0.03)];

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&mut self, out: &mut [i16]) {
        for sample in out {
            *sample = self.next_sample();
        }
    }

    fn next_sample(&mut self) -> i16 {
        let t = self.phase;
        let wave = |freq: f64| (TAU * freq * t).sin();

        let bands: f64 = BANDS
            .iter()
            .map(|&(freq, amp, base, rate)| amp * wave(freq) * (base + (1.0 - base) * wave(rate)))
            .sum();
        let harmonics: f64 = HARMONICS.iter().map(|&(freq, amp)| amp * wave(freq)).sum();

        let envelope = (0.3 + 0.7 * wave(0.4)) * (0.5 + 0.5 * wave(0.9));
        let sample = soft_clip(((bands + harmonics) * envelope) as f32);

        self.phase += 1.0 / SAMPLE_RATE;
        if self.phase > PHASE_WRAP {
            self.phase -= PHASE_WRAP;
        }
        (sample * NORMALIZATION * 0.75) as i16
    }
}

fn soft_clip(sample: f32) -> f32 {
    if sample > 0.8 {
        0.8 + (sample - 0.8) * 0.2
    } else if sample < -0.8 {
        -0.8 + (sample + 0.8) * 0.2
    } else {
        sample
    }
}

/// Receiving end of a capture thread's sample stream.
///
/// Keeps the most recent [`AUDIO_WINDOW`] samples; older ones fall off.
#[derive(Debug)]
pub struct LiveCapture {
    receiver: Receiver<Vec<i16>>,
    recent: VecDeque<i16>,
    disconnected: bool,
}

impl LiveCapture {
    /// Creates a bounded channel. The capture thread should `try_send` so a
    /// stalled renderer never blocks it.
    pub fn channel(capacity: usize) -> (Sender<Vec<i16>>, Self) {
        let (sender, receiver) = bounded(capacity.max(1));
        let capture = Self {
            receiver,
            recent: VecDeque::with_capacity(AUDIO_WINDOW),
            disconnected: false,
        };
        (sender, capture)
    }

    /// Drains pending chunks and returns the latest window, left-padded with
    /// silence while fewer than [`AUDIO_WINDOW`] samples have arrived.
    pub fn read_window(&mut self) -> [i16; AUDIO_WINDOW] {
        loop {
            match self.receiver.try_recv() {
                Ok(chunk) => {
                    let keep = chunk.len().min(AUDIO_WINDOW);
                    self.recent.extend(&chunk[chunk.len() - keep..]);
                    let excess = self.recent.len().saturating_sub(AUDIO_WINDOW);
                    self.recent.drain(..excess);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        tracing::warn!("audio capture thread disconnected");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }

        let mut window = [0i16; AUDIO_WINDOW];
        let pad = AUDIO_WINDOW - self.recent.len();
        for (slot, sample) in window[pad..].iter_mut().zip(&self.recent) {
            *slot = *sample;
        }
        window
    }
}

/// Where audio samples come from.
#[derive(Debug, Default)]
pub enum AudioSource {
    #[default]
    Disabled,
    Synthetic(SyntheticGenerator),
    Live(LiveCapture),
}

impl AudioSource {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AudioSource::Disabled)
    }

    /// The most recent sample window, or `None` when disabled.
    pub fn read_window(&mut self) -> Option<[i16; AUDIO_WINDOW]> {
        match self {
            AudioSource::Disabled => None,
            AudioSource::Synthetic(generator) => {
                let mut window = [0i16; AUDIO_WINDOW];
                generator.fill(&mut window);
                Some(window)
            }
            AudioSource::Live(capture) => Some(capture.read_window()),
        }
    }
}

/// GPU texture the `sound` sampler reads.
#[derive(Debug)]
pub struct AudioTexture<B: GraphicsBackend> {
    texture: B::Texture,
    ready: bool,
    pixels: Vec<f32>,
}

impl<B: GraphicsBackend> AudioTexture<B> {
    const DESC: TextureDesc = TextureDesc {
        width: AUDIO_TEXTURE_WIDTH,
        height: AUDIO_TEXTURE_HEIGHT,
        format: TextureFormat::R32Float,
        filter: FilterMode::Linear,
    };

    pub fn new(gpu: &mut B) -> Result<Self, ResourceError> {
        let pixels = vec![0.0f32; AUDIO_WINDOW * AUDIO_TEXTURE_HEIGHT as usize];
        let texture = gpu.create_texture(&Self::DESC, Some(bytemuck::cast_slice(&pixels)))?;
        Ok(Self {
            texture,
            ready: false,
            pixels,
        })
    }

    /// Uploads the source's latest window. Disabled sources leave the
    /// texture untouched and unbound.
    pub fn update(&mut self, gpu: &mut B, source: &mut AudioSource) {
        let Some(window) = source.read_window() else {
            return;
        };
        for (texel, sample) in self.pixels[..AUDIO_WINDOW].iter_mut().zip(window) {
            *texel = f32::from(sample) / NORMALIZATION;
        }
        gpu.update_texture(self.texture, &Self::DESC, bytemuck::cast_slice(&self.pixels));
        if !self.ready {
            tracing::debug!("audio texture ready");
            self.ready = true;
        }
    }

    pub fn binding(&self) -> AudioBinding<B::Texture> {
        AudioBinding {
            texture: Some(self.texture),
            width: AUDIO_TEXTURE_WIDTH,
            height: AUDIO_TEXTURE_HEIGHT,
            enabled: self.ready,
        }
    }

    pub fn dispose(self, gpu: &mut B) {
        gpu.delete_texture(self.texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::{Call, MockBackend};

    #[test]
    fn synthetic_signal_is_deterministic_and_bounded() {
        let mut a = SyntheticGenerator::new();
        let mut b = SyntheticGenerator::new();
        let mut first = [0i16; 2048];
        let mut second = [0i16; 2048];
        a.fill(&mut first);
        b.fill(&mut second);
        assert_eq!(first, second);
        assert_eq!(first[0], 0);
        assert!(first.iter().any(|s| *s != 0));
        let ceiling = (NORMALIZATION * 0.75) as i32;
        assert!(first.iter().all(|s| i32::from(*s).abs() <= ceiling));
    }

    #[test]
    fn soft_clip_compresses_peaks() {
        assert_eq!(soft_clip(0.5), 0.5);
        assert!((soft_clip(1.3) - 0.9).abs() < 1e-6);
        assert!((soft_clip(-1.3) + 0.9).abs() < 1e-6);
    }

    #[test]
    fn phase_wraps() {
        let mut generator = SyntheticGenerator { phase: PHASE_WRAP };
        generator.next_sample();
        assert!(generator.phase < 0.001);
    }

    #[test]
    fn live_capture_pads_short_windows() {
        let (sender, mut capture) = LiveCapture::channel(4);
        sender.send(vec![1, 2, 3]).unwrap();
        let window = capture.read_window();
        assert!(window[..AUDIO_WINDOW - 3].iter().all(|s| *s == 0));
        assert_eq!(&window[AUDIO_WINDOW - 3..], &[1, 2, 3]);
    }

    #[test]
    fn live_capture_keeps_most_recent_samples() {
        let (sender, mut capture) = LiveCapture::channel(4);
        sender.send((0..400).collect()).unwrap();
        sender.send((400..700).collect()).unwrap();
        let window = capture.read_window();
        assert_eq!(window[0], 188);
        assert_eq!(window[AUDIO_WINDOW - 1], 699);

        drop(sender);
        let again = capture.read_window();
        assert_eq!(again, window);
    }

    #[test]
    fn disabled_source_never_binds() {
        let mut gpu = MockBackend::new();
        let mut texture = AudioTexture::new(&mut gpu).unwrap();
        let mut source = AudioSource::Disabled;
        texture.update(&mut gpu, &mut source);

        let binding = texture.binding();
        assert!(!binding.enabled);
        assert_eq!((binding.width, binding.height), (512, 2));
        assert_eq!(gpu.count(|call| matches!(call, Call::UpdateTexture { .. })), 0);
        texture.dispose(&mut gpu);
        assert_eq!(gpu.live_resources(), 0);
    }

    #[test]
    fn update_writes_normalised_waveform_row() {
        let mut gpu = MockBackend::new();
        let mut texture = AudioTexture::new(&mut gpu).unwrap();
        let (sender, capture) = LiveCapture::channel(1);
        sender.send(vec![16384, -32768]).unwrap();
        let mut source = AudioSource::Live(capture);
        texture.update(&mut gpu, &mut source);

        assert!(texture.binding().enabled);
        let pixels = gpu
            .calls
            .iter()
            .find_map(|call| match call {
                Call::UpdateTexture { pixels, .. } => Some(pixels.clone()),
                _ => None,
            })
            .unwrap();
        let floats: Vec<f32> = pixels
            .chunks_exact(4)
            .map(|bytes| f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();
        assert_eq!(floats.len(), 1024);
        assert_eq!(floats[510], 0.5);
        assert_eq!(floats[511], -1.0);
        assert!(floats[512..].iter().all(|v| *v == 0.0));
    }
}
