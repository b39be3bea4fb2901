//! Per-instrument additive voices.
//!
//! Each generator produces one note's samples at unit amplitude; velocity and
//! headroom scaling happen at mix time. Percussion draws its noise from a
//! caller-provided seeded RNG so rendering stays reproducible.

use std::f64::consts::TAU;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::event::{CH_BASS, CH_DRUM, CH_GUITAR, CH_PIANO};

/// MIDI pitch to frequency in Hz, A4 = 440.
pub fn pitch_to_frequency(pitch: i32) -> f64 {
    440.0 * 2f64.powf((pitch - 69) as f64 / 12.0)
}

/// Generate one note's samples for the given channel.
pub fn generate(
    channel: u8,
    pitch: i32,
    n_samples: usize,
    sample_rate: u32,
    rng: &mut ChaCha8Rng,
) -> Vec<f32> {
    let frequency = pitch_to_frequency(pitch);
    if channel == CH_DRUM {
        return match pitch {
            36 => kick(frequency, n_samples, sample_rate),
            38 => snare(frequency, n_samples, sample_rate, rng),
            _ => percussion(frequency, n_samples, sample_rate, rng),
        };
    }
    match channel {
        CH_PIANO => piano(frequency, n_samples, sample_rate),
        CH_GUITAR => guitar(frequency, n_samples, sample_rate),
        CH_BASS => bass(frequency, n_samples, sample_rate),
        _ => plain(frequency, n_samples, sample_rate),
    }
}

/// Low fundamental plus a half-frequency sine, fast exponential decay.
fn kick(frequency: f64, n_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sr = f64::from(sample_rate);
    let len = n_samples.max(1) as f64;
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sr;
            let envelope = (-5.0 * i as f64 / len).exp();
            let wave = (TAU * frequency * t).sin() + 0.5 * (TAU * frequency * 0.5 * t).sin();
            (wave * envelope) as f32
        })
        .collect()
}

/// Half tone, half uniform noise, faster decay than the kick.
fn snare(frequency: f64, n_samples: usize, sample_rate: u32, rng: &mut ChaCha8Rng) -> Vec<f32> {
    let sr = f64::from(sample_rate);
    let len = n_samples.max(1) as f64;
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sr;
            let envelope = (-8.0 * i as f64 / len).exp();
            let wave = 0.5 * (TAU * frequency * t).sin() + rng.gen_range(-0.5..0.5);
            (wave * envelope) as f32
        })
        .collect()
}

/// Hi-hats, ride, crash: mostly noise with a short tonal component and the
/// fastest decay.
fn percussion(
    frequency: f64,
    n_samples: usize,
    sample_rate: u32,
    rng: &mut ChaCha8Rng,
) -> Vec<f32> {
    let sr = f64::from(sample_rate);
    let len = n_samples.max(1) as f64;
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sr;
            let envelope = (-10.0 * i as f64 / len).exp();
            let wave = 0.3 * (TAU * frequency * t).sin() + rng.gen_range(-0.7..0.7);
            (wave * envelope) as f32
        })
        .collect()
}

/// Fundamental plus two harmonics, short linear attack, exponential tail.
fn piano(frequency: f64, n_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sr = f64::from(sample_rate);
    let len = n_samples.max(1) as f64;
    let attack_samples = (len * 0.01).max(1.0);
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sr;
            let attack = (i as f64 / attack_samples).min(1.0);
            let decay = (-3.0 * i as f64 / len).exp();
            let wave = (TAU * frequency * t).sin()
                + 0.5 * (TAU * frequency * 2.0 * t).sin()
                + 0.3 * (TAU * frequency * 3.0 * t).sin();
            (wave * attack * decay) as f32
        })
        .collect()
}

/// Two harmonics through a soft clip, then decay to a held sustain.
fn guitar(frequency: f64, n_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sr = f64::from(sample_rate);
    let len = n_samples.max(1) as f64;
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sr;
            let pos = i as f64 / len;
            let envelope = two_stage_envelope(pos, 0.005, 0.7, 0.5);
            let wave = (TAU * frequency * t).sin()
                + 0.5 * (TAU * frequency * 2.0 * t).sin()
                + 0.2 * (TAU * frequency * 3.0 * t).sin();
            ((1.5 * wave).tanh() * envelope) as f32
        })
        .collect()
}

/// One harmonic, lighter clip, slower attack, higher sustain.
fn bass(frequency: f64, n_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sr = f64::from(sample_rate);
    let len = n_samples.max(1) as f64;
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sr;
            let pos = i as f64 / len;
            let envelope = two_stage_envelope(pos, 0.01, 0.8, 0.6);
            let wave = (TAU * frequency * t).sin() + 0.3 * (TAU * frequency * 2.0 * t).sin();
            ((1.2 * wave).tanh() * envelope) as f32
        })
        .collect()
}

/// Fallback for unclassified channels: plain sine with an exponential decay.
fn plain(frequency: f64, n_samples: usize, sample_rate: u32) -> Vec<f32> {
    let sr = f64::from(sample_rate);
    let len = n_samples.max(1) as f64;
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sr;
            let envelope = (-3.0 * i as f64 / len).exp();
            ((TAU * frequency * t).sin() * envelope) as f32
        })
        .collect()
}

/// Attack to 1.0 over `attack` of the note, decay to `decay_to` over the
/// first 10%, then drift toward `sustain_to` across the remainder.
fn two_stage_envelope(pos: f64, attack: f64, decay_to: f64, sustain_to: f64) -> f64 {
    const DECAY_END: f64 = 0.10;
    if pos < attack {
        pos / attack
    } else if pos < DECAY_END {
        1.0 - (1.0 - decay_to) * (pos - attack) / (DECAY_END - attack)
    } else {
        decay_to - (decay_to - sustain_to) * (pos - DECAY_END) / (1.0 - DECAY_END)
    }
}
