//! Injectable Jitter
//!
//! Scoring adds a bounded random perturbation to each probability. The
//! randomness comes from a [`JitterSource`] so production runs can draw from
//! OS entropy while tests stay reproducible.
//!
//! [`SeededJitter`] derives an independent ChaCha20 stream per scoring key
//! (city, disease, date) from a 32-byte seed. A key always receives the same
//! draw, whatever order pairs are scored in and on whichever thread.

use crate::model::{CityId, DiseaseId};
use chrono::{Datelike, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A 32-byte seed for reproducible jitter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed(pub [u8; 32]);

impl Seed {
    /// Create a seed from a string (hashed to 32 bytes)
    pub fn from_string(s: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(s.as_bytes());
        Seed(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Seed(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for Seed {
    fn default() -> Self {
        Seed([0u8; 32])
    }
}

/// Identifies one scoring call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    pub city_id: CityId,
    pub disease_id: DiseaseId,
    pub as_of: NaiveDate,
}

/// Source of jitter draws
pub trait JitterSource: Send + Sync {
    /// A value in [-1, 1], scaled by the configured jitter fraction
    fn draw(&self, key: &ScoreKey) -> f64;
}

impl<J: JitterSource + ?Sized> JitterSource for Box<J> {
    fn draw(&self, key: &ScoreKey) -> f64 {
        (**self).draw(key)
    }
}

impl<J: JitterSource + ?Sized> JitterSource for &J {
    fn draw(&self, key: &ScoreKey) -> f64 {
        (**self).draw(key)
    }
}

/// Reproducible jitter keyed by seed and score key
#[derive(Clone, Copy, Debug, Default)]
pub struct SeededJitter {
    seed: Seed,
}

impl SeededJitter {
    pub fn new(seed: Seed) -> Self {
        SeededJitter { seed }
    }

    fn stream_seed(&self, key: &ScoreKey) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        hasher.update(key.city_id.0.to_le_bytes());
        hasher.update(key.disease_id.0.to_le_bytes());
        hasher.update(key.as_of.num_days_from_ce().to_le_bytes());
        hasher.finalize().into()
    }
}

impl JitterSource for SeededJitter {
    fn draw(&self, key: &ScoreKey) -> f64 {
        let mut rng = ChaCha20Rng::from_seed(self.stream_seed(key));
        rng.gen_range(-1.0..=1.0)
    }
}

/// Fresh OS entropy for every draw
#[derive(Clone, Copy, Debug, Default)]
pub struct EntropyJitter;

impl JitterSource for EntropyJitter {
    fn draw(&self, _key: &ScoreKey) -> f64 {
        ChaCha20Rng::from_entropy().gen_range(-1.0..=1.0)
    }
}

/// No perturbation
#[derive(Clone, Copy, Debug, Default)]
pub struct NoJitter;

impl JitterSource for NoJitter {
    fn draw(&self, _key: &ScoreKey) -> f64 {
        0.0
    }
}

/// The same draw for every key, clamped to [-1, 1]
#[derive(Clone, Copy, Debug)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn draw(&self, _key: &ScoreKey) -> f64 {
        self.0.clamp(-1.0, 1.0)
    }
}

/// Perturb `probability` by `draw × fraction` of itself and re-clamp to [0, 100]
pub fn apply_jitter(probability: f64, fraction: f64, draw: f64) -> f64 {
    (probability + probability * fraction * draw.clamp(-1.0, 1.0)).clamp(0.0, 100.0)
}
