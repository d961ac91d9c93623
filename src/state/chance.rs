use std::{collections::VecDeque, sync::Mutex};

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Randomness consumed by the game: bullet loading and the per-turn draw.
pub trait Chance: Send + Sync {
    /// Whether a live round is loaded, with the given probability.
    fn bullet_loaded(&self, probability: f64) -> bool;

    /// Whether the trigger fires the live round when `remaining_chambers` chambers are left.
    ///
    /// Must return `true` with probability exactly `1 / remaining_chambers`.
    fn trigger_fires(&self, remaining_chambers: u32) -> bool;
}

/// [`Chance`] backed by a [`StdRng`].
pub struct RandomChance {
    rng: Mutex<StdRng>,
}

impl RandomChance {
    /// Seed from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sequence, for reproducible simulations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }
}

impl Chance for RandomChance {
    fn bullet_loaded(&self, probability: f64) -> bool {
        self.with_rng(|rng| rng.random_bool(probability.clamp(0.0, 1.0)))
    }

    fn trigger_fires(&self, remaining_chambers: u32) -> bool {
        if remaining_chambers <= 1 {
            return true;
        }
        self.with_rng(|rng| rng.random_range(0..remaining_chambers) == 0)
    }
}

/// [`Chance`] replaying a fixed script of trigger draws; an exhausted script never fires.
#[derive(Debug, Default)]
pub struct ScriptedChance {
    draws: Mutex<VecDeque<bool>>,
    bullet: Option<bool>,
}

impl ScriptedChance {
    /// Replay `draws` in order.
    pub fn new(draws: impl IntoIterator<Item = bool>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
            bullet: None,
        }
    }

    /// Force the outcome of [`Chance::bullet_loaded`] regardless of the probability.
    pub fn with_bullet(mut self, loaded: bool) -> Self {
        self.bullet = Some(loaded);
        self
    }

    /// Queue more trigger draws.
    pub fn push(&self, draws: impl IntoIterator<Item = bool>) {
        self.draws
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(draws);
    }
}

impl Chance for ScriptedChance {
    fn bullet_loaded(&self, probability: f64) -> bool {
        self.bullet.unwrap_or(probability >= 1.0)
    }

    fn trigger_fires(&self, _remaining_chambers: u32) -> bool {
        self.draws
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(false)
    }
}
