use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

/// RandMode controls random generator behaviour. May be predictable for
/// testing or truly random for gameplay.
pub enum RandMode {
    Predictable,
    RandomUniform,
}

pub struct ZRand {
    rng: Box<dyn RngCore>,
    rand_mode: RandMode,
}

impl ZRand {
    pub fn new_uniform() -> ZRand {
        ZRand {
            rng: Box::new(rand::thread_rng()),
            rand_mode: RandMode::RandomUniform,
        }
    }

    pub fn new_predictable(seed: u64) -> ZRand {
        ZRand {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            rand_mode: RandMode::Predictable,
        }
    }

    pub fn is_predictable(&self) -> bool {
        matches!(self.rand_mode, RandMode::Predictable)
    }

    /// Draw uniformly from 1..=range. `random` with a positive operand.
    pub fn gen_in_range(&mut self, range: u16) -> u16 {
        debug_assert!(range > 0);
        self.rng.gen_range(1..=range)
    }

    /// Reseed, as `random` with a non-positive operand requires. A seed of
    /// 0 returns to uniform mode; anything else enters predictable mode.
    pub fn reseed(&mut self, seed: u16) {
        if seed == 0 {
            *self = ZRand::new_uniform();
        } else {
            *self = ZRand::new_predictable(seed as u64);
        }
    }
}
