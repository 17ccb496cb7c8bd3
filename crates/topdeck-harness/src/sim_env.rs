//! Simulated environment with a virtual clock and seeded randomness.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use topdeck_core::env::Environment;

#[derive(Debug)]
struct SimState {
    elapsed: Duration,
    rng: ChaCha8Rng,
}

/// Deterministic environment for simulation.
///
/// Time only moves when [`SimEnv::advance_to`] is called. Clones share the
/// clock and the RNG stream.
#[derive(Debug, Clone)]
pub struct SimEnv {
    epoch: Instant,
    state: Arc<Mutex<SimState>>,
}

impl SimEnv {
    /// Create an environment whose randomness is fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            epoch: Instant::now(),
            state: Arc::new(Mutex::new(SimState {
                elapsed: Duration::ZERO,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
        }
    }

    /// Virtual time since creation.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).elapsed
    }

    /// Move the clock forward to `elapsed`. Earlier targets are ignored.
    pub fn advance_to(&self, elapsed: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.elapsed = state.elapsed.max(elapsed);
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        self.epoch + self.elapsed()
    }

    /// Completes immediately; the simulation fires timers itself.
    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).rng.fill_bytes(buffer);
    }
}
