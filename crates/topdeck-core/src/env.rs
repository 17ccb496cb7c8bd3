//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples room and match logic from system
//! resources (time, randomness). This enables:
//!
//! - Deterministic Simulation: the harness provides a virtual clock and a
//!   seeded RNG, so a shuffle or a room code can be reproduced exactly.
//!
//! - Production Runtime: the server uses the system clock and OS entropy
//!   without any change to the engine.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Abstract environment providing time, randomness, and async sleeping.
///
/// Engine code only calls `now()` and the randomness methods. `sleep()` is
/// reserved for drivers that realise scheduled timers.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: Subsequent calls must return times >= previous calls.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be used
    /// by driver code (not engine logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Determinism during simulations: Given the same RNG seed, this produces
    ///   the same sequence of bytes
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for session identifiers.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Returns a PRNG seeded from this environment.
    ///
    /// Shuffles and room codes draw from a fresh generator per operation so
    /// that a seeded environment replays them exactly. Fairness is the
    /// requirement here, not secrecy.
    fn rng(&self) -> ChaCha8Rng {
        let mut seed = [0u8; 32];
        self.random_bytes(&mut seed);
        ChaCha8Rng::from_seed(seed)
    }
}
