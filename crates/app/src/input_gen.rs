//! Host traffic generation.
//!
//! The simulated host sends some line noise before it sends the start byte,
//! which exercises the controller's discard path. Noise never contains the
//! start byte itself.
//!
//! # Design
//!
//! Generated noise is a mix of:
//! - Text-like bytes (a terminal typing at the device)
//! - Line endings
//! - Arbitrary binary bytes (a glitching line)

use collatz_sim_core::search::START_BYTE;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generate `noise_bytes` bytes of noise followed by the start byte.
pub fn generate_host_traffic(seed: u64, noise_bytes: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(noise_bytes + 1);

    while data.len() < noise_bytes {
        let byte = match rng.gen_range(0..10) {
            // 60% text-like
            0..=5 => {
                let alphabet = b"abcdefghijklmnopqrstuvwxyz0123456789 .?";
                alphabet[rng.gen_range(0..alphabet.len())]
            }
            // 20% line endings
            6..=7 => {
                if rng.gen() {
                    b'\r'
                } else {
                    b'\n'
                }
            }
            // 20% binary
            _ => rng.gen(),
        };
        if byte != START_BYTE {
            data.push(byte);
        }
    }

    data.push(START_BYTE);
    data
}
