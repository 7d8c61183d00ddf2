// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::{Mutex, MutexGuard};

use rand_chacha::rand_core::{RngCore, SeedableRng};
use thiserror::Error;

/// Alphabet used for random tokens like session ids.
const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Cryptographically-secure random number generator that uses the ChaCha algorithm.
#[derive(Debug)]
pub struct Rng {
    rng: Mutex<rand_chacha::ChaCha20Rng>,
}

impl Default for Rng {
    fn default() -> Self {
        Self {
            rng: Mutex::new(rand_chacha::ChaCha20Rng::from_entropy()),
        }
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl Rng {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: Mutex::new(rand_chacha::ChaCha20Rng::from_seed(seed)),
        }
    }
}

impl Rng {
    /// Returns an array with random bytes of given length.
    pub fn random_array<const N: usize>(&self) -> Result<[u8; N], RngError> {
        let mut rng = self.rng.lock().map_err(|_| RngError::LockPoisoned)?;
        let mut bytes = [0u8; N];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|_| RngError::NotEnoughRandomness)?;
        Ok(bytes)
    }

    /// Returns a vector with random bytes of given length.
    pub fn random_vec(&self, len: usize) -> Result<Vec<u8>, RngError> {
        let mut rng = self.rng.lock().map_err(|_| RngError::LockPoisoned)?;
        let mut bytes = vec![0u8; len];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|_| RngError::NotEnoughRandomness)?;
        Ok(bytes)
    }

    /// Returns a random string of given length over `[A-Za-z0-9]`.
    pub fn random_alphanumeric(&self, len: usize) -> Result<String, RngError> {
        let mut rng = self.rng.lock().map_err(|_| RngError::LockPoisoned)?;
        let mut token = String::with_capacity(len);
        let mut buffer = [0u8; 64];
        while token.len() < len {
            rng.try_fill_bytes(&mut buffer)
                .map_err(|_| RngError::NotEnoughRandomness)?;
            for byte in buffer {
                // Rejection sampling keeps the choice over the 62 characters uniform.
                if byte >= 248 {
                    continue;
                }
                token.push(TOKEN_ALPHABET[(byte % 62) as usize] as char);
                if token.len() == len {
                    break;
                }
            }
        }
        Ok(token)
    }

    /// Hands out the locked inner generator for primitives which need to drive the generator
    /// themselves, like RSA key generation.
    pub(crate) fn inner(&self) -> Result<MutexGuard<'_, rand_chacha::ChaCha20Rng>, RngError> {
        self.rng.lock().map_err(|_| RngError::LockPoisoned)
    }
}

#[derive(Debug, Error)]
pub enum RngError {
    #[error("rng lock is poisoned")]
    LockPoisoned,

    #[error("unable to collect enough randomness")]
    NotEnoughRandomness,
}

#[cfg(test)]
mod tests {
    use super::Rng;

    #[test]
    fn deterministic_randomness() {
        let sample_1 = {
            let rng = Rng::from_seed([1; 32]);
            rng.random_vec(128).unwrap()
        };

        let sample_2 = {
            let rng = Rng::from_seed([1; 32]);
            rng.random_vec(128).unwrap()
        };

        assert_eq!(sample_1, sample_2);
    }

    #[test]
    fn alphanumeric_tokens() {
        let rng = Rng::from_seed([2; 32]);

        let token = rng.random_alphanumeric(32).unwrap();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

        // Consecutive calls yield fresh tokens.
        assert_ne!(token, rng.random_alphanumeric(32).unwrap());
    }
}
