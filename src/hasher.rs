use crate::error::AppError;
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::{Digest, Sha3_256};

pub const HASH_LENGTH: usize = 16;
const SALT_BYTES: usize = 16;

/// Salted, truncated digest over client addresses.
///
/// The salt is drawn once per process and never persisted, so a restart
/// rotates every future hash. Truncation to 16 hex characters is a storage
/// trade-off, not a security boundary; the point is that the raw address is
/// never written anywhere.
#[derive(Clone)]
pub struct VisitorHasher {
    salt: [u8; SALT_BYTES],
}

impl VisitorHasher {
    pub fn new() -> Result<Self, AppError> {
        let mut salt = [0u8; SALT_BYTES];
        OsRng.try_fill_bytes(&mut salt)?;
        Ok(Self { salt })
    }

    #[cfg(test)]
    pub fn with_salt(salt: [u8; SALT_BYTES]) -> Self {
        Self { salt }
    }

    pub fn hash(&self, address: &str) -> String {
        let mut digest = Sha3_256::new();
        digest.update(address.as_bytes());
        digest.update(self.salt);
        let mut hash = format!("{:x}", digest.finalize());
        hash.truncate(HASH_LENGTH);
        hash
    }
}
