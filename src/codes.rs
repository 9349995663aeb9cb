use crate::error::AppError;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

pub const CODE_LENGTH: usize = 8;
const RANDOM_BYTES: usize = 6;

/// Draws 6 bytes from the OS entropy source and encodes them with the
/// URL-safe base64 alphabet, unpadded and capped at 8 characters.
///
/// Collisions are not checked here; the store's uniqueness constraint
/// rejects them and the caller regenerates.
pub fn generate() -> Result<String, AppError> {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    let mut code = BASE64_URL_SAFE_NO_PAD.encode(bytes);
    code.truncate(CODE_LENGTH);
    Ok(code)
}
