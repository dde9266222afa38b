//! MurmurHash3 (x86, 32-bit) as used by the hashing trick
//!
//! The column and sign derivation mirror scikit-learn's `HashingVectorizer`,
//! so hashed matrices are comparable across the two implementations.

use crate::error::Result;
use std::io::Cursor;

/// Seed used for every token hash
pub const HASH_SEED: u32 = 0;

/// MurmurHash3_x86_32 of `data`
#[inline]
pub fn murmur3_32(data: &[u8], seed: u32) -> Result<u32> {
    Ok(murmur3::murmur3_32(&mut Cursor::new(data), seed)?)
}

/// Signed 32-bit token hash with the fixed seed
#[inline]
pub fn hash_token(token: &str) -> Result<i32> {
    Ok(murmur3_32(token.as_bytes(), HASH_SEED)? as i32)
}

/// Column of a signed hash in a space of `n_features` columns
///
/// `|h| mod n_features`; `|i32::MIN|` is taken as 2^31, not wrapped.
#[inline]
pub fn bucket(hash: i32, n_features: u64) -> u32 {
    (hash.unsigned_abs() as u64 % n_features) as u32
}

/// Sign carried by the hash's top bit: `-1` for negative hashes
#[inline]
pub fn sign(hash: i32) -> i32 {
    if hash >= 0 {
        1
    } else {
        -1
    }
}
