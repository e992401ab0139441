//! Wire keys.
//!
//! Tables and fields are identified on the wire by a seeded 64-bit xxHash of
//! their name. The hash is non-cryptographic; collisions are rejected when the
//! codec is generated, not at runtime.

use twox_hash::XxHash64;

/// Seed used unless the code generator is configured otherwise.
pub const DEFAULT_SEED: u64 = 0x7461_626c_6563_0001;

/// Key of a table or field name.
pub fn key_of(name: &str, seed: u64) -> u64 {
    XxHash64::oneshot(seed, name.as_bytes())
}
