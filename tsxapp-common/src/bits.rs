//! Variable-length bit string helpers.
//!
//! E2 service models carry cell identities as ASN.1 BIT STRINGs whose bits
//! occupy the most significant end of the byte buffer (trailing bits unused).
//! These helpers move such a field in and out of a right-aligned `u64`.

use crate::error::IdentifierError;

/// Largest bit string that fits in a `u64`.
pub const MAX_BIT_LENGTH: usize = 64;

/// Number of bytes needed to carry `bit_len` bits.
pub const fn byte_len(bit_len: usize) -> usize {
    (bit_len + 7) / 8
}

fn check_bit_len(bit_len: usize) -> Result<(), IdentifierError> {
    if bit_len == 0 || bit_len > MAX_BIT_LENGTH {
        return Err(IdentifierError::InvalidIdentifier(format!(
            "unsupported bit length {bit_len}"
        )));
    }
    Ok(())
}

/// Unpacks a `bit_len`-bit string into a right-aligned integer.
///
/// The buffer must be exactly `ceil(bit_len / 8)` bytes long.
pub fn bit_string_to_u64(bytes: &[u8], bit_len: usize) -> Result<u64, IdentifierError> {
    check_bit_len(bit_len)?;
    let expected = byte_len(bit_len);
    if bytes.len() != expected {
        return Err(IdentifierError::InvalidIdentifier(format!(
            "{bit_len}-bit string needs {expected} bytes, got {}",
            bytes.len()
        )));
    }

    let packed = bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte));
    let unused = expected * 8 - bit_len;
    Ok(packed >> unused)
}

/// Packs the low `bit_len` bits of `value` into a bit string buffer.
pub fn u64_to_bit_string(value: u64, bit_len: usize) -> Result<Vec<u8>, IdentifierError> {
    check_bit_len(bit_len)?;
    if bit_len < MAX_BIT_LENGTH && value >> bit_len != 0 {
        return Err(IdentifierError::ValueTooLarge { value, bit_len });
    }

    let expected = byte_len(bit_len);
    let unused = expected * 8 - bit_len;
    let shifted = value << unused;
    Ok(shifted.to_be_bytes()[8 - expected..].to_vec())
}
