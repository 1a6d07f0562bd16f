//! Canonical leaf encoding.
//!
//! A leaf serializes as `recipient(32) || amount_le(8) || claimed(1)`.
//! The claimed byte is a structural constant `0x00`: leaves are only ever
//! constructed in the unclaimed state, and claim status is tracked by
//! settlement receipts, never by re-hashing the leaf. The byte stays in
//! the encoding for root compatibility.

use sha2::{Digest, Sha256};

use merkledrop_core::{Hash32, RECIPIENT_LEN};

use crate::{MerkleError, Result};

/// Encoded leaf length: recipient(32) + amount(8) + claimed flag(1)
pub const LEAF_LEN: usize = RECIPIENT_LEN + 8 + 1;

/// The claimed flag byte hashed into every leaf.
const CLAIMED_FLAG: u8 = 0x00;

/// Serialize one allocation into the canonical leaf byte layout.
///
/// Fails if `recipient` is not exactly 32 bytes. The byte order and
/// widths are a binding contract with every published root.
pub fn encode_leaf(recipient: &[u8], amount: u64) -> Result<[u8; LEAF_LEN]> {
    if recipient.len() != RECIPIENT_LEN {
        return Err(MerkleError::MalformedInput {
            expected: RECIPIENT_LEN,
            got: recipient.len(),
        });
    }

    let mut out = [0u8; LEAF_LEN];
    out[..RECIPIENT_LEN].copy_from_slice(recipient);
    out[RECIPIENT_LEN..RECIPIENT_LEN + 8].copy_from_slice(&amount.to_le_bytes());
    out[LEAF_LEN - 1] = CLAIMED_FLAG;
    Ok(out)
}

/// Compute a leaf hash: `SHA256(recipient || amount_le || 0x00)`
pub fn leaf_hash(recipient: &[u8], amount: u64) -> Result<Hash32> {
    let encoded = encode_leaf(recipient, amount)?;
    let mut hasher = Sha256::new();
    hasher.update(encoded);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    Ok(out)
}
