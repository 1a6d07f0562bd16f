use serde::{Deserialize, Serialize};

use crate::{MerkledropError, Result};

/// 32-byte recipient identifier (the claimant's public key in most host
/// environments)
pub type Recipient = [u8; 32];

/// 32-byte hash value
pub type Hash32 = [u8; 32];

/// Width of a recipient identifier in bytes
pub const RECIPIENT_LEN: usize = 32;

/// One (recipient, amount) allocation committed into the tree.
///
/// Immutable once the tree is built. Claim status is never stored here;
/// it lives in the settlement receipt set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Recipient identifier (32 bytes, raw)
    pub recipient: Recipient,
    /// Allocated amount in base units
    pub amount: u64,
}

impl Allocation {
    pub fn new(recipient: Recipient, amount: u64) -> Self {
        Self { recipient, amount }
    }
}

/// Parse a 32-byte value from a hex string.
pub fn parse_hash32(s: &str) -> Result<Hash32> {
    let bytes = hex::decode(s)
        .map_err(|e| MerkledropError::MalformedInput(format!("invalid hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(MerkledropError::MalformedInput(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Recipient-list interchange record.
///
/// The published root must be the output of building the tree over these
/// records in `index` order; reordering changes the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationEntry {
    /// Recipient identifier, hex-encoded (64 hex chars)
    pub recipient: String,
    /// Allocated amount in base units
    pub amount: u64,
    /// Positional leaf index in the committed list
    pub index: u64,
}

/// Convert interchange records into allocations, validating that indices
/// are contiguous from zero (positional, not content-derived).
pub fn allocations_from_entries(entries: &[AllocationEntry]) -> Result<Vec<Allocation>> {
    let mut allocations = Vec::with_capacity(entries.len());
    for (pos, entry) in entries.iter().enumerate() {
        if entry.index != pos as u64 {
            return Err(MerkledropError::IndexMismatch {
                expected: pos as u64,
                got: entry.index,
            });
        }
        let recipient = parse_hash32(&entry.recipient)?;
        allocations.push(Allocation::new(recipient, entry.amount));
    }
    Ok(allocations)
}

/// Convert allocations back into interchange records.
pub fn entries_from_allocations(allocations: &[Allocation]) -> Vec<AllocationEntry> {
    allocations
        .iter()
        .enumerate()
        .map(|(index, a)| AllocationEntry {
            recipient: hex::encode(a.recipient),
            amount: a.amount,
            index: index as u64,
        })
        .collect()
}

/// Proof interchange document.
///
/// Carries one recipient's claim material: the sibling hashes in exactly
/// the order the extractor produced them, plus the tree shape inputs the
/// verifier needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofBundle {
    /// Recipient identifier, hex-encoded
    pub recipient: String,
    /// Claimed amount in base units
    pub amount: u64,
    /// Leaf index the proof was derived for
    pub leaf_index: u64,
    /// Number of leaves in the committed tree
    pub leaf_count: u64,
    /// Expected 32-byte root, hex-encoded
    pub root: String,
    /// Sibling hashes in leaf-to-root order, hex-encoded
    pub proof: Vec<String>,
}

impl ProofBundle {
    pub fn new(
        recipient: Recipient,
        amount: u64,
        leaf_index: u64,
        leaf_count: u64,
        root: Hash32,
        proof: &[Hash32],
    ) -> Self {
        Self {
            recipient: hex::encode(recipient),
            amount,
            leaf_index,
            leaf_count,
            root: hex::encode(root),
            proof: proof.iter().map(hex::encode).collect(),
        }
    }

    pub fn recipient_bytes(&self) -> Result<Recipient> {
        parse_hash32(&self.recipient)
    }

    pub fn root_bytes(&self) -> Result<Hash32> {
        parse_hash32(&self.root)
    }

    pub fn proof_hashes(&self) -> Result<Vec<Hash32>> {
        self.proof.iter().map(|h| parse_hash32(h)).collect()
    }
}
