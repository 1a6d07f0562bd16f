//! Merkledrop Commitment Engine
//!
//! Binary Merkle tree over an ordered allocation list: canonical leaf
//! encoding, tree construction, proof extraction, and claim verification.
//!
//! The builder and the verifier apply the identical duplicate-last-node
//! pairing rule. Both sides must stay bit-exact with each other; a
//! different padding strategy or serialization order produces different
//! roots and breaks every published commitment.

pub mod leaf;
pub mod tree;
pub mod verify;

pub use leaf::{encode_leaf, leaf_hash, LEAF_LEN};
pub use tree::{hash_pair, MerkleProof, MerkleTree};
pub use verify::verify_claim;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MerkleError {
    #[error("Malformed input: recipient must be {expected} bytes, got {got}")]
    MalformedInput { expected: usize, got: usize },

    #[error("Empty input: cannot commit to zero allocations")]
    EmptyInput,

    #[error("Leaf index {index} out of range: tree has {leaves} leaves")]
    IndexOutOfRange { index: usize, leaves: usize },
}

pub type Result<T> = std::result::Result<T, MerkleError>;
