//! Merkle tree construction and proof extraction.
//!
//! The tree is array-backed: one flat `Vec<[u8; 32]>` per level, level 0
//! holding the leaf hashes in allocation-list order. The structure is
//! built once and never mutated, so sibling lookup is index arithmetic
//! rather than pointer chasing.

use sha2::{Digest, Sha256};

use merkledrop_core::{Allocation, Hash32};

use crate::leaf::leaf_hash;
use crate::{MerkleError, Result};

/// Hash an adjacent pair: `SHA256(left || right)`
pub fn hash_pair(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Ordered sibling hashes in leaf-to-root order.
///
/// Levels where the claimed leaf's subtree was the duplicated odd tail
/// contribute no entry, so the length varies with tree shape and leaf
/// parity; the verifier reconstructs which levels are silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub siblings: Vec<Hash32>,
}

impl MerkleProof {
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

/// Binary Merkle tree over an ordered allocation list.
///
/// Parent = `SHA256(left || right)`; an odd-length level duplicates its
/// last node (`SHA256(x || x)`) rather than dropping it or padding with
/// zeros. Leaf order is fixed for the lifetime of the commitment.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// levels[0] = leaf hashes, levels.last() = [root]
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Build the full tree from an ordered allocation list.
    pub fn build(allocations: &[Allocation]) -> Result<Self> {
        if allocations.is_empty() {
            return Err(MerkleError::EmptyInput);
        }

        let mut current: Vec<Hash32> = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            current.push(leaf_hash(&allocation.recipient, allocation.amount)?);
        }

        let mut levels = Vec::new();
        while current.len() > 1 {
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                let left = &pair[0];
                // Odd tail pairs with itself
                let right = pair.get(1).unwrap_or(left);
                next.push(hash_pair(left, right));
            }
            levels.push(current);
            current = next;
        }
        levels.push(current);

        Ok(Self { levels })
    }

    /// The 32-byte root committing to the whole list.
    pub fn root(&self) -> Hash32 {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of leaves (level 0 width).
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Tree height: number of pairing levels between leaves and root.
    pub fn height(&self) -> usize {
        self.levels.len() - 1
    }

    /// Leaf hash at `index`, if in range.
    pub fn leaf(&self, index: usize) -> Option<Hash32> {
        self.levels[0].get(index).copied()
    }

    /// Extract the minimal sibling sequence for one leaf.
    ///
    /// At each level below the root the sibling position is `index ^ 1`;
    /// when that position is past the end of the level the node was the
    /// duplicated odd tail and no entry is emitted, but the walk still
    /// advances (`index /= 2`).
    pub fn proof(&self, leaf_index: usize) -> Result<MerkleProof> {
        let leaves = self.leaf_count();
        if leaf_index >= leaves {
            return Err(MerkleError::IndexOutOfRange {
                index: leaf_index,
                leaves,
            });
        }

        let mut siblings = Vec::with_capacity(self.height());
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if sibling < level.len() {
                siblings.push(level[sibling]);
            }
            index /= 2;
        }

        Ok(MerkleProof { siblings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(byte: u8, amount: u64) -> Allocation {
        Allocation::new([byte; 32], amount)
    }

    #[test]
    fn test_build_rejects_empty_list() {
        let err = MerkleTree::build(&[]).unwrap_err();
        assert!(matches!(err, MerkleError::EmptyInput));
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let tree = MerkleTree::build(&[allocation(1, 100)]).unwrap();
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.root(), leaf_hash(&[1u8; 32], 100).unwrap());
        assert!(tree.proof(0).unwrap().is_empty());
    }

    #[test]
    fn test_two_leaf_root() {
        let tree = MerkleTree::build(&[allocation(1, 100), allocation(2, 200)]).unwrap();
        let left = leaf_hash(&[1u8; 32], 100).unwrap();
        let right = leaf_hash(&[2u8; 32], 200).unwrap();
        assert_eq!(tree.root(), hash_pair(&left, &right));
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn test_three_leaf_tree_duplicates_odd_tail() {
        // Recipients [A:100, B:200, C:150] in list order.
        let allocations = [allocation(0xA, 100), allocation(0xB, 200), allocation(0xC, 150)];
        let tree = MerkleTree::build(&allocations).unwrap();

        let leaf_a = leaf_hash(&[0xA; 32], 100).unwrap();
        let leaf_b = leaf_hash(&[0xB; 32], 200).unwrap();
        let leaf_c = leaf_hash(&[0xC; 32], 150).unwrap();

        // Level 1 = [H(A||B), H(C||C)]: C paired with itself, not dropped
        // and not paired with zeros.
        let ab = hash_pair(&leaf_a, &leaf_b);
        let cc = hash_pair(&leaf_c, &leaf_c);
        assert_eq!(tree.root(), hash_pair(&ab, &cc));
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn test_three_leaf_proof_for_middle_leaf() {
        // The proof for B (index 1) is exactly two entries: its level-0
        // sibling H(A), then the level-1 sibling H(H(C)||H(C)).
        let allocations = [allocation(0xA, 100), allocation(0xB, 200), allocation(0xC, 150)];
        let tree = MerkleTree::build(&allocations).unwrap();

        let leaf_a = leaf_hash(&[0xA; 32], 100).unwrap();
        let leaf_c = leaf_hash(&[0xC; 32], 150).unwrap();
        let cc = hash_pair(&leaf_c, &leaf_c);

        let proof = tree.proof(1).unwrap();
        assert_eq!(proof.siblings, vec![leaf_a, cc]);
    }

    #[test]
    fn test_three_leaf_proof_for_duplicated_tail_is_shorter() {
        let allocations = [allocation(0xA, 100), allocation(0xB, 200), allocation(0xC, 150)];
        let tree = MerkleTree::build(&allocations).unwrap();

        // C (index 2) has no level-0 sibling; only the level-1 entry remains.
        let proof_c = tree.proof(2).unwrap();
        let proof_a = tree.proof(0).unwrap();
        assert!(proof_c.len() < proof_a.len());
        assert_eq!(proof_c.len(), 1);

        let leaf_a = leaf_hash(&[0xA; 32], 100).unwrap();
        let leaf_b = leaf_hash(&[0xB; 32], 200).unwrap();
        assert_eq!(proof_c.siblings, vec![hash_pair(&leaf_a, &leaf_b)]);
    }

    #[test]
    fn test_proof_index_out_of_range() {
        let tree = MerkleTree::build(&[allocation(1, 1), allocation(2, 2)]).unwrap();
        let err = tree.proof(2).unwrap_err();
        assert!(matches!(
            err,
            MerkleError::IndexOutOfRange { index: 2, leaves: 2 }
        ));
    }

    #[test]
    fn test_root_deterministic() {
        let allocations: Vec<Allocation> =
            (0..7).map(|i| allocation(i as u8 + 1, (i + 1) * 10)).collect();
        let a = MerkleTree::build(&allocations).unwrap();
        let b = MerkleTree::build(&allocations).unwrap();
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_reordering_changes_root() {
        let forward = [allocation(1, 100), allocation(2, 200)];
        let reversed = [allocation(2, 200), allocation(1, 100)];
        let a = MerkleTree::build(&forward).unwrap();
        let b = MerkleTree::build(&reversed).unwrap();
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn test_height_is_ceil_log2() {
        for (leaves, expected_height) in [(1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4)] {
            let allocations: Vec<Allocation> =
                (0..leaves).map(|i| allocation(i as u8 + 1, 10)).collect();
            let tree = MerkleTree::build(&allocations).unwrap();
            assert_eq!(tree.height(), expected_height, "height for {} leaves", leaves);
        }
    }
}
