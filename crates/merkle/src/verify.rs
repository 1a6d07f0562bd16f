//! Claim verification.
//!
//! Pure recomputation of the root from one claimed leaf and its sibling
//! path. The verifier derives the tree shape from the leaf count (the
//! level widths follow `w -> ceil(w / 2)`) and never trusts the proof's
//! own length: at levels where the claimed subtree is the duplicated odd
//! tail it consumes no entry and pairs the running hash with itself,
//! exactly as the builder did. A proof with missing or leftover entries
//! is rejected outright.

use merkledrop_core::Hash32;

use crate::leaf::leaf_hash;
use crate::tree::hash_pair;

/// Verify that (recipient, amount) sits at `leaf_index` in the committed
/// tree with root `expected_root`.
///
/// Side-effect-free and deterministic. The leaf is always rehashed with
/// the claimed flag forced to zero: a claimant cannot submit a
/// "claimed" leaf; claim status is proven by receipt existence, not by
/// leaf content.
pub fn verify_claim(
    recipient: &[u8],
    amount: u64,
    leaf_index: u64,
    leaf_count: u64,
    proof: &[Hash32],
    expected_root: &Hash32,
) -> bool {
    if leaf_count == 0 || leaf_index >= leaf_count {
        return false;
    }

    let Ok(mut running) = leaf_hash(recipient, amount) else {
        return false;
    };

    let mut index = leaf_index;
    let mut width = leaf_count;
    let mut entries = proof.iter();

    while width > 1 {
        let sibling = index ^ 1;
        if sibling < width {
            // Ordering by index parity: even = left child, odd = right.
            let Some(entry) = entries.next() else {
                return false;
            };
            running = if index % 2 == 0 {
                hash_pair(&running, entry)
            } else {
                hash_pair(entry, &running)
            };
        } else {
            // This level's odd tail was duplicated at build time.
            running = hash_pair(&running, &running);
        }
        index /= 2;
        width = (width + 1) / 2;
    }

    // Leftover entries mean the proof was built for a different shape.
    entries.next().is_none() && running == *expected_root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MerkleTree;
    use merkledrop_core::Allocation;

    fn allocation(byte: u8, amount: u64) -> Allocation {
        Allocation::new([byte; 32], amount)
    }

    fn build_list(leaves: usize) -> Vec<Allocation> {
        (0..leaves)
            .map(|i| allocation(i as u8 + 1, (i as u64 + 1) * 100))
            .collect()
    }

    #[test]
    fn test_round_trip_every_index_and_shape() {
        for leaves in 1..=9 {
            let allocations = build_list(leaves);
            let tree = MerkleTree::build(&allocations).unwrap();
            let root = tree.root();

            for (i, a) in allocations.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert!(
                    verify_claim(
                        &a.recipient,
                        a.amount,
                        i as u64,
                        leaves as u64,
                        &proof.siblings,
                        &root,
                    ),
                    "round trip failed for leaf {} of {}",
                    i,
                    leaves
                );
            }
        }
    }

    #[test]
    fn test_mutated_proof_entry_rejected() {
        let allocations = build_list(5);
        let tree = MerkleTree::build(&allocations).unwrap();
        let root = tree.root();
        let proof = tree.proof(1).unwrap();

        for entry in 0..proof.len() {
            for byte in 0..32 {
                let mut tampered = proof.siblings.clone();
                tampered[entry][byte] ^= 0x01;
                assert!(
                    !verify_claim(&[2u8; 32], 200, 1, 5, &tampered, &root),
                    "flipping byte {} of entry {} should reject",
                    byte,
                    entry
                );
            }
        }
    }

    #[test]
    fn test_wrong_amount_rejected() {
        let allocations = build_list(4);
        let tree = MerkleTree::build(&allocations).unwrap();
        let proof = tree.proof(2).unwrap();

        assert!(verify_claim(&[3u8; 32], 300, 2, 4, &proof.siblings, &tree.root()));
        assert!(!verify_claim(&[3u8; 32], 301, 2, 4, &proof.siblings, &tree.root()));
    }

    #[test]
    fn test_wrong_recipient_rejected() {
        let allocations = build_list(4);
        let tree = MerkleTree::build(&allocations).unwrap();
        let proof = tree.proof(2).unwrap();

        assert!(!verify_claim(&[9u8; 32], 300, 2, 4, &proof.siblings, &tree.root()));
    }

    #[test]
    fn test_proof_for_wrong_index_rejected() {
        let allocations = build_list(4);
        let tree = MerkleTree::build(&allocations).unwrap();
        let proof = tree.proof(2).unwrap();

        assert!(!verify_claim(&[3u8; 32], 300, 1, 4, &proof.siblings, &tree.root()));
    }

    #[test]
    fn test_duplicated_tail_verifies_with_shorter_proof() {
        // 3-leaf tree: leaf 2 is the duplicated last node, its proof has
        // strictly fewer entries than leaf 0's, and still verifies.
        let allocations = build_list(3);
        let tree = MerkleTree::build(&allocations).unwrap();
        let root = tree.root();

        let proof_0 = tree.proof(0).unwrap();
        let proof_2 = tree.proof(2).unwrap();
        assert!(proof_2.len() < proof_0.len());

        assert!(verify_claim(&[3u8; 32], 300, 2, 3, &proof_2.siblings, &root));
    }

    #[test]
    fn test_truncated_proof_rejected() {
        let allocations = build_list(4);
        let tree = MerkleTree::build(&allocations).unwrap();
        let proof = tree.proof(0).unwrap();
        assert_eq!(proof.len(), 2);

        let truncated = &proof.siblings[..1];
        assert!(!verify_claim(&[1u8; 32], 100, 0, 4, truncated, &tree.root()));
    }

    #[test]
    fn test_padded_proof_rejected() {
        // Leftover entries must reject even when the consumed prefix
        // folds to the correct root.
        let allocations = build_list(3);
        let tree = MerkleTree::build(&allocations).unwrap();
        let root = tree.root();

        let mut padded = tree.proof(2).unwrap().siblings;
        assert!(verify_claim(&[3u8; 32], 300, 2, 3, &padded, &root));
        padded.push([0u8; 32]);
        assert!(!verify_claim(&[3u8; 32], 300, 2, 3, &padded, &root));
    }

    #[test]
    fn test_index_out_of_shape_rejected() {
        let allocations = build_list(3);
        let tree = MerkleTree::build(&allocations).unwrap();
        let proof = tree.proof(2).unwrap();

        assert!(!verify_claim(&[3u8; 32], 300, 3, 3, &proof.siblings, &tree.root()));
        assert!(!verify_claim(&[3u8; 32], 300, 2, 0, &proof.siblings, &tree.root()));
    }

    #[test]
    fn test_wrong_leaf_count_rejected() {
        // Claiming a different tree shape than the commitment's must fail.
        let allocations = build_list(3);
        let tree = MerkleTree::build(&allocations).unwrap();
        let proof = tree.proof(2).unwrap();

        assert!(!verify_claim(&[3u8; 32], 300, 2, 4, &proof.siblings, &tree.root()));
    }

    #[test]
    fn test_single_leaf_empty_proof() {
        let allocations = build_list(1);
        let tree = MerkleTree::build(&allocations).unwrap();
        assert!(verify_claim(&[1u8; 32], 100, 0, 1, &[], &tree.root()));
        assert!(!verify_claim(&[1u8; 32], 100, 0, 1, &[[0u8; 32]], &tree.root()));
    }
}
