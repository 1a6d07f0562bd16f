//! Settlement state machine.
//!
//! One engine hosts many commitments, keyed by an explicit identifier
//! derived from the issuer and root; there is no global singleton.
//! Initialization escrows the full allocation; each claim verifies the
//! Merkle proof against the stored root, then hands the host ledger one
//! atomic receipt-and-payout unit.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use merkledrop_core::{Hash32, Recipient};
use merkledrop_merkle::verify_claim;

use crate::host::HostLedger;
use crate::{Result, SettlementError};

/// 32-byte commitment identifier
pub type CommitmentId = [u8; 32];

/// Derive the commitment identifier: `SHA256(issuer || root)`.
///
/// The same root published by two issuers is two distinct commitments.
pub fn commitment_id(issuer: &Recipient, root: &Hash32) -> CommitmentId {
    let mut hasher = Sha256::new();
    hasher.update(issuer);
    hasher.update(root);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Persistent per-commitment state.
///
/// Created once at initialization; only `total_settled` moves afterwards,
/// and only upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitmentState {
    /// Merkle root committing to the allocation list
    pub root: Hash32,
    /// Issuer identity that funded the escrow
    pub issuer: Recipient,
    /// Number of leaves in the committed tree (fixes the tree shape for
    /// the verifier)
    pub leaf_count: u64,
    /// Total value escrowed at initialization
    pub total_allocated: u64,
    /// Sum of all settled claims so far, monotonically non-decreasing
    pub total_settled: u64,
}

/// The settlement engine.
///
/// Exclusively owns commitment state; escrow and receipts are mediated
/// through the host ledger's atomic primitives.
pub struct SettlementEngine {
    commitments: HashMap<CommitmentId, CommitmentState>,
    ledger: Box<dyn HostLedger>,
}

impl std::fmt::Debug for SettlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettlementEngine")
            .field("commitments", &self.commitments)
            .finish_non_exhaustive()
    }
}

impl SettlementEngine {
    pub fn new(ledger: Box<dyn HostLedger>) -> Self {
        Self {
            commitments: HashMap::new(),
            ledger,
        }
    }

    /// Initialize a commitment: persist its state and escrow the full
    /// allocation from the issuer's account.
    ///
    /// Fails `AlreadyInitialized` if the (issuer, root) pair is already
    /// live. The funding transfer is atomic: on failure no commitment
    /// state is created.
    pub fn initialize(
        &mut self,
        issuer: Recipient,
        root: Hash32,
        leaf_count: u64,
        total_amount: u64,
    ) -> Result<CommitmentId> {
        let id = commitment_id(&issuer, &root);
        if self.commitments.contains_key(&id) {
            return Err(SettlementError::AlreadyInitialized(hex::encode(id)));
        }

        self.ledger.fund_escrow(&id, &issuer, total_amount)?;
        self.commitments.insert(
            id,
            CommitmentState {
                root,
                issuer,
                leaf_count,
                total_allocated: total_amount,
                total_settled: 0,
            },
        );

        info!(
            "Initialized commitment {} (root {}, {} leaves, {} escrowed)",
            hex::encode(&id[..8]),
            hex::encode(&root[..8]),
            leaf_count,
            total_amount,
        );
        Ok(id)
    }

    /// Process one claim against a live commitment.
    ///
    /// Hard preconditions in order: commitment exists, proof verifies,
    /// receipt is fresh, escrow covers the amount. Receipt creation and
    /// payout commit together inside the host ledger; a verified proof
    /// whose payout fails leaves no receipt.
    pub fn claim(
        &mut self,
        id: &CommitmentId,
        recipient: &Recipient,
        amount: u64,
        leaf_index: u64,
        proof: &[Hash32],
    ) -> Result<()> {
        let state = self
            .commitments
            .get_mut(id)
            .ok_or_else(|| SettlementError::NotInitialized(hex::encode(id)))?;

        if !verify_claim(
            recipient,
            amount,
            leaf_index,
            state.leaf_count,
            proof,
            &state.root,
        ) {
            warn!(
                "Rejected claim on commitment {} for recipient {}: invalid proof",
                hex::encode(&id[..8]),
                hex::encode(&recipient[..8]),
            );
            return Err(SettlementError::InvalidProof);
        }

        let new_total = state
            .total_settled
            .checked_add(amount)
            .ok_or(SettlementError::Overflow)?;

        self.ledger.settle(id, recipient, amount)?;
        state.total_settled = new_total;

        debug!(
            "Settled claim on commitment {} for recipient {}: {} (total {})",
            hex::encode(&id[..8]),
            hex::encode(&recipient[..8]),
            amount,
            new_total,
        );
        Ok(())
    }

    /// Look up a commitment's state.
    pub fn commitment(&self, id: &CommitmentId) -> Option<&CommitmentState> {
        self.commitments.get(id)
    }

    /// Number of live commitments.
    pub fn commitment_count(&self) -> usize {
        self.commitments.len()
    }

    /// Iterate over all commitments (for state persistence).
    pub fn commitments(&self) -> impl Iterator<Item = (&CommitmentId, &CommitmentState)> {
        self.commitments.iter()
    }

    /// The host ledger backing this engine.
    pub fn ledger(&self) -> &dyn HostLedger {
        &*self.ledger
    }

    /// Rebuild an engine from persisted commitment state.
    pub(crate) fn from_parts(
        commitments: HashMap<CommitmentId, CommitmentState>,
        ledger: Box<dyn HostLedger>,
    ) -> Self {
        Self { commitments, ledger }
    }
}
