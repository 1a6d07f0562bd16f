//! Host-ledger abstraction.
//!
//! The execution environment that ultimately holds account balances and
//! claim receipts is an external collaborator. This trait expresses the
//! primitives the settlement engine requires from it: atomic escrow
//! funding, and an all-or-nothing settle step whose receipt creation is
//! exclusive: when two claim attempts for the same recipient race, at
//! most one creates the receipt and the loser observes `AlreadyClaimed`.
//!
//! `InMemoryLedger` implements the trait with maps behind a single
//! `RwLock`, so each operation is one critical section with no
//! user-visible intermediate state.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use merkledrop_core::Recipient;

use crate::engine::CommitmentId;
use crate::{Result, SettlementError};

/// Atomic account and receipt primitives expected from the host
/// environment.
pub trait HostLedger: Send + Sync {
    /// Credit an account. Used to fund issuers and for test deposits.
    fn deposit(&self, account: &Recipient, amount: u64) -> Result<()>;

    /// Current balance of an account (zero if it has never been touched).
    fn balance(&self, account: &Recipient) -> u64;

    /// Current escrow balance of a commitment.
    fn escrow_balance(&self, commitment: &CommitmentId) -> u64;

    /// Move `amount` from the issuer's account into the commitment's
    /// escrow. All-or-nothing: fails `InsufficientFunds` without
    /// touching either side.
    fn fund_escrow(
        &self,
        commitment: &CommitmentId,
        issuer: &Recipient,
        amount: u64,
    ) -> Result<()>;

    /// Atomically create the `(commitment, recipient)` claim receipt and
    /// transfer `amount` from escrow to the recipient.
    ///
    /// Receipt creation is exclusive: a second call for the same pair
    /// fails `AlreadyClaimed` deterministically. A failed payout never
    /// leaves a receipt behind.
    fn settle(
        &self,
        commitment: &CommitmentId,
        recipient: &Recipient,
        amount: u64,
    ) -> Result<()>;

    /// Whether the `(commitment, recipient)` receipt exists.
    fn receipt_exists(&self, commitment: &CommitmentId, recipient: &Recipient) -> bool;
}

#[derive(Debug, Default)]
struct LedgerState {
    /// Account balances by 32-byte identifier
    balances: HashMap<Recipient, u64>,
    /// Escrowed value by commitment id
    escrows: HashMap<CommitmentId, u64>,
    /// Existence-only claim receipts, the sole double-claim guard
    receipts: HashSet<(CommitmentId, Recipient)>,
}

/// In-memory transactional ledger.
///
/// Cloning shares the underlying state, so the engine and tooling can
/// hold handles to the same ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

/// Plain-data snapshot of the ledger, for state persistence.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub balances: Vec<(Recipient, u64)>,
    pub escrows: Vec<(CommitmentId, u64)>,
    pub receipts: Vec<(CommitmentId, Recipient)>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the full ledger state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.read().expect("ledger lock poisoned");
        LedgerSnapshot {
            balances: state.balances.iter().map(|(k, v)| (*k, *v)).collect(),
            escrows: state.escrows.iter().map(|(k, v)| (*k, *v)).collect(),
            receipts: state.receipts.iter().copied().collect(),
        }
    }

    /// Reconstruct a ledger from a snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let state = LedgerState {
            balances: snapshot.balances.into_iter().collect(),
            escrows: snapshot.escrows.into_iter().collect(),
            receipts: snapshot.receipts.into_iter().collect(),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

impl HostLedger for InMemoryLedger {
    fn deposit(&self, account: &Recipient, amount: u64) -> Result<()> {
        let mut state = self.state.write().expect("ledger lock poisoned");
        let balance = state.balances.entry(*account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(SettlementError::Overflow)?;
        debug!(
            "Deposited {} to account {}",
            amount,
            hex::encode(&account[..8])
        );
        Ok(())
    }

    fn balance(&self, account: &Recipient) -> u64 {
        let state = self.state.read().expect("ledger lock poisoned");
        state.balances.get(account).copied().unwrap_or(0)
    }

    fn escrow_balance(&self, commitment: &CommitmentId) -> u64 {
        let state = self.state.read().expect("ledger lock poisoned");
        state.escrows.get(commitment).copied().unwrap_or(0)
    }

    fn fund_escrow(
        &self,
        commitment: &CommitmentId,
        issuer: &Recipient,
        amount: u64,
    ) -> Result<()> {
        let mut state = self.state.write().expect("ledger lock poisoned");

        let have = state.balances.get(issuer).copied().unwrap_or(0);
        if have < amount {
            return Err(SettlementError::InsufficientFunds { need: amount, have });
        }
        let escrow = state.escrows.get(commitment).copied().unwrap_or(0);
        let new_escrow = escrow.checked_add(amount).ok_or(SettlementError::Overflow)?;

        // Checks done; both sides move under the same lock.
        state.balances.insert(*issuer, have - amount);
        state.escrows.insert(*commitment, new_escrow);

        debug!(
            "Funded escrow {} with {} from issuer {}",
            hex::encode(&commitment[..8]),
            amount,
            hex::encode(&issuer[..8])
        );
        Ok(())
    }

    fn settle(
        &self,
        commitment: &CommitmentId,
        recipient: &Recipient,
        amount: u64,
    ) -> Result<()> {
        let mut state = self.state.write().expect("ledger lock poisoned");

        let key = (*commitment, *recipient);
        if state.receipts.contains(&key) {
            return Err(SettlementError::AlreadyClaimed);
        }
        let escrow = state.escrows.get(commitment).copied().unwrap_or(0);
        if escrow < amount {
            return Err(SettlementError::InsufficientEscrow {
                need: amount,
                have: escrow,
            });
        }
        let balance = state.balances.get(recipient).copied().unwrap_or(0);
        let new_balance = balance.checked_add(amount).ok_or(SettlementError::Overflow)?;

        // Checks done; receipt and transfer commit as one unit.
        state.receipts.insert(key);
        state.escrows.insert(*commitment, escrow - amount);
        state.balances.insert(*recipient, new_balance);

        debug!(
            "Settled {} from escrow {} to recipient {}",
            amount,
            hex::encode(&commitment[..8]),
            hex::encode(&recipient[..8])
        );
        Ok(())
    }

    fn receipt_exists(&self, commitment: &CommitmentId, recipient: &Recipient) -> bool {
        let state = self.state.read().expect("ledger lock poisoned");
        state.receipts.contains(&(*commitment, *recipient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_and_balance() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.balance(&[1u8; 32]), 0);

        ledger.deposit(&[1u8; 32], 500).unwrap();
        ledger.deposit(&[1u8; 32], 250).unwrap();
        assert_eq!(ledger.balance(&[1u8; 32]), 750);
    }

    #[test]
    fn test_fund_escrow_moves_value() {
        let ledger = InMemoryLedger::new();
        ledger.deposit(&[1u8; 32], 1000).unwrap();

        ledger.fund_escrow(&[9u8; 32], &[1u8; 32], 600).unwrap();
        assert_eq!(ledger.balance(&[1u8; 32]), 400);
        assert_eq!(ledger.escrow_balance(&[9u8; 32]), 600);
    }

    #[test]
    fn test_fund_escrow_insufficient_funds() {
        let ledger = InMemoryLedger::new();
        ledger.deposit(&[1u8; 32], 100).unwrap();

        let err = ledger.fund_escrow(&[9u8; 32], &[1u8; 32], 600).unwrap_err();
        assert!(matches!(
            err,
            SettlementError::InsufficientFunds { need: 600, have: 100 }
        ));

        // Nothing moved
        assert_eq!(ledger.balance(&[1u8; 32]), 100);
        assert_eq!(ledger.escrow_balance(&[9u8; 32]), 0);
    }

    #[test]
    fn test_settle_creates_receipt_and_pays() {
        let ledger = InMemoryLedger::new();
        ledger.deposit(&[1u8; 32], 1000).unwrap();
        ledger.fund_escrow(&[9u8; 32], &[1u8; 32], 1000).unwrap();

        ledger.settle(&[9u8; 32], &[2u8; 32], 300).unwrap();
        assert_eq!(ledger.balance(&[2u8; 32]), 300);
        assert_eq!(ledger.escrow_balance(&[9u8; 32]), 700);
        assert!(ledger.receipt_exists(&[9u8; 32], &[2u8; 32]));
    }

    #[test]
    fn test_settle_twice_fails_already_claimed() {
        let ledger = InMemoryLedger::new();
        ledger.deposit(&[1u8; 32], 1000).unwrap();
        ledger.fund_escrow(&[9u8; 32], &[1u8; 32], 1000).unwrap();

        ledger.settle(&[9u8; 32], &[2u8; 32], 300).unwrap();
        let err = ledger.settle(&[9u8; 32], &[2u8; 32], 300).unwrap_err();
        assert!(matches!(err, SettlementError::AlreadyClaimed));

        // Second attempt changed nothing
        assert_eq!(ledger.balance(&[2u8; 32]), 300);
        assert_eq!(ledger.escrow_balance(&[9u8; 32]), 700);
    }

    #[test]
    fn test_settle_insufficient_escrow_leaves_no_receipt() {
        let ledger = InMemoryLedger::new();
        ledger.deposit(&[1u8; 32], 100).unwrap();
        ledger.fund_escrow(&[9u8; 32], &[1u8; 32], 100).unwrap();

        let err = ledger.settle(&[9u8; 32], &[2u8; 32], 300).unwrap_err();
        assert!(matches!(
            err,
            SettlementError::InsufficientEscrow { need: 300, have: 100 }
        ));
        assert!(!ledger.receipt_exists(&[9u8; 32], &[2u8; 32]));
        assert_eq!(ledger.escrow_balance(&[9u8; 32]), 100);
    }

    #[test]
    fn test_racing_settles_exactly_one_winner() {
        let ledger = InMemoryLedger::new();
        ledger.deposit(&[1u8; 32], 1000).unwrap();
        ledger.fund_escrow(&[9u8; 32], &[1u8; 32], 1000).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.settle(&[9u8; 32], &[2u8; 32], 400))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let losses = results
            .iter()
            .filter(|r| matches!(r, Err(SettlementError::AlreadyClaimed)))
            .count();

        assert_eq!(wins, 1);
        assert_eq!(losses, 7);
        assert_eq!(ledger.balance(&[2u8; 32]), 400);
        assert_eq!(ledger.escrow_balance(&[9u8; 32]), 600);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let ledger = InMemoryLedger::new();
        ledger.deposit(&[1u8; 32], 1000).unwrap();
        ledger.fund_escrow(&[9u8; 32], &[1u8; 32], 600).unwrap();
        ledger.settle(&[9u8; 32], &[2u8; 32], 100).unwrap();

        let restored = InMemoryLedger::from_snapshot(ledger.snapshot());
        assert_eq!(restored.balance(&[1u8; 32]), 400);
        assert_eq!(restored.balance(&[2u8; 32]), 100);
        assert_eq!(restored.escrow_balance(&[9u8; 32]), 500);
        assert!(restored.receipt_exists(&[9u8; 32], &[2u8; 32]));
    }
}
