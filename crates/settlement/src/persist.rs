//! Settlement state persistence.
//!
//! Commitment state and the in-memory ledger serialize to one JSON file
//! with hex-encoded identifiers. Writes go through a temp file and an
//! atomic rename so a crash never leaves a half-written state file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use merkledrop_core::parse_hash32;

use crate::engine::{CommitmentId, CommitmentState, SettlementEngine};
use crate::host::{InMemoryLedger, LedgerSnapshot};
use crate::{Result, SettlementError};

#[derive(Serialize, Deserialize)]
struct CommitmentStateFile {
    root: String,
    issuer: String,
    leaf_count: u64,
    total_allocated: u64,
    total_settled: u64,
}

#[derive(Serialize, Deserialize)]
struct ReceiptEntry {
    commitment: String,
    recipient: String,
}

#[derive(Serialize, Deserialize)]
struct SettlementStateFile {
    commitments: HashMap<String, CommitmentStateFile>,
    balances: HashMap<String, u64>,
    escrows: HashMap<String, u64>,
    receipts: Vec<ReceiptEntry>,
}

/// Write engine and ledger state to `path`.
pub fn save_state(path: &Path, engine: &SettlementEngine, ledger: &InMemoryLedger) -> Result<()> {
    let snapshot = ledger.snapshot();

    let file = SettlementStateFile {
        commitments: engine
            .commitments()
            .map(|(id, state)| {
                (
                    hex::encode(id),
                    CommitmentStateFile {
                        root: hex::encode(state.root),
                        issuer: hex::encode(state.issuer),
                        leaf_count: state.leaf_count,
                        total_allocated: state.total_allocated,
                        total_settled: state.total_settled,
                    },
                )
            })
            .collect(),
        balances: snapshot
            .balances
            .iter()
            .map(|(account, amount)| (hex::encode(account), *amount))
            .collect(),
        escrows: snapshot
            .escrows
            .iter()
            .map(|(id, amount)| (hex::encode(id), *amount))
            .collect(),
        receipts: snapshot
            .receipts
            .iter()
            .map(|(id, recipient)| ReceiptEntry {
                commitment: hex::encode(id),
                recipient: hex::encode(recipient),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| SettlementError::StateFormat(e.to_string()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    info!(
        "Saved settlement state: {} commitments, {} receipts",
        file.commitments.len(),
        file.receipts.len()
    );
    Ok(())
}

/// Load engine and ledger state from `path`.
///
/// The returned ledger handle shares state with the engine's, so callers
/// can inspect balances directly.
pub fn load_state(path: &Path) -> Result<(SettlementEngine, InMemoryLedger)> {
    let json = fs::read_to_string(path)?;
    let file: SettlementStateFile =
        serde_json::from_str(&json).map_err(|e| SettlementError::StateFormat(e.to_string()))?;

    let mut commitments: HashMap<CommitmentId, CommitmentState> = HashMap::new();
    for (id_hex, state) in &file.commitments {
        let id = decode_id(id_hex)?;
        commitments.insert(
            id,
            CommitmentState {
                root: decode_id(&state.root)?,
                issuer: decode_id(&state.issuer)?,
                leaf_count: state.leaf_count,
                total_allocated: state.total_allocated,
                total_settled: state.total_settled,
            },
        );
    }

    let mut snapshot = LedgerSnapshot::default();
    for (account, amount) in &file.balances {
        snapshot.balances.push((decode_id(account)?, *amount));
    }
    for (id, amount) in &file.escrows {
        snapshot.escrows.push((decode_id(id)?, *amount));
    }
    for entry in &file.receipts {
        snapshot
            .receipts
            .push((decode_id(&entry.commitment)?, decode_id(&entry.recipient)?));
    }

    let ledger = InMemoryLedger::from_snapshot(snapshot);
    let engine = SettlementEngine::from_parts(commitments, Box::new(ledger.clone()));

    info!(
        "Loaded settlement state: {} commitments from {}",
        engine.commitment_count(),
        path.display()
    );
    Ok((engine, ledger))
}

fn decode_id(hex_str: &str) -> Result<[u8; 32]> {
    parse_hash32(hex_str).map_err(|e| SettlementError::StateFormat(e.to_string()))
}
