//! Merkledrop CLI
//!
//! Command-line interface for building distribution trees, extracting
//! proofs, and driving the settlement engine against a local state file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use merkledrop_core::{
    allocations_from_entries, entries_from_allocations, parse_hash32, Allocation, AllocationEntry,
    ProofBundle, Recipient,
};
use merkledrop_merkle::{verify_claim, MerkleTree};
use merkledrop_settlement::{
    commitment_id, load_state, save_state, InMemoryLedger, SettlementEngine,
};
use merkledrop_settings::Settings;

/// Merkledrop - Merkle-committed token distribution
#[derive(Parser)]
#[command(name = "merkledrop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file path (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the Merkle tree over a recipients file and print the root
    Root {
        /// Recipients file (JSON array of {recipient, amount, index})
        recipients: PathBuf,
    },

    /// Extract a proof bundle for one leaf of the recipients file
    Proof {
        /// Recipients file (JSON array of {recipient, amount, index})
        recipients: PathBuf,

        /// Leaf index to extract the proof for
        #[arg(short, long)]
        index: u64,

        /// Write the proof bundle here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a proof bundle offline, without touching settlement state
    Verify {
        /// Proof bundle file
        bundle: PathBuf,
    },

    /// Deposit funds into an account on the local ledger
    Fund {
        /// Account identifier, hex-encoded (64 hex chars)
        account: String,

        /// Amount to deposit
        amount: u64,
    },

    /// Initialize a commitment: escrow the full allocation under the root
    Init {
        /// Recipients file (JSON array of {recipient, amount, index})
        recipients: PathBuf,

        /// Issuer identity, hex-encoded (falls back to settings)
        #[arg(short, long)]
        issuer: Option<String>,
    },

    /// Claim against a commitment using a proof bundle
    Claim {
        /// Proof bundle file
        bundle: PathBuf,

        /// Issuer identity, hex-encoded (falls back to settings)
        #[arg(short, long)]
        issuer: Option<String>,
    },

    /// Show commitment and ledger status
    Status {
        /// Restrict to one commitment id, hex-encoded
        #[arg(short, long)]
        commitment: Option<String>,
    },

    /// Generate a random recipients file (for trying the tool out)
    Sample {
        /// Number of recipients to generate
        #[arg(short, long, default_value = "8")]
        count: usize,

        /// Output path
        #[arg(short, long, default_value = "recipients.json")]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "info,merkledrop=debug"
    } else {
        "warn,merkledrop=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load_or_default()?,
    };

    match cli.command {
        Commands::Root { recipients } => show_root(&recipients),
        Commands::Proof {
            recipients,
            index,
            output,
        } => extract_proof(&recipients, index, output.as_deref()),
        Commands::Verify { bundle } => verify_bundle(&bundle),
        Commands::Fund { account, amount } => fund(&settings, &account, amount),
        Commands::Init { recipients, issuer } => init_commitment(&settings, &recipients, issuer),
        Commands::Claim { bundle, issuer } => process_claim(&settings, &bundle, issuer),
        Commands::Status { commitment } => status(&settings, commitment),
        Commands::Sample { count, output } => generate_sample(count, &output),
    }
}

fn load_allocations(path: &std::path::Path) -> Result<Vec<Allocation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read recipients file {:?}", path))?;
    let entries: Vec<AllocationEntry> =
        serde_json::from_str(&content).context("Invalid recipients file")?;
    Ok(allocations_from_entries(&entries)?)
}

/// Open the settlement state, or start fresh when no file exists yet.
fn open_state(settings: &Settings) -> Result<(SettlementEngine, InMemoryLedger)> {
    let path = settings.state_path();
    if path.exists() {
        Ok(load_state(&path)?)
    } else {
        let ledger = InMemoryLedger::new();
        let engine = SettlementEngine::new(Box::new(ledger.clone()));
        Ok((engine, ledger))
    }
}

fn resolve_issuer(settings: &Settings, issuer: Option<String>) -> Result<Recipient> {
    let hex_str = match issuer.or_else(|| settings.distribution.issuer.clone()) {
        Some(s) => s,
        None => bail!("No issuer given; pass --issuer or set distribution.issuer in settings"),
    };
    Ok(parse_hash32(&hex_str)?)
}

fn show_root(recipients: &std::path::Path) -> Result<()> {
    let allocations = load_allocations(recipients)?;
    let tree = MerkleTree::build(&allocations)?;

    println!("Root:   {}", hex::encode(tree.root()));
    println!("Leaves: {}", tree.leaf_count());
    println!("Height: {}", tree.height());
    Ok(())
}

fn extract_proof(
    recipients: &std::path::Path,
    index: u64,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let allocations = load_allocations(recipients)?;
    let tree = MerkleTree::build(&allocations)?;
    let proof = tree.proof(index as usize)?;

    let allocation = allocations[index as usize];
    let bundle = ProofBundle::new(
        allocation.recipient,
        allocation.amount,
        index,
        tree.leaf_count() as u64,
        tree.root(),
        &proof.siblings,
    );
    let json = serde_json::to_string_pretty(&bundle)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write proof bundle {:?}", path))?;
            info!("Wrote proof for leaf {} to {:?}", index, path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn load_bundle(path: &std::path::Path) -> Result<ProofBundle> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read proof bundle {:?}", path))?;
    serde_json::from_str(&content).context("Invalid proof bundle")
}

fn verify_bundle(path: &std::path::Path) -> Result<()> {
    let bundle = load_bundle(path)?;
    let recipient = bundle.recipient_bytes()?;
    let root = bundle.root_bytes()?;
    let proof = bundle.proof_hashes()?;

    let valid = verify_claim(
        &recipient,
        bundle.amount,
        bundle.leaf_index,
        bundle.leaf_count,
        &proof,
        &root,
    );

    if valid {
        println!("Proof VALID for recipient {} amount {}", bundle.recipient, bundle.amount);
        Ok(())
    } else {
        bail!("Proof INVALID");
    }
}

fn fund(settings: &Settings, account: &str, amount: u64) -> Result<()> {
    let account = parse_hash32(account)?;
    let (engine, ledger) = open_state(settings)?;

    use merkledrop_settlement::HostLedger;
    ledger.deposit(&account, amount)?;
    save_state(&settings.state_path(), &engine, &ledger)?;

    println!(
        "Deposited {} to {} (balance now {})",
        amount,
        hex::encode(account),
        ledger.balance(&account)
    );
    Ok(())
}

fn init_commitment(
    settings: &Settings,
    recipients: &std::path::Path,
    issuer: Option<String>,
) -> Result<()> {
    let issuer = resolve_issuer(settings, issuer)?;
    let allocations = load_allocations(recipients)?;
    let tree = MerkleTree::build(&allocations)?;

    let mut total: u64 = 0;
    for a in &allocations {
        total = total
            .checked_add(a.amount)
            .context("Allocation total overflows u64")?;
    }

    let (mut engine, ledger) = open_state(settings)?;
    let id = engine.initialize(issuer, tree.root(), tree.leaf_count() as u64, total)?;
    save_state(&settings.state_path(), &engine, &ledger)?;

    println!("Commitment: {}", hex::encode(id));
    println!("Root:       {}", hex::encode(tree.root()));
    println!("Leaves:     {}", tree.leaf_count());
    println!("Escrowed:   {}", total);
    Ok(())
}

fn process_claim(
    settings: &Settings,
    bundle_path: &std::path::Path,
    issuer: Option<String>,
) -> Result<()> {
    let issuer = resolve_issuer(settings, issuer)?;
    let bundle = load_bundle(bundle_path)?;

    let recipient = bundle.recipient_bytes()?;
    let root = bundle.root_bytes()?;
    let proof = bundle.proof_hashes()?;
    let id = commitment_id(&issuer, &root);

    let (mut engine, ledger) = open_state(settings)?;
    engine.claim(&id, &recipient, bundle.amount, bundle.leaf_index, &proof)?;
    save_state(&settings.state_path(), &engine, &ledger)?;

    use merkledrop_settlement::HostLedger;
    println!(
        "Claimed {} for {} (balance now {})",
        bundle.amount,
        bundle.recipient,
        ledger.balance(&recipient)
    );
    Ok(())
}

fn status(settings: &Settings, commitment: Option<String>) -> Result<()> {
    let (engine, ledger) = open_state(settings)?;
    use merkledrop_settlement::HostLedger;

    let filter = commitment.map(|s| parse_hash32(&s)).transpose()?;

    println!("Merkledrop Status");
    println!("=================");
    println!("State file:  {:?}", settings.state_path());
    println!("Commitments: {}", engine.commitment_count());

    for (id, state) in engine.commitments() {
        if let Some(wanted) = filter {
            if *id != wanted {
                continue;
            }
        }
        println!();
        println!("Commitment {}", hex::encode(id));
        println!("  Root:      {}", hex::encode(state.root));
        println!("  Issuer:    {}", hex::encode(state.issuer));
        println!("  Leaves:    {}", state.leaf_count);
        println!("  Allocated: {}", state.total_allocated);
        println!("  Settled:   {}", state.total_settled);
        println!("  Escrow:    {}", ledger.escrow_balance(id));
    }
    Ok(())
}

fn generate_sample(count: usize, output: &std::path::Path) -> Result<()> {
    if count == 0 {
        bail!("Sample needs at least one recipient");
    }

    let mut rng = rand::thread_rng();
    let allocations: Vec<Allocation> = (0..count)
        .map(|_| {
            let mut recipient = [0u8; 32];
            rng.fill_bytes(&mut recipient);
            let amount = (rng.next_u32() % 10_000) as u64 + 1;
            Allocation::new(recipient, amount)
        })
        .collect();

    let entries = entries_from_allocations(&allocations);
    let json = serde_json::to_string_pretty(&entries)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write recipients file {:?}", output))?;

    println!("Wrote {} recipients to {:?}", count, output);
    Ok(())
}
