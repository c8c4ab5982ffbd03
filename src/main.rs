//! ledger-preimage command line
//!
//! Derives and validates addresses, estimates fees, builds signing
//! preimages and assembles signed transactions from JSON files. Signatures
//! are produced elsewhere and passed back as hex.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use ledger_preimage::fees::{estimate_fees, FeeRequest};
use ledger_preimage::signing::preimage::RawSignature;
use ledger_preimage::tx::{
    BuildSession, LedgerBuilder, PreparedTransaction, PresignedSigner, TransactionBuilder,
    WalletSnapshot,
};
use ledger_preimage::types::{Chain, TransactionIntent};
use ledger_preimage::utils::logging;
use ledger_preimage::utils::network_config::NetworkConfig;
use ledger_preimage::wallet::{derive_address, validate_address, AddressFormat};
use ledger_preimage::{log_debug, log_info};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const MODULE: &str = "cli";

#[derive(Clone, Debug, Parser)]
#[command(name = "ledger-preimage", version, about)]
struct Args {
    /// Network parameter overrides (JSON)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[clap(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    action: Actions,
}

#[derive(Clone, Debug, Subcommand)]
enum Actions {
    /// Derive the receive address of a public key
    Address {
        chain: Chain,
        /// Public key, hex
        public_key: String,
        /// Cardano Byron chain code, hex
        #[clap(long)]
        chain_code: Option<String>,
        #[clap(long, value_enum, default_value_t = AddressFormat::Default)]
        format: AddressFormat,
    },

    /// Validate an address; exits with status 2 when it is invalid
    Validate { chain: Chain, address: String },

    /// Compute fee levels from a fee request file
    Fee { request: PathBuf },

    /// Build signing preimages from a build request file
    Prepare { request: PathBuf },

    /// Assemble a prepared transaction with signatures, one hex string per preimage
    Assemble {
        prepared: PathBuf,
        #[clap(required = true)]
        signatures: Vec<String>,
    },
}

/// Input of `prepare`
#[derive(Clone, Debug, Serialize, Deserialize)]
struct BuildRequest {
    chain: Chain,
    wallet: WalletSnapshot,
    intent: TransactionIntent,
}

/// Output of `prepare`, input of `assemble`
#[derive(Clone, Debug, Serialize, Deserialize)]
struct PreparedFile {
    wallet: WalletSnapshot,
    prepared: PreparedTransaction,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing '{}'", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn decode_hex(value: &str, what: &str) -> anyhow::Result<Vec<u8>> {
    let trimmed = value.trim();
    hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .with_context(|| format!("{} is not hex", what))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    if args.debug {
        logging::enable_debug();
    }

    let config = match &args.config {
        Some(path) => NetworkConfig::load(path)
            .with_context(|| format!("loading config '{}'", path.display()))?,
        None => NetworkConfig::new(),
    };

    match args.action {
        Actions::Address {
            chain,
            public_key,
            chain_code,
            format,
        } => {
            let key = decode_hex(&public_key, "public key")?;
            let chain_code = chain_code
                .map(|c| -> anyhow::Result<[u8; 32]> {
                    decode_hex(&c, "chain code")?
                        .try_into()
                        .map_err(|_| anyhow!("chain code must be 32 bytes"))
                })
                .transpose()?;
            let derived = derive_address(chain, &config, &key, chain_code.as_ref(), format)?;
            print_json(&derived)?;
        }
        Actions::Validate { chain, address } => {
            let validation = validate_address(&address, chain, &config);
            print_json(&validation)?;
            if !validation.is_valid {
                return Ok(ExitCode::from(2));
            }
        }
        Actions::Fee { request } => {
            let request: FeeRequest = read_json(&request)?;
            print_json(&estimate_fees(&request, &config)?)?;
        }
        Actions::Prepare { request } => {
            let request: BuildRequest = read_json(&request)?;
            let builder = LedgerBuilder::for_chain(request.chain, &config, &request.wallet)?;
            let prepared = builder.build_preimage(&request.intent)?;
            log_info!(
                MODULE,
                "preimages ready",
                chain = request.chain,
                count = prepared.preimages.len()
            );
            print_json(&PreparedFile {
                wallet: request.wallet,
                prepared,
            })?;
        }
        Actions::Assemble {
            prepared,
            signatures,
        } => {
            let file: PreparedFile = read_json(&prepared)?;
            let signatures = signatures
                .iter()
                .map(|s| Ok(RawSignature::from_slice(&decode_hex(s, "signature")?)?))
                .collect::<anyhow::Result<Vec<_>>>()?;
            log_debug!(MODULE, "assembling", chain = file.prepared.chain, signatures = signatures.len());

            let builder = LedgerBuilder::for_chain(file.prepared.chain, &config, &file.wallet)?;
            let mut session = BuildSession::resume(builder, file.prepared);
            session
                .collect_signatures(&PresignedSigner::new(signatures))
                .await?;
            let signed = session.complete()?;
            print_json(&signed)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
