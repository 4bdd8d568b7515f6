//! # Rootstore Binary
//!
//! Operator entry point: parses arguments, sets up logging and dispatches to
//! the `cli` command functions.

use clap::{ArgGroup, Args, Parser, Subcommand};
use rootstore::cli::{self, TermsArg};
use rootstore::rootstore_core::BatchId;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rootstore", version, about = "Merkle root registry")]
struct Cli {
    /// Path to the redb store.
    #[arg(long, global = true, env = "ROOTSTORE_STORE", default_value = "rootstore.redb")]
    store: PathBuf,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Entry key, by hex or by name.
#[derive(Args, Debug)]
struct IdxArg {
    /// Batch key (64 hex digits), or a label with --name.
    #[arg(long)]
    idx: String,

    /// Hash --idx as a batch name instead of parsing hex.
    #[arg(long)]
    name: bool,
}

impl IdxArg {
    fn resolve(&self) -> Result<BatchId, String> {
        cli::parse_idx(&self.idx, self.name)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy a new registry.
    Init {
        #[arg(long)]
        upgrade_admin: String,
        #[arg(long)]
        operational_admin: String,
        /// Logic version to start with.
        #[arg(long, default_value = "2.0.0")]
        logic: String,
        /// Overwrite an existing store.
        #[arg(long)]
        force: bool,
    },

    /// Submit a new Merkle root.
    #[command(group(ArgGroup::new("terms").required(true).args(["lock_at", "lock_in", "data_ref"])))]
    Submit {
        #[arg(long)]
        caller: String,
        #[command(flatten)]
        idx: IdxArg,
        /// Merkle root (64 hex digits).
        #[arg(long)]
        root: String,
        #[arg(long)]
        metadata: String,
        /// Absolute lock time, seconds since epoch.
        #[arg(long)]
        lock_at: Option<u64>,
        /// Lock this many seconds from now.
        #[arg(long)]
        lock_in: Option<u64>,
        /// Data reference (logic 1.0.0).
        #[arg(long)]
        data_ref: Option<String>,
    },

    /// Replace the metadata of an open entry.
    Update {
        #[arg(long)]
        caller: String,
        #[command(flatten)]
        idx: IdxArg,
        #[arg(long)]
        metadata: String,
        /// Move the lock time.
        #[arg(long)]
        lock_at: Option<u64>,
    },

    /// Freeze an entry now.
    Lock {
        #[arg(long)]
        caller: String,
        #[command(flatten)]
        idx: IdxArg,
    },

    /// Show one entry.
    Get {
        #[command(flatten)]
        idx: IdxArg,
    },

    /// Number of entries.
    Count,

    /// Active logic version.
    Version,

    /// Check a role membership.
    HasRole {
        /// operational | upgrade
        #[arg(long)]
        role: String,
        #[arg(long)]
        account: String,
    },

    /// Swap the active logic version.
    Upgrade {
        #[arg(long)]
        caller: String,
        #[arg(long)]
        to: String,
    },

    /// Show the audit journal.
    Events,

    /// Serve read-only HTTP.
    Serve {
        #[arg(long, env = "ROOTSTORE_ADDR", default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

fn run(cli: Cli) -> Result<(), String> {
    let store = cli.store.as_path();
    let json = cli.json;

    match cli.command {
        Command::Init {
            upgrade_admin,
            operational_admin,
            logic,
            force,
        } => cli::cmd_init(store, &upgrade_admin, &operational_admin, &logic, force, json),
        Command::Submit {
            caller,
            idx,
            root,
            metadata,
            lock_at,
            lock_in,
            data_ref,
        } => {
            let terms = match (lock_at, lock_in, data_ref) {
                (Some(at), _, _) => TermsArg::LockAt(at),
                (None, Some(secs), _) => TermsArg::LockIn(secs),
                (None, None, Some(data_ref)) => TermsArg::DataRef(data_ref),
                (None, None, None) => {
                    return Err("One of --lock-at, --lock-in or --data-ref is required".into());
                }
            };
            cli::cmd_submit(store, json, &caller, idx.resolve()?, &root, &metadata, terms)
        }
        Command::Update {
            caller,
            idx,
            metadata,
            lock_at,
        } => cli::cmd_update(store, json, &caller, idx.resolve()?, &metadata, lock_at),
        Command::Lock { caller, idx } => cli::cmd_lock(store, json, &caller, idx.resolve()?),
        Command::Get { idx } => cli::cmd_get(store, json, idx.resolve()?),
        Command::Count => cli::cmd_count(store, json),
        Command::Version => cli::cmd_version(store, json),
        Command::HasRole { role, account } => cli::cmd_has_role(store, json, &role, &account),
        Command::Upgrade { caller, to } => cli::cmd_upgrade(store, json, &caller, &to),
        Command::Events => cli::cmd_events(store, json),
        Command::Serve { addr } => cli::cmd_serve(store, addr),
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rootstore=info,rootstore_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
