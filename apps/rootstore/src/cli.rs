//! # CLI Commands
//!
//! One `cmd_*` function per subcommand. Each opens the redb store, performs
//! one registry operation and prints the result, as text or as JSON when
//! `json` is set. Errors come back as display strings for `main` to print.

use crate::api;
use crate::deployments::AddressBook;
use rootstore_core::{
    AccessControl, BatchId, EntryRecord, LogicVersion, MerkleRoot, Principal, ProxyState,
    RedbStore, Registry, RegistryEvent, Role, Submission, SystemClock, Timestamp,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// ARGUMENT HELPERS
// =============================================================================

/// How a new entry is bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermsArg {
    /// Lock at an absolute time (seconds since epoch).
    LockAt(u64),
    /// Lock this many seconds from now.
    LockIn(u64),
    /// Referenced entry with a data URL.
    DataRef(String),
}

/// Parse `--idx`: 64 hex digits, or a label hashed with BLAKE3 when
/// `by_name` is set.
pub fn parse_idx(raw: &str, by_name: bool) -> Result<BatchId, String> {
    if by_name {
        return Ok(BatchId::from_name(raw));
    }
    raw.parse()
        .map_err(|e| format!("Invalid idx '{}': {}", raw, e))
}

fn parse_principal(raw: &str, flag: &str) -> Result<Principal, String> {
    raw.parse()
        .map_err(|e| format!("Invalid {} '{}': {}", flag, raw, e))
}

fn parse_root(raw: &str) -> Result<MerkleRoot, String> {
    raw.parse()
        .map_err(|e| format!("Invalid root '{}': {}", raw, e))
}

fn parse_version(raw: &str) -> Result<LogicVersion, String> {
    raw.parse().map_err(|e| format!("{}", e))
}

/// Open an initialized registry at `store`.
pub fn open_registry(store: &Path) -> Result<Registry<RedbStore>, String> {
    if !store.exists() {
        return Err(format!(
            "No store at {}. Run 'rootstore init' first.",
            store.display()
        ));
    }
    let storage = RedbStore::open(store)
        .map_err(|e| format!("Failed to open store {}: {}", store.display(), e))?;
    Registry::open(storage, Arc::new(SystemClock)).map_err(|e| e.to_string())
}

fn print_json(value: &serde_json::Value) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize output: {}", e))?;
    println!("{}", text);
    Ok(())
}

fn print_event(event: &RegistryEvent, json: bool) -> Result<(), String> {
    if json {
        let value =
            serde_json::to_value(event).map_err(|e| format!("Failed to serialize event: {}", e))?;
        return print_json(&value);
    }
    match event {
        RegistryEvent::RootSubmitted { idx, merkle_root, .. } => {
            println!("Submitted {} (root {})", idx, merkle_root);
        }
        RegistryEvent::MetadataModified { idx, lock_at, .. } => {
            println!("Modified {} (lock at {})", idx, lock_at);
        }
        RegistryEvent::LogicUpgraded { from, to } => {
            println!("Upgraded logic {} -> {}", from, to);
        }
    }
    Ok(())
}

fn record_deployment(store: &Path, state: &ProxyState) -> Result<(), String> {
    let path = AddressBook::path_for(store);

    let mut book = AddressBook::load(&path)?;
    book.set("registry", store.display().to_string());
    book.set("registry_address", state.address.to_string());
    book.set("logic", state.active.as_str());
    book.set("upgrade_admin", state.upgrade_admin.to_string());
    book.set("operational_admin", state.operational_admin.to_string());
    book.save(&path)?;

    debug!(path = %path.display(), "address book updated");
    Ok(())
}

// =============================================================================
// INIT
// =============================================================================

/// Address a registry deployed at `store` answers to.
pub fn registry_address(store: &Path) -> Principal {
    Principal::from_label(&store.display().to_string())
}

/// Sibling path a new store is built at before it replaces `store`.
fn staging_path(store: &Path) -> PathBuf {
    let mut name = store.as_os_str().to_owned();
    name.push(".init");
    PathBuf::from(name)
}

/// Build and initialize a registry at `path`, returning its deployment
/// record. The database is closed again on return.
fn deploy_at(
    path: &Path,
    address: Principal,
    version: LogicVersion,
    upgrade_admin: Principal,
    operational_admin: Principal,
) -> Result<ProxyState, String> {
    let storage = RedbStore::open(path)
        .map_err(|e| format!("Failed to create store {}: {}", path.display(), e))?;
    let registry = Registry::initialize(
        storage,
        Arc::new(SystemClock),
        address,
        version,
        upgrade_admin,
        operational_admin,
    )
    .map_err(|e| e.to_string())?;
    Ok(registry.proxy_state())
}

/// Deploy a fresh registry at `store`.
///
/// The new store is built next to `store` and only moved into place once it
/// is fully initialized, so a failed init leaves an existing store intact.
pub fn cmd_init(
    store: &Path,
    upgrade_admin: &str,
    operational_admin: &str,
    logic: &str,
    force: bool,
    json: bool,
) -> Result<(), String> {
    let upgrade_admin = parse_principal(upgrade_admin, "upgrade admin")?;
    let operational_admin = parse_principal(operational_admin, "operational admin")?;
    let version = parse_version(logic)?;
    AccessControl::new(upgrade_admin, operational_admin).map_err(|e| e.to_string())?;

    if store.exists() && !force {
        return Err(format!(
            "Store already exists at {}. Use --force to overwrite.",
            store.display()
        ));
    }

    let staging = staging_path(store);
    if staging.exists() {
        std::fs::remove_file(&staging)
            .map_err(|e| format!("Failed to remove {}: {}", staging.display(), e))?;
    }

    let address = registry_address(store);
    let state = match deploy_at(&staging, address, version, upgrade_admin, operational_admin) {
        Ok(state) => state,
        Err(e) => {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
    };

    if store.exists() {
        warn!(path = %store.display(), "overwriting existing store");
    }
    std::fs::rename(&staging, store).map_err(|e| {
        let _ = std::fs::remove_file(&staging);
        format!("Failed to move new store into {}: {}", store.display(), e)
    })?;
    record_deployment(store, &state)?;

    info!(path = %store.display(), version = %version, "registry initialized");
    if json {
        print_json(&json!({
            "store": store.display().to_string(),
            "address": address.to_string(),
            "version": version.as_str(),
            "upgrade_admin": upgrade_admin.to_string(),
            "operational_admin": operational_admin.to_string(),
        }))
    } else {
        println!(
            "Initialized registry {} at {} (logic {})",
            address,
            store.display(),
            version
        );
        Ok(())
    }
}

// =============================================================================
// WRITE COMMANDS
// =============================================================================

/// Submit a new entry.
pub fn cmd_submit(
    store: &Path,
    json: bool,
    caller: &str,
    idx: BatchId,
    root: &str,
    metadata: &str,
    terms: TermsArg,
) -> Result<(), String> {
    let caller = parse_principal(caller, "caller")?;
    let root = parse_root(root)?;
    let registry = open_registry(store)?;

    let submission = match terms {
        TermsArg::LockAt(secs) => {
            Submission::time_locked(idx, root, metadata, Timestamp::from_secs(secs))
        }
        TermsArg::LockIn(secs) => {
            Submission::time_locked(idx, root, metadata, registry.now().saturating_add(secs))
        }
        TermsArg::DataRef(data_ref) => Submission::referenced(idx, root, metadata, data_ref),
    };

    let event = registry.submit(caller, submission).map_err(|e| {
        warn!(idx = %idx, error = %e, "submit rejected");
        e.to_string()
    })?;
    info!(idx = %idx, "root submitted");
    print_event(&event, json)
}

/// Replace the metadata of an open entry.
pub fn cmd_update(
    store: &Path,
    json: bool,
    caller: &str,
    idx: BatchId,
    metadata: &str,
    lock_at: Option<u64>,
) -> Result<(), String> {
    let caller = parse_principal(caller, "caller")?;
    let registry = open_registry(store)?;

    let event = registry
        .update_metadata(caller, idx, metadata, lock_at.map(Timestamp::from_secs))
        .map_err(|e| {
            warn!(idx = %idx, error = %e, "update rejected");
            e.to_string()
        })?;
    info!(idx = %idx, "metadata updated");
    print_event(&event, json)
}

/// Freeze an entry now.
pub fn cmd_lock(store: &Path, json: bool, caller: &str, idx: BatchId) -> Result<(), String> {
    let caller = parse_principal(caller, "caller")?;
    let registry = open_registry(store)?;

    let event = registry.lock(caller, idx).map_err(|e| {
        warn!(idx = %idx, error = %e, "lock rejected");
        e.to_string()
    })?;
    info!(idx = %idx, "entry locked");
    print_event(&event, json)
}

/// Swap the active logic version.
pub fn cmd_upgrade(store: &Path, json: bool, caller: &str, to: &str) -> Result<(), String> {
    let caller = parse_principal(caller, "caller")?;
    let target = parse_version(to)?;
    let registry = open_registry(store)?;

    let event = registry.upgrade_to(caller, target).map_err(|e| {
        warn!(target = %target, error = %e, "upgrade rejected");
        e.to_string()
    })?;
    record_deployment(store, &registry.proxy_state())?;
    info!(version = %target, "logic upgraded");
    print_event(&event, json)
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Print one entry.
pub fn cmd_get(store: &Path, json: bool, idx: BatchId) -> Result<(), String> {
    let registry = open_registry(store)?;
    let record = registry.get(&idx).map_err(|e| e.to_string())?;
    debug!(idx = %idx, "entry read");

    if json {
        let view = api::EntryView::new(idx, &record, registry.now());
        let value =
            serde_json::to_value(view).map_err(|e| format!("Failed to serialize entry: {}", e))?;
        return print_json(&value);
    }

    println!("Entry {}", idx);
    println!("  Root:     {}", record.merkle_root());
    println!("  Metadata: {}", record.metadata());
    match &record {
        EntryRecord::TimeLocked { lock_at, .. } => {
            let state = if record.is_frozen_at(registry.now()) {
                "frozen"
            } else {
                "open"
            };
            println!("  Lock at:  {} ({})", lock_at, state);
        }
        EntryRecord::Referenced { data_ref, .. } => {
            println!("  Data ref: {}", data_ref);
        }
    }
    Ok(())
}

/// Print the number of entries.
pub fn cmd_count(store: &Path, json: bool) -> Result<(), String> {
    let registry = open_registry(store)?;
    let count = registry.count().map_err(|e| e.to_string())?;

    if json {
        print_json(&json!({ "count": count }))
    } else {
        println!("{}", count);
        Ok(())
    }
}

/// Print the active logic version.
pub fn cmd_version(store: &Path, json: bool) -> Result<(), String> {
    let registry = open_registry(store)?;
    let version = registry.version();

    if json {
        print_json(&json!({ "version": version.as_str() }))
    } else {
        println!("{}", version);
        Ok(())
    }
}

/// Print whether `account` holds `role`.
pub fn cmd_has_role(store: &Path, json: bool, role: &str, account: &str) -> Result<(), String> {
    let role: Role = role.parse()?;
    let account = parse_principal(account, "account")?;
    let registry = open_registry(store)?;
    let held = registry.has_role(role, account);

    if json {
        print_json(&json!({
            "role": role.name(),
            "account": account.to_string(),
            "has_role": held,
        }))
    } else {
        println!("{}", held);
        Ok(())
    }
}

/// Print the audit journal.
pub fn cmd_events(store: &Path, json: bool) -> Result<(), String> {
    let registry = open_registry(store)?;
    let events = registry.events().map_err(|e| e.to_string())?;

    if json {
        let value =
            serde_json::to_value(&events).map_err(|e| format!("Failed to serialize events: {}", e))?;
        return print_json(&value);
    }

    if events.is_empty() {
        println!("No events recorded.");
    }
    for record in &events {
        let subject = record
            .event
            .idx()
            .map(|idx| idx.to_string())
            .unwrap_or_default();
        println!(
            "#{:<4} {:>10}  {:<18} {}",
            record.sequence,
            record.at.as_secs(),
            record.event.name(),
            subject
        );
    }
    Ok(())
}

// =============================================================================
// SERVE
// =============================================================================

/// Run the read-only HTTP endpoint until Ctrl-C.
pub fn cmd_serve(store: &Path, addr: SocketAddr) -> Result<(), String> {
    let registry = Arc::new(open_registry(store)?);
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
        info!(addr = %addr, store = %store.display(), "read-only endpoint listening");

        axum::serve(listener, api::router(registry))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutting down");
            })
            .await
            .map_err(|e| format!("Server error: {}", e))
    })
}
