use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hookset::{
    hooks::{effective_parameters, HookHash, HookOn, Namespace},
    LedgerState, ProtocolConfig, SetHookProcessor, SetHookTransaction, TxResult,
};

#[derive(Parser)]
#[command(name = "hookset")]
#[command(about = "Install hooks and manage hook state on a ledger snapshot")]
struct Cli {
    /// Protocol parameters (TOML); defaults apply when omitted
    #[arg(long, global = true, env = "HOOKSET_CONFIG")]
    config: Option<PathBuf>,

    /// Ledger snapshot file
    #[arg(long, global = true, default_value = "ledger.json")]
    ledger: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write an empty ledger snapshot
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Credit an account, creating it if needed
    Fund { account: String, drops: u64 },
    /// Apply a SetHook transaction read from a JSON file
    Submit {
        tx: PathBuf,
        /// Validate only; the ledger file is left untouched
        #[arg(long)]
        dry_run: bool,
    },
    /// Write one hook state entry (hex key and value, empty value deletes)
    StateSet {
        account: String,
        namespace: Namespace,
        key: String,
        #[arg(default_value = "")]
        value: String,
    },
    /// Read one hook state entry
    StateGet {
        account: String,
        namespace: Namespace,
        key: String,
    },
    /// List an account's hook state, optionally for one namespace
    StateList {
        account: String,
        #[arg(long)]
        namespace: Option<Namespace>,
    },
    /// Print an account's hook slot table
    Hooks {
        account: String,
        /// Also report which slots fire for this transaction type
        #[arg(long)]
        tx_type: Option<u16>,
    },
    /// Print the ledger state root
    Root,
}

#[derive(Serialize)]
struct SlotView {
    hook_hash: HookHash,
    namespace: Namespace,
    hook_on: HookOn,
    /// Effective parameters, hex name to hex value.
    parameters: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct HooksView {
    account: String,
    capacity: usize,
    slots: Vec<Option<SlotView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triggered: Option<Vec<usize>>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_ledger(path: &Path) -> Result<LedgerState> {
    let raw = fs::read(path).with_context(|| format!("read ledger {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("parse ledger {}", path.display()))
}

fn save_ledger(path: &Path, ledger: &LedgerState) -> Result<()> {
    let json = serde_json::to_vec_pretty(ledger)?;
    fs::write(path, json).with_context(|| format!("write ledger {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn decode_hex_arg(name: &str, raw: &str) -> Result<Vec<u8>> {
    hex::decode(raw.trim()).with_context(|| format!("{name} must be hex"))
}

fn init_cmd(ledger_path: &Path, config: &ProtocolConfig, force: bool) -> Result<()> {
    if ledger_path.exists() && !force {
        bail!("{} already exists (use --force)", ledger_path.display());
    }
    save_ledger(ledger_path, &LedgerState::new(config))?;
    info!(ledger = %ledger_path.display(), "ledger initialised");
    Ok(())
}

fn fund_cmd(ledger_path: &Path, account: String, drops: u64) -> Result<()> {
    let mut ledger = load_ledger(ledger_path)?;
    ledger.fund_account(&account, drops)?;
    save_ledger(ledger_path, &ledger)?;
    info!(%account, drops, "account funded");
    Ok(())
}

fn submit_cmd(
    ledger_path: &Path,
    config: ProtocolConfig,
    tx_path: &Path,
    dry_run: bool,
) -> Result<bool> {
    let mut ledger = load_ledger(ledger_path)?;
    let raw = fs::read(tx_path).with_context(|| format!("read tx {}", tx_path.display()))?;
    let tx: SetHookTransaction = serde_json::from_slice(&raw)
        .with_context(|| format!("parse tx {}", tx_path.display()))?;
    let processor = SetHookProcessor::new(config);

    let result = if dry_run {
        TxResult::from(&processor.validate(&tx, &ledger))
    } else {
        let result = processor.submit(&tx, &mut ledger);
        if result.is_success() {
            save_ledger(ledger_path, &ledger)?;
        }
        result
    };
    print_json(&result)?;
    Ok(result.is_success())
}

fn state_set_cmd(
    ledger_path: &Path,
    config: &ProtocolConfig,
    account: String,
    namespace: Namespace,
    key: &str,
    value: &str,
) -> Result<()> {
    let mut ledger = load_ledger(ledger_path)?;
    let key = decode_hex_arg("key", key)?;
    let value = decode_hex_arg("value", value)?;
    let change = ledger.write_hook_state(config, &account, namespace, &key, &value)?;
    save_ledger(ledger_path, &ledger)?;
    info!(%account, %namespace, ?change, "hook state written");
    Ok(())
}

fn state_get_cmd(ledger_path: &Path, account: String, namespace: Namespace, key: &str) -> Result<()> {
    let ledger = load_ledger(ledger_path)?;
    let key = decode_hex_arg("key", key)?;
    let value = ledger
        .state
        .get(&account, &namespace, &key)
        .map(hex::encode_upper);
    print_json(&value)
}

fn state_list_cmd(
    ledger_path: &Path,
    account: String,
    namespace: Option<Namespace>,
) -> Result<()> {
    let ledger = load_ledger(ledger_path)?;
    let namespaces = match namespace {
        Some(namespace) => vec![namespace],
        None => ledger.state.namespaces(&account),
    };
    let listing: BTreeMap<String, BTreeMap<String, String>> = namespaces
        .iter()
        .map(|namespace| {
            let entries = ledger
                .state
                .namespace_entries(&account, namespace)
                .into_iter()
                .map(|(key, value)| {
                    (hex::encode_upper(key.as_bytes()), hex::encode_upper(&value.0))
                })
                .collect();
            (namespace.to_hex(), entries)
        })
        .collect();
    print_json(&listing)
}

fn hooks_cmd(ledger_path: &Path, account: String, tx_type: Option<u16>) -> Result<()> {
    let ledger = load_ledger(ledger_path)?;
    let table = ledger.hooks.table(&account);
    let slots = table
        .slots()
        .iter()
        .map(|slot| {
            slot.as_ref().map(|reference| {
                let defaults = ledger
                    .definitions
                    .get(&reference.hook_hash)
                    .map(|d| d.parameters.as_slice())
                    .unwrap_or_default();
                let parameters = effective_parameters(defaults, &reference.parameters)
                    .into_iter()
                    .map(|(name, value)| (hex::encode_upper(name), hex::encode_upper(value)))
                    .collect();
                SlotView {
                    hook_hash: reference.hook_hash,
                    namespace: reference.namespace,
                    hook_on: reference.hook_on,
                    parameters,
                }
            })
        })
        .collect();
    let triggered = tx_type.map(|tx_type| {
        table
            .triggered_by(tx_type)
            .into_iter()
            .map(|(index, _)| index)
            .collect()
    });
    print_json(&HooksView {
        account,
        capacity: ledger.hooks.capacity(),
        slots,
        triggered,
    })
}

fn root_cmd(ledger_path: &Path) -> Result<()> {
    let ledger = load_ledger(ledger_path)?;
    println!("{}", hex::encode(ledger.state_root()));
    Ok(())
}

fn run(cli: Cli) -> Result<bool> {
    let config = ProtocolConfig::load_or_default(cli.config.as_deref())?;
    let ledger = cli.ledger.as_path();
    match cli.command {
        Command::Init { force } => init_cmd(ledger, &config, force)?,
        Command::Fund { account, drops } => fund_cmd(ledger, account, drops)?,
        Command::Submit { tx, dry_run } => return submit_cmd(ledger, config, &tx, dry_run),
        Command::StateSet {
            account,
            namespace,
            key,
            value,
        } => state_set_cmd(ledger, &config, account, namespace, &key, &value)?,
        Command::StateGet {
            account,
            namespace,
            key,
        } => state_get_cmd(ledger, account, namespace, &key)?,
        Command::StateList { account, namespace } => state_list_cmd(ledger, account, namespace)?,
        Command::Hooks { account, tx_type } => hooks_cmd(ledger, account, tx_type)?,
        Command::Root => root_cmd(ledger)?,
    }
    Ok(true)
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
