use std::path::Path;

use amm_deposit_sdk::{
    amount::format_token_amount,
    flow::{DepositFlow, DepositRequest, Phase, Progress},
    reader::BalanceRead,
    report::{AssetChange, Delta, DepositReport},
    DepositConfig, DepositInstruction, Error as SdkError, FileConfig, RpcLedger,
};
use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde_json::json;
use solana_sdk::signature::{read_keypair_file, Keypair, Signer};

/// Expand `~/` to `$HOME/` in keypair paths.
fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", std::env::var("HOME").unwrap_or_default(), rest)
    } else {
        path.to_string()
    }
}

fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_home(path);
    read_keypair_file(&expanded)
        .map_err(|e| anyhow!(
            "Cannot load keypair from '{}': {}\n  \
             Set AMM_DEPOSIT_KEYPAIR or pass --keypair to specify a different path.",
            expanded, e
        ))
}

/// Print the tool banner to stdout.
fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  amm-deposit  v{ver}  ·  two-asset pool deposits with reconciliation");
    println!("  {}", "─".repeat(62));
    println!("  Config    amm-deposit.toml  (create with `amm-deposit init-config`)");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// amm-deposit: deposit two tokens into an existing AMM pool and report
/// exactly what moved.
///
/// Every command supports --json for machine-readable output.
/// Global options can also be set via environment variables:
///   AMM_DEPOSIT_CONFIG   path to the TOML config file
///   AMM_DEPOSIT_RPC_URL  JSON-RPC endpoint (overrides the config file)
///   AMM_DEPOSIT_KEYPAIR  depositor keypair JSON (overrides the config file)
#[derive(Parser)]
#[command(
    name    = "amm-deposit",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Deposit into a two-asset AMM pool with before/after balance reconciliation.",
    after_help = "\
ENVIRONMENT:
  AMM_DEPOSIT_CONFIG    Config file  [default: amm-deposit.toml]
  AMM_DEPOSIT_RPC_URL   JSON-RPC endpoint
  AMM_DEPOSIT_KEYPAIR   Path to Ed25519 keypair JSON
  RUST_LOG              Log filter  [default: warn]

QUICK START:
  amm-deposit init-config
  amm-deposit addresses
  amm-deposit deposit --amount-a 500000000 --amount-b 500000000"
)]
struct Cli {
    /// TOML config file describing the RPC endpoint, programs and pool
    #[arg(
        long,
        global        = true,
        value_name    = "PATH",
        default_value = "amm-deposit.toml",
        env           = "AMM_DEPOSIT_CONFIG"
    )]
    config: String,

    /// JSON-RPC endpoint (overrides `rpc_url` from the config file)
    #[arg(long, global = true, value_name = "URL", env = "AMM_DEPOSIT_RPC_URL")]
    rpc_url: Option<String>,

    /// Depositor keypair JSON file (overrides `keypair_path` from the config file)
    #[arg(long, global = true, value_name = "PATH", env = "AMM_DEPOSIT_KEYPAIR")]
    keypair: Option<String>,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposit token A and token B into the configured pool
    ///
    /// Reads the depositor's balances, submits one deposit transaction,
    /// waits for confirmation, reads the balances again and reports the
    /// change of each account. The share amount is decided by the pool.
    #[command(
        after_help = "\
EXAMPLES:
  # Deposit 0.5 of each 9-decimal token
  amm-deposit deposit --amount-a 500000000 --amount-b 500000000

  # Against a different node, JSON output
  amm-deposit deposit --amount-a 1000 --amount-b 1000 --rpc-url http://localhost:8899 --json

NOTES:
  Amounts are raw atomic units. Each run is a separate deposit.
  Interrupting after submission does not recall the transaction."
    )]
    Deposit {
        /// Amount of token A to deposit (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount_a: u64,

        /// Amount of token B to deposit (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount_b: u64,
    },

    /// Show the pool and depositor accounts derived from the config
    #[command(
        after_help = "\
EXAMPLES:
  amm-deposit addresses
  amm-deposit addresses --keypair ~/wallets/lp.json --json"
    )]
    Addresses,

    /// Print the deposit instruction payload as hex without sending anything
    #[command(
        after_help = "\
EXAMPLES:
  amm-deposit encode --amount-a 500000000 --amount-b 500000000
  # 010065cd1d000000000065cd1d00000000"
    )]
    Encode {
        #[arg(long, value_name = "AMOUNT")]
        amount_a: u64,

        #[arg(long, value_name = "AMOUNT")]
        amount_b: u64,
    },

    /// Write the preset config file
    InitConfig {
        /// Destination (defaults to --config)
        #[arg(long, value_name = "PATH")]
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Deposit { amount_a, amount_b } => {
            let config = load_config(&cli)?;
            cmd_deposit(config, DepositRequest::new(*amount_a, *amount_b), cli.json).await?;
        }
        Commands::Addresses => {
            let config = load_config(&cli)?;
            cmd_addresses(&config, cli.json)?;
        }
        Commands::Encode { amount_a, amount_b } => {
            cmd_encode(*amount_a, *amount_b, cli.json);
        }
        Commands::InitConfig { path, force } => {
            cmd_init_config(path.as_deref().unwrap_or(&cli.config), *force, cli.json)?;
        }
    }

    Ok(())
}

/// Config file with command-line overrides applied, validated.
fn load_config(cli: &Cli) -> Result<DepositConfig> {
    let mut file = FileConfig::load(&cli.config).with_context(|| {
        format!("Run `amm-deposit init-config --path {}` to create one.", cli.config)
    })?;
    if let Some(url) = &cli.rpc_url {
        file.rpc_url = url.clone();
    }
    if let Some(path) = &cli.keypair {
        file.keypair_path = path.clone();
    }
    file.keypair_path = expand_home(&file.keypair_path);
    DepositConfig::try_from(file).with_context(|| format!("Invalid config in {}", cli.config))
}

// ─── deposit ─────────────────────────────────────────────────────────────────

async fn cmd_deposit(config: DepositConfig, request: DepositRequest, json_output: bool) -> Result<()> {
    let depositor = load_keypair(&config.keypair_path)?;
    let ledger = RpcLedger::new(&config.rpc_url);
    let flow = DepositFlow::new(config.clone(), ledger);
    let payload = request.instruction().encode();

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Ctrl-C handler unavailable, deposit cannot be interrupted: {e}");
            std::future::pending::<()>().await;
        }
    };

    let result = tokio::select! {
        result = flow.run(&depositor, request) => result,
        () = interrupt => return Err(interrupted(flow.progress())),
    };

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            print_failure(&e, &config);
            return Err(e).context("Deposit failed");
        }
    };

    if json_output {
        let mut out = report.to_json();
        out["instruction_data"] = json!(hex::encode(payload));
        out["depositor"] = json!(depositor.pubkey().to_string());
        out["explorer"] = json!(config.explorer_link(&report.signature));
        println!("{out}");
    } else {
        print_report(&report, &config, &depositor, &payload);
    }
    Ok(())
}

/// Error for a deposit abandoned on Ctrl-C at `progress`.
fn interrupted(progress: Progress) -> anyhow::Error {
    match progress.signature {
        Some(sig) if progress.phase != Phase::Failed => {
            log::warn!("Interrupted after submission; {sig} may still land");
            anyhow!(
                "Interrupted after submission (phase {}).\n  \
                 Transaction {sig} may still land; check it before retrying.",
                progress.phase
            )
        }
        _ => anyhow!("Interrupted before submission (phase {}); nothing was sent.", progress.phase),
    }
}

fn print_report(report: &DepositReport, config: &DepositConfig, depositor: &Keypair, payload: &[u8]) {
    let decimals = report.decimals;
    println!("─── Deposit Confirmed ────────────────────────────────────────────");
    println!("  Pool             {}", report.pool);
    println!("  Depositor        {}", depositor.pubkey());
    println!("  Requested A      {}  ({})", report.requested.amount_a,
        format_token_amount(report.requested.amount_a as i128, decimals));
    println!("  Requested B      {}  ({})", report.requested.amount_b,
        format_token_amount(report.requested.amount_b as i128, decimals));
    println!("  Instruction      {}", hex::encode(payload));
    println!("  Transaction      {}", report.signature);
    println!("  Slot             {}", report.slot);
    if let Some(link) = config.explorer_link(&report.signature) {
        println!("  Explorer         {link}");
    }
    println!();
    println!("─── Balances ─────────────────────────────────────────────────────");
    print_change("Token A", &report.asset_a, decimals);
    print_change("Token B", &report.asset_b, decimals);
    print_change("Pool shares", &report.shares, decimals);
    println!();
    println!("─── Summary ──────────────────────────────────────────────────────");
    println!("  Consumed A       {}", amount_or_unknown(report.consumed_a(), decimals));
    println!("  Consumed B       {}", amount_or_unknown(report.consumed_b(), decimals));
    println!("  Shares received  {}", amount_or_unknown(report.shares_received(), decimals));
    println!("  Total deposited  {}", amount_or_unknown(report.total_value_locked(), decimals));

    let warnings = report.warnings();
    if !warnings.is_empty() {
        println!();
        for w in warnings {
            println!("  ⚠  {w}");
        }
    }
}

fn print_change(label: &str, change: &AssetChange, decimals: u8) {
    println!("  {label:<16} {}", change.account);
    println!("    before         {}", read_label(&change.pre, decimals));
    println!("    after          {}", read_label(&change.post, decimals));
    match &change.delta {
        Delta::Known(d) => println!("    change         {d}  ({})", format_token_amount(*d, decimals)),
        Delta::Unknown(reason) => println!("    change         unknown ({reason})"),
    }
}

fn read_label(read: &BalanceRead, decimals: u8) -> String {
    match read {
        BalanceRead::Observed(s) => {
            format!("{}  ({})", s.amount, format_token_amount(s.amount as i128, decimals))
        }
        BalanceRead::Unavailable { attempts, reason, .. } => {
            format!("unavailable after {attempts} attempt(s): {reason}")
        }
    }
}

fn amount_or_unknown(v: Option<i128>, decimals: u8) -> String {
    match v {
        Some(v) => format!("{v}  ({})", format_token_amount(v, decimals)),
        None => "unknown".to_string(),
    }
}

/// Program logs and the explorer link of a failed deposit, on stderr.
fn print_failure(err: &SdkError, config: &DepositConfig) {
    if let SdkError::Rejected { signature: Some(sig), .. } | SdkError::ConfirmationTimeout { signature: sig, .. } = err {
        eprintln!("  Transaction      {sig}");
        if let Some(link) = config.explorer_link(sig) {
            eprintln!("  Explorer         {link}");
        }
    }
    let logs = err.logs();
    if !logs.is_empty() {
        eprintln!("─── Program logs ─────────────────────────────────────────────────");
        for (i, line) in logs.iter().enumerate() {
            eprintln!("  {:>3}  {line}", i + 1);
        }
    }
}

// ─── addresses ───────────────────────────────────────────────────────────────

fn cmd_addresses(config: &DepositConfig, json_output: bool) -> Result<()> {
    let owner = load_keypair(&config.keypair_path)?.pubkey();
    let pool = amm_deposit_sdk::PoolAddresses::derive(&config.programs, &config.pool);
    let accounts = amm_deposit_sdk::DepositorAccounts::derive(&owner, &pool, &config.programs);

    if json_output {
        println!("{}", json!({
            "status":        "ok",
            "command":       "addresses",
            "amm_program":   config.programs.amm.to_string(),
            "pool":          pool.pool.to_string(),
            "pool_bump":     pool.bump,
            "mint_a":        pool.mint_a.to_string(),
            "mint_b":        pool.mint_b.to_string(),
            "vault_a":       pool.vault_a.to_string(),
            "vault_b":       pool.vault_b.to_string(),
            "share_mint":    pool.share_mint.to_string(),
            "depositor":     owner.to_string(),
            "user_token_a":  accounts.token_a.to_string(),
            "user_token_b":  accounts.token_b.to_string(),
            "user_shares":   accounts.shares.to_string(),
        }));
    } else {
        println!("─── Pool ─────────────────────────────────────────────────────────");
        println!("  AMM program      {}", config.programs.amm);
        println!("  Pool PDA         {}  (bump {})", pool.pool, pool.bump);
        println!("  Mint A           {}", pool.mint_a);
        println!("  Mint B           {}", pool.mint_b);
        println!("  Vault A          {}", pool.vault_a);
        println!("  Vault B          {}", pool.vault_b);
        println!("  Share mint       {}", pool.share_mint);
        println!();
        println!("─── Depositor ────────────────────────────────────────────────────");
        println!("  Wallet           {owner}");
        println!("  Token A account  {}", accounts.token_a);
        println!("  Token B account  {}", accounts.token_b);
        println!("  Share account    {}", accounts.shares);
    }
    Ok(())
}

// ─── encode ──────────────────────────────────────────────────────────────────

fn cmd_encode(amount_a: u64, amount_b: u64, json_output: bool) {
    let data = DepositInstruction { amount_a, amount_b }.encode();
    if json_output {
        println!("{}", json!({
            "status":   "ok",
            "command":  "encode",
            "amount_a": amount_a,
            "amount_b": amount_b,
            "data":     hex::encode(data),
            "len":      data.len(),
        }));
    } else {
        println!("{}", hex::encode(data));
    }
}

// ─── init-config ─────────────────────────────────────────────────────────────

fn cmd_init_config(path: &str, force: bool, json_output: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        return Err(anyhow!("{path} already exists. Pass --force to overwrite it."));
    }
    FileConfig::write_default(path)?;
    if json_output {
        println!("{}", json!({ "status": "ok", "command": "init-config", "path": path }));
    } else {
        println!("Wrote {path}");
        println!("  Edit the pool section, then run `amm-deposit addresses` to check it.");
    }
    Ok(())
}
