use crate::estimator::DEFAULT_DEBOUNCE;
use clap::{
    Args,
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

pub const DEFAULT_MAINNET_RPC_URL: &str = "https://rpc.mainnet.near.org";
pub const DEFAULT_TESTNET_RPC_URL: &str = "https://rpc.testnet.near.org";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:3030";

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Local,
}

impl Network {
    /// Directory name shared by the credentials store and deployment records.
    pub fn dir_name(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Local => "local",
        }
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::Mainnet => DEFAULT_MAINNET_RPC_URL,
            Network::Testnet => DEFAULT_TESTNET_RPC_URL,
            Network::Local => DEFAULT_LOCAL_RPC_URL,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "Mainnet",
            Network::Testnet => "Testnet",
            Network::Local => "Local",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkTarget {
    pub network: Network,
    pub url: String,
}

/// Resolved startup configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub target: NetworkTarget,
    pub contract_id: String,
    pub account: Option<String>,
    pub credentials_dir: PathBuf,
    pub debounce: Duration,
    pub log_dir: PathBuf,
}

#[derive(Debug, Parser)]
#[command(name = "vex", about = "Terminal client for the Vex betting contract")]
pub struct Cli {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Override the RPC URL for the selected network
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Betting contract account; falls back to the deployment record
    #[arg(long, env = "CONTRACT_NAME", global = true)]
    pub contract_id: Option<String>,

    /// Account to sign with; required when several keys are stored
    #[arg(long, global = true)]
    pub account: Option<String>,

    /// Credentials directory (defaults to ~/.near-credentials)
    #[arg(long, global = true)]
    pub credentials_dir: Option<String>,

    /// Quiet period before an estimate query is sent
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64, global = true)]
    pub debounce_ms: u64,

    /// Where the rolling log file is written
    #[arg(long, default_value = "logs", global = true)]
    pub log_dir: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Default, Args)]
#[group(multiple = false)]
pub struct NetworkArgs {
    /// Connect to NEAR mainnet
    #[arg(long)]
    pub mainnet: bool,
    /// Connect to NEAR testnet (default)
    #[arg(long)]
    pub testnet: bool,
    /// Connect to a local node
    #[arg(long)]
    pub local: bool,
}

impl NetworkArgs {
    pub fn network(&self) -> Network {
        if self.mainnet {
            Network::Mainnet
        } else if self.local {
            Network::Local
        } else {
            Network::Testnet
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List open matches
    Matches,
    /// Ask the contract for the payout of a hypothetical bet
    Estimate {
        match_id: String,
        team: String,
        amount: String,
    },
    /// Place a bet, attaching the stake as deposit
    Bet {
        match_id: String,
        team: String,
        amount: String,
    },
    /// List bets on a match
    Bets {
        match_id: String,
        /// Only bets by this account
        #[arg(long)]
        bettor: Option<String>,
    },
}

impl Cli {
    pub fn resolve(&self) -> Result<AppConfig> {
        let network = self.network.network();
        let target = NetworkTarget {
            network,
            url: self
                .rpc_url
                .clone()
                .unwrap_or_else(|| network.default_rpc_url().to_string()),
        };
        let contract_id = resolve_contract_id(
            self.contract_id.as_deref(),
            network,
            Path::new(DEPLOYMENTS_ROOT),
        )?;
        let credentials_dir = crate::wallet::keystore::resolve_credentials_dir(
            self.credentials_dir.as_deref(),
        )?
        .join(network.dir_name());
        let log_dir = PathBuf::from(shellexpand::tilde(&self.log_dir).into_owned());
        Ok(AppConfig {
            target,
            contract_id,
            account: self.account.clone(),
            credentials_dir,
            debounce: Duration::from_millis(self.debounce_ms),
            log_dir,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub deployed_at: String,
    pub contract_id: String,
    #[serde(default)]
    pub network_url: Option<String>,
    #[serde(default)]
    pub code_hash: Option<String>,
}

/// Explicit id first, then the newest record under
/// `<root>/<network>/deployments.json`.
pub fn resolve_contract_id(
    explicit: Option<&str>,
    network: Network,
    root: &Path,
) -> Result<String> {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    let path = root.join(network.dir_name()).join(DEPLOYMENTS_FILE);
    let records = read_records(&path)?;
    records
        .last()
        .map(|record| record.contract_id.clone())
        .ok_or_else(|| {
            eyre!(
                "No contract id: pass --contract-id, set CONTRACT_NAME, or record a deployment in {}",
                path.display()
            )
        })
}

fn read_records(path: &Path) -> Result<Vec<DeploymentRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read(path).wrap_err("Failed to read deployment records")?;
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let records = serde_json::from_slice::<Vec<DeploymentRecord>>(&data)
        .wrap_err("Failed to parse deployment records JSON")?;
    Ok(records)
}
