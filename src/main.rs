use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::sync::Arc;
use vex_client::{
    app::{
        self,
        AppController,
    },
    catalog::MatchCatalog,
    config::{
        AppConfig,
        Cli,
        Command,
    },
    estimator::BetInput,
    gateway::ContractGateway,
    logging,
    model::{
        Side,
        display_meta,
    },
    submission::BetSubmission,
    wallet::{
        KeystoreWallet,
        Wallet,
        rpc::RpcClient,
    },
};

fn build_gateway(config: &AppConfig) -> Result<ContractGateway<KeystoreWallet>> {
    let rpc = RpcClient::new(&config.target.url)?;
    let wallet = KeystoreWallet::new(
        rpc,
        config.credentials_dir.clone(),
        config.account.clone(),
    );
    ContractGateway::new(&config.contract_id, Arc::new(wallet))
}

async fn run_command(gateway: ContractGateway<KeystoreWallet>, command: Command) -> Result<()> {
    match command {
        Command::Matches => {
            let catalog = MatchCatalog::load(&gateway).await?;
            for m in catalog.matches() {
                let state = match (m.is_finished(), m.winner()) {
                    (true, Some(winner)) => format!(" finished, winner {winner}"),
                    (true, None) => String::from(" finished"),
                    _ => String::new(),
                };
                println!(
                    "{}\t{} ({}) vs {} ({}){state}",
                    m.id,
                    m.side_a,
                    display_meta(&m.side_a_meta),
                    m.side_b,
                    display_meta(&m.side_b_meta)
                );
            }
        }
        Command::Estimate {
            match_id,
            team,
            amount,
        } => {
            let winnings = gateway
                .get_potential_winnings(&match_id, &team, &amount)
                .await?;
            println!("{winnings}");
        }
        Command::Bet {
            match_id,
            team,
            amount,
        } => {
            gateway
                .wallet()
                .sign_in()
                .await
                .wrap_err("Signing in before placing the bet failed")?;
            let input = BetInput {
                side: Side::team(team),
                stake: amount,
            };
            let outcome = BetSubmission::prepare(match_id, &input)?
                .submit(&gateway)
                .await?;
            println!("{}", outcome.transaction_hash);
            for log in outcome.logs {
                println!("{log}");
            }
        }
        Command::Bets { match_id, bettor } => {
            let bets = gateway.get_bets(&match_id, bettor.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&bets)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = cli.resolve()?;
    logging::init_tracing(&config.log_dir)?;
    tracing::info!(
        network = %config.target.network,
        url = %config.target.url,
        contract = %config.contract_id,
        "starting vex client"
    );
    let gateway = build_gateway(&config)?;
    match cli.command {
        Some(command) => run_command(gateway, command).await,
        None => {
            let controller =
                AppController::new(gateway, config.debounce, config.target.network.to_string());
            app::run_app(controller).await
        }
    }
}
