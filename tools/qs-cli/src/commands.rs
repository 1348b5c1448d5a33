//! Command handlers.

use crate::cli::{AccountCommand, AssetCommand, Cli, Commands};
use crate::devnet::Devnet;
use crate::error::CliError;
use crate::render;
use qs_02_group_orchestrator::StakingApi;
use qs_telemetry::log_event;
use serde::Serialize;
use serde_json::json;
use shared_types::PoolId;

/// Where command results go.
#[derive(Clone, Copy, Debug)]
pub struct Output {
    json: bool,
}

impl Output {
    /// JSON or text output.
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text(value));
        }
        Ok(())
    }

    fn progress(&self, message: &str) {
        if !self.json {
            println!("\n{}\n", message);
        }
    }
}

/// Run one parsed command against the devnet state file.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let out = Output::new(cli.json);

    if let Commands::Init {
        block_time_ms,
        force,
    } = &cli.command
    {
        let file = Devnet::init(&cli.state, *block_time_ms, *force)?;
        return out.emit(
            &json!({
                "state": cli.state.display().to_string(),
                "genesis_at": file.genesis_at,
                "block_time_ms": file.block_time_ms,
            }),
            |_| format!("Devnet initialized at {}", cli.state.display()),
        );
    }

    let mut devnet = Devnet::open(&cli.state)?;
    let result = dispatch(&mut devnet, cli.command, out).await;
    // Committed groups are kept even when the command itself failed.
    devnet.close()?;
    result
}

async fn dispatch(devnet: &mut Devnet, command: Commands, out: Output) -> Result<(), CliError> {
    match command {
        Commands::Init { .. } => Ok(()),

        Commands::Account(AccountCommand::New { name }) => {
            let address = devnet.add_account(&name)?;
            log_event!("cli", "account created", name = %name);
            out.emit(&json!({ "name": name, "address": address }), |_| {
                format!("Account {} created: {}", name, address)
            })
        }

        Commands::Account(AccountCommand::List) => {
            let accounts = devnet.accounts();
            let listing: Vec<_> = accounts
                .iter()
                .map(|(identity, address)| json!({ "name": identity, "address": address }))
                .collect();
            out.emit(&listing, |_| render::accounts(&accounts))
        }

        Commands::Asset(AssetCommand::Mint {
            account,
            total,
            unit,
        }) => {
            let service = devnet.service(&account.name, false)?;
            out.progress(&format!("Minting {} {}...", total, unit));
            let asset_id = service.mint_asset(total, &unit).await?;
            log_event!("cli", "asset minted", asset_id, total);
            out.emit(&json!({ "asset_id": asset_id, "total": total }), |_| {
                format!("Asset {} minted: {} {} held by {}", asset_id, total, unit, account.name)
            })
        }

        Commands::Asset(AssetCommand::OptIn { account, asset }) => {
            let service = devnet.service(&account.name, false)?;
            let receipt = service.opt_in_asset(asset).await?;
            out.emit(&receipt, |r| render::receipt("asset opt-in", r))
        }

        Commands::Asset(AssetCommand::Send {
            account,
            asset,
            to,
            amount,
        }) => {
            let service = devnet.service(&account.name, false)?;
            let receiver = devnet.resolve(&to)?;
            let receipt = service.send_asset(asset, receiver, amount).await?;
            out.emit(&receipt, |r| render::receipt("asset transfer", r))
        }

        Commands::Asset(AssetCommand::Balance { of, asset }) => {
            let holder = devnet.resolve(&of)?;
            let balance = devnet.ledger().snapshot().balance(&holder, asset);
            out.emit(
                &json!({ "account": holder, "asset_id": asset, "balance": balance }),
                |_| match balance {
                    Some(amount) => format!("{} holds {} of asset {}", of, amount, asset),
                    None => format!("{} is not opted in to asset {}", of, asset),
                },
            )
        }

        Commands::Advance { rounds } => {
            let round = devnet.ledger().advance_rounds(rounds);
            out.emit(&json!({ "round": round }), |_| format!("Current round: {}", round))
        }

        Commands::Create {
            account,
            asset,
            locking_rounds,
            funding,
        } => {
            let service = devnet.service(&account.name, false)?;
            out.progress(&format!("Creating new staking pool for asset {}...", asset));
            let summary = service.create(asset, locking_rounds, funding).await?;
            log_event!("cli", "pool created", pool_id = %summary.pool_id, funding);
            out.emit(&summary, render::pool)
        }

        Commands::Info { pool } => {
            let summary = devnet.observer().info(PoolId(pool)).await?;
            out.emit(&summary, render::pool)
        }

        Commands::Join(target) => {
            let service = devnet.service(&target.account.name, false)?;
            out.progress(&format!("Joining staking pool {}...", target.pool));
            service.join(target.pool_id()).await?;
            let summary = service.info(target.pool_id()).await?;
            out.emit(&summary, render::pool)
        }

        Commands::Leave(target) => {
            let service = devnet.service(&target.account.name, false)?;
            let receipt = service.leave(target.pool_id()).await?;
            out.emit(&receipt, |r| render::receipt("left pool", r))
        }

        Commands::Book { target, amount } => {
            let service = devnet.service(&target.account.name, false)?;
            out.progress(&format!("Staking {} units in pool {}...", amount, target.pool));
            let receipt = service.book(target.pool_id(), amount).await?;
            log_event!("cli", "booking committed", pool_id = %receipt.pool_id, amount);
            out.emit(&receipt, render::booking)
        }

        Commands::Status { pool, of } => {
            let participant = devnet.resolve(&of)?;
            let report = devnet.observer().status(participant, PoolId(pool)).await?;
            out.emit(&report, render::status)
        }

        Commands::Withdraw { target, wait } => {
            let service = devnet.service(&target.account.name, wait)?;
            out.progress("Withdrawal request...");
            let receipt = service.withdraw(target.pool_id()).await?;
            log_event!("cli", "withdrawal committed", pool_id = %receipt.pool_id, payout = receipt.payout);
            out.emit(&receipt, render::withdrawal)
        }
    }
}
