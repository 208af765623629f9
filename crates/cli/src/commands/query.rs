use anyhow::{anyhow, bail, Result};
use clap::Subcommand;
use multibeacon_core::{
    types::{CommonOpts, PendingConsolidationsOpts, PendingPartialWithdrawalsOpts, SpecOpts},
    upstream::RequestContext,
    MultiClient,
};
use std::time::Duration;

use super::utils::{print_success, render_response};

#[derive(Subcommand)]
pub enum QueryCommands {
    /// Print the normalized chain spec
    Spec {
        /// Print only this key (e.g. SECONDS_PER_SLOT)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Print the pending partial withdrawals of a state
    PendingPartialWithdrawals {
        /// State identifier: head, genesis, finalized, justified, a slot or a state root
        #[arg(short, long, default_value = "head")]
        state: String,
    },

    /// Print the pending consolidations of a state
    PendingConsolidations {
        /// State identifier: head, genesis, finalized, justified, a slot or a state root
        #[arg(short, long, default_value = "head")]
        state: String,
    },

    /// Probe the health endpoint of every configured node
    Health {
        /// Probe timeout in milliseconds
        #[arg(long, default_value = "2000")]
        timeout_ms: u64,
    },
}

pub async fn handle_query_command(
    command: QueryCommands,
    client: &MultiClient,
    ctx: &RequestContext,
    timeout: Option<Duration>,
) -> Result<()> {
    let common = CommonOpts { timeout };

    match command {
        QueryCommands::Spec { key } => {
            let response = client.spec(ctx, &SpecOpts { common }).await?;
            match key {
                Some(key) => {
                    let value = response
                        .data
                        .get(&key)
                        .ok_or_else(|| anyhow!("key {key} not found in chain spec"))?;
                    println!("{value}");
                }
                None => {
                    println!("{}", render_response(response.data.as_ref(), &response.metadata)?);
                }
            }
        }
        QueryCommands::PendingPartialWithdrawals { state } => {
            let opts = PendingPartialWithdrawalsOpts { common, state };
            let response = client.pending_partial_withdrawals(ctx, &opts).await?;
            println!("{}", render_response(&response.data, &response.metadata)?);
        }
        QueryCommands::PendingConsolidations { state } => {
            let opts = PendingConsolidationsOpts { common, state };
            let response = client.pending_consolidations(ctx, &opts).await?;
            println!("{}", render_response(&response.data, &response.metadata)?);
        }
        QueryCommands::Health { timeout_ms } => {
            check_health(client, Duration::from_millis(timeout_ms)).await?;
        }
    }

    Ok(())
}

async fn check_health(client: &MultiClient, timeout: Duration) -> Result<()> {
    let mut failed = 0;

    for entry in client.pool().snapshot().iter() {
        let ctx = RequestContext::with_timeout(timeout);
        if entry.client().is_healthy(&ctx).await {
            println!("{}: [OK] {}", entry.name(), entry.client().address());
        } else {
            println!("{}: [ERROR] {}", entry.name(), entry.client().address());
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} of {} nodes are not ready", client.pool().len());
    }

    print_success("All nodes are ready");
    Ok(())
}
