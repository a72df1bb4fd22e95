use std::time::Duration;

use tracing::{info, warn};

use crate::Chain;

/// Background task that seals the pending pool into a block on every tick.
///
/// Ticks with an empty pool are skipped. A failed commit is logged and the
/// loop keeps going; the affected transactions already carry reverted
/// receipts by then.
pub async fn run_miner_loop(chain: Chain, interval: Duration) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match chain.mine_block().await {
            Ok(Some(block)) => {
                info!(
                    "Mined block {} with {} transaction(s)",
                    block.number,
                    block.transactions.len()
                );
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Mining error: {}", e);
            }
        }
    }
}
