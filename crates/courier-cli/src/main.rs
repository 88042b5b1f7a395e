//! Demo binary: run the outbox dispatcher end to end against a flaky
//! payout provider.
//!
//! Appends a withdrawal event whose handler fails twice before succeeding,
//! waits for delivery, then prints the record's audit trail and the final
//! outbox counts. Run with `RUST_LOG=debug` to watch the retry scheduling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

use courier_core::{
    CourierBuilder, DispatcherConfig, EventKind, Handler, HandlerError, RetryPolicy, UserId,
    WithdrawalRequested,
};

/// Payout provider that rejects the first couple of calls, the way a real
/// one does during a deploy or a rate-limit window.
struct FlakyPayoutHandler {
    remaining_failures: AtomicU32,
}

impl FlakyPayoutHandler {
    fn new(failures: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl Handler<WithdrawalRequested> for FlakyPayoutHandler {
    async fn handle(&self, event: WithdrawalRequested) -> Result<(), HandlerError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(HandlerError::Transient(format!(
                "provider 503 (left={left})"
            )));
        }
        println!(
            "payout sent: {} minor units via {} to {}",
            event.amount_minor, event.method, event.recipient
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Short backoff so the demo finishes in a couple of seconds.
    let config = DispatcherConfig::default()
        .with_poll_interval(Duration::from_millis(50))
        .with_retry(RetryPolicy::new(
            Duration::from_millis(200),
            Duration::from_secs(5),
        ));

    let courier = CourierBuilder::new()
        .register::<WithdrawalRequested, _>(FlakyPayoutHandler::new(2))?
        .expect_kinds(&[EventKind::WithdrawalRequested])
        .config(config)
        .build()?;

    let workers = courier.spawn_workers(2);

    let user = UserId::from_ulid(Ulid::new());
    let id = courier
        .append_event(
            user,
            WithdrawalRequested {
                tx_ref: "tx-demo-1".to_string(),
                amount_minor: 25_000,
                recipient: "acct-42".to_string(),
                method: "sepa".to_string(),
            },
        )
        .await?;
    info!(record = %id, "withdrawal appended");

    // Wait for the record to reach a terminal state.
    loop {
        let record = courier.get(id).await?;
        if record.status.is_terminal() {
            println!(
                "final: status={} attempts={} last_error={:?}",
                record.status, record.attempts, record.last_error
            );
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    println!("audit trail:");
    for entry in courier.history(id).await? {
        println!(
            "  {} {} -> {}: {}",
            entry.recorded_at.format("%H:%M:%S%.3f"),
            entry.from,
            entry.to,
            entry.reason
        );
    }
    println!("counts: {:?}", courier.counts().await?);

    workers.shutdown_and_join().await;
    Ok(())
}
