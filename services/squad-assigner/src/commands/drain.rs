//! Batch placement through the intake worker.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use squad_assigner::intake::{
    IntakeWorker, IntakeWorkerConfig, MemoryTaskQueue, PlacementTask, RetryPolicy,
};
use tokio::sync::watch;
use tracing::{info, warn};

use super::CommandContext;
use crate::output::{print_info, print_success};

#[derive(Debug, Args)]
pub struct DrainArgs {
    /// JSON file holding an array of placement tasks.
    file: PathBuf,

    /// Deliveries per task before it is dead-lettered.
    #[arg(long, default_value = "5")]
    max_attempts: u32,
}

pub async fn run(ctx: CommandContext, args: DrainArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let tasks: Vec<PlacementTask> =
        serde_json::from_str(&raw).context("task file must be a JSON array of placement tasks")?;
    let total = tasks.len();

    let db = ctx.database().await?;
    let queue = Arc::new(MemoryTaskQueue::new(RetryPolicy {
        max_attempts: args.max_attempts.max(1),
        ..RetryPolicy::default()
    }));
    for task in tasks {
        queue.enqueue(task).await;
    }

    let worker = IntakeWorker::new(
        ctx.intake(&db),
        queue.clone(),
        IntakeWorkerConfig {
            poll_interval: Duration::from_millis(100),
        },
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    info!(total, "Draining placement tasks");
    loop {
        // Released deliveries go back to the ready queue, so idle means settled.
        if queue.is_idle().await {
            break;
        }
        let settled = queue.acked().await + queue.dead_letters().await.len();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!(settled, total, "Interrupted, stopping intake worker");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    let _ = shutdown_tx.send(true);
    handle.await.context("intake worker panicked")?;

    let dead = queue.dead_letters().await;
    print_success(&format!(
        "{} of {} tasks acknowledged.",
        queue.acked().await,
        total
    ));
    for (task, kind) in &dead {
        print_info(&format!("dead-lettered {} ({kind})", task.member_id));
    }
    Ok(())
}
