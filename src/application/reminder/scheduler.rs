use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::loan::ServiceDependencies;

use super::dispatcher::run_cycle_until;

/// 間隔にゼロが渡された場合の代替値
const FALLBACK_INTERVAL: Duration = Duration::from_secs(60);

/// スケジューラの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// リマインダースケジューラ
///
/// 一定間隔でリマインダー配信サイクルを実行するバックグラウンドタスク。
/// - 起動直後に Running、最初のサイクルはすぐに実行される
/// - サイクルのエラー・パニックはログに残して握りつぶす（ループは継続）
/// - `request_shutdown()` で Stopped へ。待機中でも即座に抜ける
/// - サイクル実行中のキャンセルは、送信中の1件の完了後に観測される
pub struct ReminderScheduler {
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SchedulerState>,
    join: JoinHandle<()>,
}

impl ReminderScheduler {
    /// スケジューラを起動する
    pub fn spawn(deps: ServiceDependencies, interval: Duration) -> Self {
        let period = if interval.is_zero() {
            tracing::warn!(fallback = ?FALLBACK_INTERVAL, "Zero reminder interval, using fallback");
            FALLBACK_INTERVAL
        } else {
            interval
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Running);

        let join = tokio::spawn(async move {
            scheduler_loop(deps, period, shutdown_rx).await;
            // 受信側がすべて drop されていても構わない
            let _ = state_tx.send(SchedulerState::Stopped);
        });

        Self {
            shutdown_tx,
            state_rx,
            join,
        }
    }

    /// 現在の状態
    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    /// 停止を要求する（完了は待たない）
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// 停止を要求し、ループの終了を待つ
    pub async fn shutdown_and_join(self) -> SchedulerState {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Reminder scheduler task ended abnormally");
        }
        *self.state_rx.borrow()
    }
}

async fn scheduler_loop(
    deps: ServiceDependencies,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles: u64 = 0;

    tracing::info!(?period, "Reminder scheduler started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // 待機はキャンセルと競合させる
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                // 送信側が drop された場合も停止扱い
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if *shutdown_rx.borrow() {
            break;
        }

        cycles += 1;
        let today = deps.clock.today();
        tracing::info!(cycle = cycles, %today, "Checking for loans due tomorrow");

        let cycle = run_cycle_until(&deps, today, || *shutdown_rx.borrow());
        match AssertUnwindSafe(cycle).catch_unwind().await {
            Ok(Ok(_report)) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Reminder cycle abandoned, retrying on next tick");
            }
            Err(_) => {
                tracing::error!("Reminder cycle panicked, retrying on next tick");
            }
        }
    }

    tracing::info!(cycles, "Reminder scheduler stopped");
}
