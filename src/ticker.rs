use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const STATUS_MESSAGES: [&str; 6] = [
    "Capturing pixel essence...",
    "Applying Everskies proportions...",
    "Stitching the outfit details...",
    "Polishing character features...",
    "Refining pixel shading...",
    "Almost there, finalizing layers...",
];

pub const TICK_INTERVAL: Duration = Duration::from_millis(2500);

/// Running ticker. Dropping it stops the task.
#[derive(Debug)]
pub struct TickerHandle {
    rx: watch::Receiver<usize>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Starts at index 0 and advances once per `period`, wrapping.
    pub fn start(period: Duration) -> Self {
        let (tx, rx) = watch::channel(0usize);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut idx = 0usize;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        idx = (idx + 1) % STATUS_MESSAGES.len();
                        if tx.send(idx).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { rx, cancel, task }
    }

    pub fn message(&self) -> &'static str {
        STATUS_MESSAGES[*self.rx.borrow()]
    }

    /// Resolves with the new message after the next tick. Pends forever once
    /// the ticker is stopped.
    pub async fn changed(&mut self) -> &'static str {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        STATUS_MESSAGES[*self.rx.borrow_and_update()]
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}
