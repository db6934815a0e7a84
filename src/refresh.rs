use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::mirror::{SnapshotBuilder, SnapshotStore};

/// Background task that rebuilds and publishes the snapshot on a fixed period.
///
/// A failed refresh is logged and skipped; the previous snapshot stays
/// published and the next regular tick is the retry.
pub struct RefreshLoop {
    handle: JoinHandle<()>,
    ready_rx: Option<oneshot::Receiver<()>>,
}

impl RefreshLoop {
    pub fn spawn(builder: SnapshotBuilder, store: Arc<SnapshotStore>, period: Duration) -> Self {
        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = tokio::spawn(run(builder, store, period, ready_tx));
        Self {
            handle,
            ready_rx: Some(ready_rx),
        }
    }

    /// Resolves once the first snapshot has been published.
    ///
    /// Only the first call waits; later calls return immediately. Returns
    /// `false` if the loop ended before anything was published.
    pub async fn ready(&mut self) -> bool {
        match self.ready_rx.take() {
            Some(rx) => rx.await.is_ok(),
            None => true,
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    builder: SnapshotBuilder,
    store: Arc<SnapshotStore>,
    period: Duration,
    ready_tx: oneshot::Sender<()>,
) {
    info!(
        "auto updater started for {} (interval {:?})",
        builder.source(),
        period
    );
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ready_tx = Some(ready_tx);

    loop {
        ticker.tick().await;
        info!("performing auto update");
        match builder.build().await {
            Ok(snapshot) => {
                let version = store.publish(snapshot);
                info!("auto update complete (snapshot {version})");
                if let Some(tx) = ready_tx.take() {
                    let _ = tx.send(());
                }
            }
            Err(err) => error!("{err}"),
        }
    }
}
