use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::Instrument;
use uuid::Uuid;

use tunewatch_common::Result;
use tunewatch_common::traits::{CatalogSource, Notifier, StateStore};
use tunewatch_common::types::ProgressState;
use tunewatch_engine::diff::latest_added_at;
use tunewatch_engine::{ChangeDetector, Detection, DispatchReport, NotificationDispatcher, diff};

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Version marker unchanged; nothing fetched, nothing sent.
    Unchanged,
    /// First observation: baseline recorded, nothing sent.
    Initialized { baseline_items: usize },
    /// Marker changed; new items (possibly none) were dispatched.
    Dispatched(DispatchReport),
}

/// Playlist poller that runs one detect → fetch → diff → dispatch → persist
/// cycle per tick.
pub struct Poller<C, N, S> {
    catalog: C,
    dispatcher: NotificationDispatcher<N>,
    store: S,
    poll_interval: Duration,
}

impl<C, N, S> Poller<C, N, S>
where
    C: CatalogSource,
    N: Notifier,
    S: StateStore,
{
    pub fn new(
        catalog: C,
        dispatcher: NotificationDispatcher<N>,
        store: S,
        poll_interval: Duration,
    ) -> Self {
        Self {
            catalog,
            dispatcher,
            store,
            poll_interval,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn notifier(&self) -> &N {
        self.dispatcher.notifier()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start the polling loop. Runs until the task is cancelled.
    ///
    /// The first cycle starts immediately. Cycles never overlap: a slow cycle
    /// delays the next tick instead of queueing extra ones.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Playlist poller started"
        );

        loop {
            ticker.tick().await;

            let span = tracing::info_span!("cycle", cycle_id = %Uuid::new_v4());
            match self.run_cycle().instrument(span).await {
                Ok(CycleOutcome::Unchanged) => {}
                Ok(outcome) => tracing::debug!(?outcome, "Cycle complete"),
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, "Cycle aborted, retrying next tick");
                }
                Err(e) => tracing::error!(error = %e, "Cycle failed"),
            }
        }
    }

    /// Run a single cycle. On error nothing has been persisted, except that a
    /// failed save may follow already-attempted deliveries.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let state = self.store.load().await;
        let marker = self.catalog.fetch_version_marker().await?;
        let persisted = state.as_ref().map(|s| s.version_marker.as_str());

        match ChangeDetector::detect(&marker, persisted) {
            Detection::Unchanged => {
                tracing::debug!(marker = %marker, "Playlist unchanged");
                Ok(CycleOutcome::Unchanged)
            }
            Detection::Initialize => {
                let items = self.catalog.fetch_all_items().await?;
                let baseline = ProgressState {
                    version_marker: marker,
                    watermark: latest_added_at(&items),
                };
                self.store.save(&baseline).await?;

                tracing::info!(
                    marker = %baseline.version_marker,
                    watermark = ?baseline.watermark,
                    existing_items = items.len(),
                    "Recorded baseline, existing items will not be announced"
                );
                Ok(CycleOutcome::Initialized {
                    baseline_items: items.len(),
                })
            }
            Detection::Changed => {
                let previous = state.and_then(|s| s.watermark);
                let items = self.catalog.fetch_all_items().await?;
                let new_items = diff(items, previous);

                tracing::info!(
                    marker = %marker,
                    new_items = new_items.len(),
                    "Playlist changed"
                );
                let report = self.dispatcher.dispatch(&new_items).await;

                // never regress: an empty diff keeps the previous watermark
                let next = ProgressState {
                    version_marker: marker,
                    watermark: new_items.last().map(|i| i.added_at).max(previous),
                };
                self.store.save(&next).await?;

                if report.failed > 0 {
                    tracing::warn!(
                        failed = report.failed,
                        attempted = report.attempted,
                        "Some notifications were not delivered"
                    );
                }
                Ok(CycleOutcome::Dispatched(report))
            }
        }
    }
}
