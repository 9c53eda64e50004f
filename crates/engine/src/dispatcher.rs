//! Notification dispatcher: fans new items out to their recipients.
//!
//! Every delivery is independent: a failed send is logged and skipped, never
//! retried here and never allowed to stop the remaining sends. The caller
//! advances persisted state after `dispatch` returns regardless of outcome.

use std::time::Duration;

use tunewatch_common::traits::Notifier;
use tunewatch_common::types::PlaylistItem;

use crate::display::DisplayNames;
use crate::router::RecipientRouter;

/// Outcome counts for one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub items: usize,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct NotificationDispatcher<N> {
    router: RecipientRouter,
    names: DisplayNames,
    notifier: N,
    /// Pause between consecutive delivery attempts (transport rate limits).
    pacing: Duration,
}

impl<N: Notifier> NotificationDispatcher<N> {
    pub fn new(
        router: RecipientRouter,
        names: DisplayNames,
        notifier: N,
        pacing: Duration,
    ) -> Self {
        Self {
            router,
            names,
            notifier,
            pacing,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Notify recipients for each item, in the given order.
    pub async fn dispatch(&self, items: &[PlaylistItem]) -> DispatchReport {
        let mut report = DispatchReport {
            items: items.len(),
            ..Default::default()
        };

        for item in items {
            let contributor = item.contributor.as_ref();
            let text = self.names.message(contributor);
            let contributor_id = contributor.map(|c| c.id.as_str()).unwrap_or("<none>");

            for recipient in self.router.resolve(contributor) {
                if report.attempted > 0 && !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                report.attempted += 1;

                match self.notifier.send(&recipient, &text).await {
                    Ok(()) => {
                        report.delivered += 1;
                        tracing::info!(
                            recipient = %recipient,
                            contributor = contributor_id,
                            track = %item.track,
                            added_at = %item.added_at,
                            "Notification sent"
                        );
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            recipient = %recipient,
                            contributor = contributor_id,
                            error = %e,
                            "Notification delivery failed"
                        );
                    }
                }
            }
        }

        report
    }
}
