use std::sync::Arc;

use log::{debug, info, warn};

use super::alerts::engine::AlertEngine;
use super::alerts::model::AlertEvent;
use super::feed::{fetch_both, FeedSource};
use super::state::{Observation, PollState};

/// Who asked for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// Operator action (or activation); failures are shown
    Explicit,
    /// Interval poll; failures stay quiet
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Baseline { orders_mark: u64, reservations_mark: u64 },
    Alerted(AlertEvent),
    Unchanged,
    Failed,
}

/// Polls both feeds and turns new records into alerts.
pub struct FeedWatcher {
    source: Arc<dyn FeedSource>,
    state: PollState,
}

impl FeedWatcher {
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            state: PollState::new(),
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// One poll. State is only touched after both fetches have come back,
    /// so dropping this future mid-flight leaves the marks as they were.
    pub async fn tick(&mut self, mode: TickMode, engine: &mut AlertEngine) -> TickOutcome {
        let (orders, reservations) = match fetch_both(&*self.source).await {
            Ok(lists) => lists,
            Err(e) => {
                match mode {
                    TickMode::Explicit => {
                        warn!("Checking for new records failed: {}", e);
                        engine.report_poll_failure();
                    }
                    TickMode::Background => debug!("Background poll failed: {}", e),
                }
                return TickOutcome::Failed;
            }
        };

        debug!(
            "Polled {} orders and {} reservations",
            orders.len(),
            reservations.len()
        );

        match self.state.observe(&orders, &reservations) {
            Observation::Baseline {
                orders_mark,
                reservations_mark,
            } => {
                info!(
                    "Watching from order #{} and reservation #{}",
                    orders_mark, reservations_mark
                );
                TickOutcome::Baseline {
                    orders_mark,
                    reservations_mark,
                }
            }
            Observation::NewItems {
                new_orders,
                new_reservations,
            } => {
                let event = AlertEvent::new(new_orders, new_reservations);
                let report = engine.raise_alert(&event);
                let mut via = vec!["Toast"];
                via.extend(report.fired_names());
                info!("Alert delivered via {}", via.join(", "));
                TickOutcome::Alerted(event)
            }
            Observation::Unchanged => TickOutcome::Unchanged,
        }
    }
}
