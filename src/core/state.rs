use super::alerts::triggers::{highest_id, new_items};
use super::model::WatchedList;

/// What one successful poll meant for the high-water marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// First poll: marks were set, nothing is reported
    Baseline { orders_mark: u64, reservations_mark: u64 },
    /// Marks advanced past newly seen records
    NewItems { new_orders: u64, new_reservations: u64 },
    Unchanged,
}

/// High-water marks of both feeds plus the baseline flag.
///
/// Marks only ever move forward and the baseline flag only ever goes from
/// true to false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    last_order_mark: u64,
    last_reservation_mark: u64,
    baseline: bool,
}

impl PollState {
    pub fn new() -> Self {
        Self {
            last_order_mark: 0,
            last_reservation_mark: 0,
            baseline: true,
        }
    }

    pub fn marks(&self) -> (u64, u64) {
        (self.last_order_mark, self.last_reservation_mark)
    }

    pub fn is_baseline(&self) -> bool {
        self.baseline
    }

    pub fn observe(&mut self, orders: &WatchedList, reservations: &WatchedList) -> Observation {
        let max_orders = highest_id(orders);
        let max_reservations = highest_id(reservations);

        if self.baseline {
            self.baseline = false;
            self.last_order_mark = max_orders;
            self.last_reservation_mark = max_reservations;
            return Observation::Baseline {
                orders_mark: max_orders,
                reservations_mark: max_reservations,
            };
        }

        let new_orders = new_items(orders, self.last_order_mark);
        let new_reservations = new_items(reservations, self.last_reservation_mark);

        if new_orders == 0 && new_reservations == 0 {
            return Observation::Unchanged;
        }

        self.last_order_mark = self.last_order_mark.max(max_orders);
        self.last_reservation_mark = self.last_reservation_mark.max(max_reservations);
        Observation::NewItems {
            new_orders,
            new_reservations,
        }
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[u64]) -> WatchedList {
        WatchedList::from_ids(ids)
    }

    #[test]
    fn test_first_poll_only_sets_baseline() {
        let mut state = PollState::new();
        assert!(state.is_baseline());

        let observation = state.observe(&ids(&[1, 2]), &ids(&[]));
        assert_eq!(
            observation,
            Observation::Baseline {
                orders_mark: 2,
                reservations_mark: 0
            }
        );
        assert_eq!(state.marks(), (2, 0));
        assert!(!state.is_baseline());
    }

    #[test]
    fn test_baseline_never_alerts_on_busy_feeds() {
        let mut state = PollState::new();
        let observation = state.observe(&ids(&[10, 11, 12]), &ids(&[4, 5]));
        assert!(matches!(observation, Observation::Baseline { .. }));
    }

    #[test]
    fn test_new_order_after_baseline() {
        let mut state = PollState::new();
        state.observe(&ids(&[1, 2]), &ids(&[]));

        let observation = state.observe(&ids(&[1, 2, 3]), &ids(&[]));
        assert_eq!(
            observation,
            Observation::NewItems {
                new_orders: 1,
                new_reservations: 0
            }
        );
        assert_eq!(state.marks(), (3, 0));

        // Same data again: nothing new, nothing reported twice
        assert_eq!(state.observe(&ids(&[1, 2, 3]), &ids(&[])), Observation::Unchanged);
        assert_eq!(state.marks(), (3, 0));
    }

    #[test]
    fn test_both_feeds_counted() {
        let mut state = PollState::new();
        state.observe(&ids(&[5]), &ids(&[7]));

        let observation = state.observe(&ids(&[5, 6, 8]), &ids(&[7, 9]));
        assert_eq!(
            observation,
            Observation::NewItems {
                new_orders: 2,
                new_reservations: 1
            }
        );
        assert_eq!(state.marks(), (8, 9));
    }

    #[test]
    fn test_marks_never_move_back() {
        let mut state = PollState::new();
        state.observe(&ids(&[10]), &ids(&[3]));

        // Records deleted upstream: highest id drops below the mark
        assert_eq!(state.observe(&ids(&[4]), &ids(&[])), Observation::Unchanged);
        assert_eq!(state.marks(), (10, 3));

        // A new reservation while orders stay below their mark
        let observation = state.observe(&ids(&[4]), &ids(&[5]));
        assert_eq!(
            observation,
            Observation::NewItems {
                new_orders: 0,
                new_reservations: 1
            }
        );
        assert_eq!(state.marks(), (10, 5));
    }

    #[test]
    fn test_empty_baseline_then_first_record() {
        let mut state = PollState::new();
        state.observe(&ids(&[]), &ids(&[]));
        let observation = state.observe(&ids(&[]), &ids(&[1]));
        assert_eq!(
            observation,
            Observation::NewItems {
                new_orders: 0,
                new_reservations: 1
            }
        );
    }
}
