//! Bound reconciliation planning.
//!
//! Moving a filter bound turns into at most one store query plus one delta.
//! This module decides *which* query to run and how its answer changes the
//! tracked range, without performing any I/O. The engine runs the query
//! against its store and feeds the answer back through [`ReconcilePlan::apply`].
//!
//! Row ids are assumed strictly increasing and never reused, with timestamps
//! non-decreasing in row-id order. A store compaction that renumbers rows
//! breaks that assumption and the plans below will produce wrong deltas.

use logview_types::{Bound, RangeEvent, RowRange, Timestamp};

/// A store lookup: rows with timestamp in `[from, to)`, limited to `within`.
///
/// `from == UNBOUNDED` means no lower limit, `to == UNBOUNDED` no upper limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeQuery {
    /// Inclusive lower timestamp.
    pub from: Timestamp,
    /// Exclusive upper timestamp.
    pub to: Timestamp,
    /// Row scope, `None` for the whole store.
    pub within: Option<RowRange>,
}

/// What a bound change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Nothing can have entered or left the window.
    Unchanged,
    /// Rows may enter the window at `bound`.
    Grow {
        /// The bound that moved outwards.
        bound: Bound,
        /// Lookup for the entering rows.
        query: RangeQuery,
    },
    /// Rows may leave the window at `bound`.
    Shrink {
        /// The bound that moved inwards.
        bound: Bound,
        /// Lookup for the leaving rows.
        query: RangeQuery,
    },
}

/// Result of applying a store answer to the tracked range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The tracked range after the change.
    pub tracked: Option<RowRange>,
    /// The delta to publish, if any rows moved.
    pub event: Option<RangeEvent>,
}

/// Plan for moving the earliest bound from `old` to `new`.
pub fn plan_earliest(old: Timestamp, new: Timestamp, tracked: Option<RowRange>) -> ReconcilePlan {
    let (old_lo, new_lo) = (old.as_lower(), new.as_lower());

    if new_lo < old_lo {
        // Window grows backwards: rows in [new, old) before the tracked start.
        let within = match tracked {
            Some(t) => match RowRange::before(t.start()) {
                Some(scope) => Some(scope),
                None => return ReconcilePlan::Unchanged,
            },
            None => None,
        };
        return ReconcilePlan::Grow {
            bound: Bound::Earliest,
            query: RangeQuery {
                from: new,
                to: old,
                within,
            },
        };
    }

    if new_lo > old_lo {
        // Window shrinks from the front: rows in [old, new) inside the tracked range.
        if let Some(t) = tracked {
            return ReconcilePlan::Shrink {
                bound: Bound::Earliest,
                query: RangeQuery {
                    from: old,
                    to: new,
                    within: Some(t),
                },
            };
        }
    }

    ReconcilePlan::Unchanged
}

/// Plan for moving the latest bound from `old` to `new`.
///
/// Latest bounds are inclusive, so the lookups run over `(old, new]` and
/// `(new, old]` expressed as half-open intervals.
pub fn plan_latest(old: Timestamp, new: Timestamp, tracked: Option<RowRange>) -> ReconcilePlan {
    let (old_hi, new_hi) = (old.as_upper(), new.as_upper());

    if new_hi > old_hi {
        // old cannot be UNBOUNDED here: nothing is above "no upper limit".
        let within = match tracked {
            Some(t) => match RowRange::after(t.end()) {
                Some(scope) => Some(scope),
                None => return ReconcilePlan::Unchanged,
            },
            None => None,
        };
        return ReconcilePlan::Grow {
            bound: Bound::Latest,
            query: RangeQuery {
                from: old.exclusive_upper(),
                to: new.exclusive_upper(),
                within,
            },
        };
    }

    if new_hi < old_hi {
        if let Some(t) = tracked {
            return ReconcilePlan::Shrink {
                bound: Bound::Latest,
                query: RangeQuery {
                    from: new.exclusive_upper(),
                    to: old.exclusive_upper(),
                    within: Some(t),
                },
            };
        }
    }

    ReconcilePlan::Unchanged
}

impl ReconcilePlan {
    /// The store lookup this plan needs, if any.
    pub fn query(&self) -> Option<&RangeQuery> {
        match self {
            ReconcilePlan::Unchanged => None,
            ReconcilePlan::Grow { query, .. } | ReconcilePlan::Shrink { query, .. } => Some(query),
        }
    }

    /// Fold the store's answer into the tracked range.
    ///
    /// `found == None` (no matching rows, or the store was unavailable)
    /// leaves the range untouched and emits nothing.
    pub fn apply(&self, tracked: Option<RowRange>, found: Option<RowRange>) -> Reconciled {
        let unchanged = Reconciled {
            tracked,
            event: None,
        };
        let Some(found) = found else {
            return unchanged;
        };

        match *self {
            ReconcilePlan::Unchanged => unchanged,
            ReconcilePlan::Grow { bound, .. } => {
                let grown = match tracked {
                    Some(t) => t.hull(&found),
                    None => found,
                };
                Reconciled {
                    tracked: Some(grown),
                    event: Some(RangeEvent::Insert {
                        range: found,
                        affects: Some(bound),
                    }),
                }
            }
            ReconcilePlan::Shrink { bound, .. } => {
                let Some(t) = tracked else {
                    return unchanged;
                };
                let Some(removed) = t.intersect(&found) else {
                    return unchanged;
                };
                let shrunk = match bound {
                    Bound::Earliest => t.trim_front_through(removed.end()),
                    Bound::Latest => t.trim_back_from(removed.start()),
                };
                Reconciled {
                    tracked: shrunk,
                    event: Some(RangeEvent::Remove {
                        range: removed,
                        affects: bound,
                    }),
                }
            }
        }
    }
}

/// Extend the tracked range with freshly persisted rows.
///
/// Persisted rows always sit after everything already tracked, so this is a
/// hull; the returned event is a plain insert with no bound attached.
pub fn extend_with_persisted(tracked: Option<RowRange>, persisted: RowRange) -> Reconciled {
    let extended = match tracked {
        Some(t) => t.hull(&persisted),
        None => persisted,
    };
    Reconciled {
        tracked: Some(extended),
        event: Some(RangeEvent::Insert {
            range: persisted,
            affects: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logview_types::range;

    const T: Timestamp = Timestamp::new(1_000);
    const U: Timestamp = Timestamp::UNBOUNDED;

    fn ts(v: i64) -> Timestamp {
        Timestamp::new(v)
    }

    #[test]
    fn same_bound_is_unchanged() {
        assert_eq!(plan_earliest(T, T, Some(range(1, 5))), ReconcilePlan::Unchanged);
        assert_eq!(plan_latest(U, U, Some(range(1, 5))), ReconcilePlan::Unchanged);
    }

    #[test]
    fn earliest_decrease_queries_before_tracked_start() {
        let plan = plan_earliest(ts(500), ts(100), Some(range(10, 50)));
        let query = plan.query().unwrap();
        assert_eq!(query.from, ts(100));
        assert_eq!(query.to, ts(500));
        assert_eq!(query.within.unwrap().end(), 9);
        assert!(matches!(
            plan,
            ReconcilePlan::Grow {
                bound: Bound::Earliest,
                ..
            }
        ));
    }

    #[test]
    fn earliest_to_unbounded_is_a_decrease() {
        let plan = plan_earliest(ts(500), U, Some(range(10, 50)));
        let query = plan.query().unwrap();
        assert!(query.from.is_unbounded());
        assert_eq!(query.to, ts(500));
    }

    #[test]
    fn earliest_decrease_without_tracked_range_scans_whole_store() {
        let plan = plan_earliest(ts(500), ts(100), None);
        assert_eq!(plan.query().unwrap().within, None);
    }

    #[test]
    fn earliest_increase_queries_inside_tracked_range() {
        let plan = plan_earliest(U, T, Some(range(10, 50)));
        let query = plan.query().unwrap();
        assert!(query.from.is_unbounded());
        assert_eq!(query.to, T);
        assert_eq!(query.within, Some(range(10, 50)));
    }

    #[test]
    fn earliest_increase_without_tracked_range_is_unchanged() {
        assert_eq!(plan_earliest(U, T, None), ReconcilePlan::Unchanged);
    }

    #[test]
    fn grown_range_is_adjacent_to_old_start() {
        let tracked = Some(range(10, 50));
        let plan = plan_earliest(ts(500), ts(100), tracked);
        let out = plan.apply(tracked, Some(range(4, 9)));
        assert_eq!(out.tracked, Some(range(4, 50)));
        assert_eq!(
            out.event,
            Some(RangeEvent::Insert {
                range: range(4, 9),
                affects: Some(Bound::Earliest),
            })
        );
    }

    #[test]
    fn shrink_trims_front() {
        let tracked = Some(range(10, 50));
        let plan = plan_earliest(U, T, tracked);
        let out = plan.apply(tracked, Some(range(10, 20)));
        assert_eq!(out.tracked, Some(range(21, 50)));
        assert_eq!(
            out.event,
            Some(RangeEvent::Remove {
                range: range(10, 20),
                affects: Bound::Earliest,
            })
        );
    }

    #[test]
    fn shrink_past_everything_empties_range() {
        let tracked = Some(range(10, 50));
        let plan = plan_earliest(U, ts(9_999), tracked);
        let out = plan.apply(tracked, Some(range(10, 50)));
        assert_eq!(out.tracked, None);
        assert_eq!(
            out.event,
            Some(RangeEvent::Remove {
                range: range(10, 50),
                affects: Bound::Earliest,
            })
        );
    }

    #[test]
    fn latest_increase_queries_after_tracked_end() {
        let plan = plan_latest(ts(100), ts(200), Some(range(1, 5)));
        let query = plan.query().unwrap();
        assert_eq!(query.from, ts(101));
        assert_eq!(query.to, ts(201));
        assert_eq!(query.within.unwrap().start(), 6);
    }

    #[test]
    fn latest_to_unbounded_has_open_upper_limit() {
        let plan = plan_latest(ts(100), U, None);
        let query = plan.query().unwrap();
        assert_eq!(query.from, ts(101));
        assert!(query.to.is_unbounded());
        assert_eq!(query.within, None);
    }

    #[test]
    fn latest_from_unbounded_cannot_grow() {
        assert_eq!(plan_latest(U, U, None), ReconcilePlan::Unchanged);
    }

    #[test]
    fn latest_decrease_trims_back() {
        let tracked = Some(range(10, 50));
        let plan = plan_latest(U, ts(300), tracked);
        let query = plan.query().unwrap();
        assert_eq!(query.from, ts(301));
        assert!(query.to.is_unbounded());

        let out = plan.apply(tracked, Some(range(41, 50)));
        assert_eq!(out.tracked, Some(range(10, 40)));
        assert_eq!(
            out.event,
            Some(RangeEvent::Remove {
                range: range(41, 50),
                affects: Bound::Latest,
            })
        );
    }

    #[test]
    fn empty_answer_emits_nothing() {
        let tracked = Some(range(10, 50));
        let plan = plan_earliest(U, T, tracked);
        let out = plan.apply(tracked, None);
        assert_eq!(out.tracked, tracked);
        assert_eq!(out.event, None);
    }

    #[test]
    fn persisted_rows_extend_the_end() {
        let out = extend_with_persisted(None, range(1, 5));
        assert_eq!(out.tracked, Some(range(1, 5)));

        let out = extend_with_persisted(Some(range(1, 5)), range(6, 9));
        assert_eq!(out.tracked, Some(range(1, 9)));
        assert_eq!(
            out.event,
            Some(RangeEvent::Insert {
                range: range(6, 9),
                affects: None,
            })
        );
    }
}
