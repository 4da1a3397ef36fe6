use std::cmp::Ordering;

use crate::model::{CanonicalRecord, DisplayRow, SortMode, ViewMode};
use crate::tree::build_forest;

/// Filters `records` to `view`, nests children under their roots, orders roots by `sort` and
/// flattens the result into display rows.
pub fn derive_rows(records: &[CanonicalRecord], view: ViewMode, sort: SortMode) -> Vec<DisplayRow> {
    let visible = records
        .iter()
        .filter(|record| view.admits(record.kind))
        .collect::<Vec<_>>();
    if visible.is_empty() {
        return Vec::new();
    }

    let mut forest = build_forest(&visible);
    forest.sort_groups_by(&visible, |left, right| compare_roots(left, right, sort));
    forest
        .flatten()
        .into_iter()
        .map(|(index, marker)| DisplayRow {
            record: visible[index].clone(),
            marker,
        })
        .collect()
}

pub fn compare_roots(left: &CanonicalRecord, right: &CanonicalRecord, sort: SortMode) -> Ordering {
    let primary = match sort {
        SortMode::ByStatus => left.status.priority().cmp(&right.status.priority()),
        SortMode::ByNextRun => match (left.next_run, right.next_run) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    primary
        .then_with(|| left.name.cmp(&right.name))
        .then_with(|| left.namespace.cmp(&right.namespace))
        .then_with(|| left.kind.cmp(&right.kind))
}
