use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{BranchMarker, CanonicalRecord};

/// A root record and the indices of the records nested beneath it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Group {
    pub root: usize,
    pub children: Vec<usize>,
}

/// Parent/child layout over a record slice. Every index appears exactly once, either as a
/// root, as a child of one group, or as an orphan.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Forest {
    pub groups: Vec<Group>,
    pub orphans: Vec<usize>,
}

impl Forest {
    /// Reorders groups by their root record. Children keep their order.
    pub fn sort_groups_by<F>(&mut self, records: &[&CanonicalRecord], mut compare: F)
    where
        F: FnMut(&CanonicalRecord, &CanonicalRecord) -> Ordering,
    {
        self.groups
            .sort_by(|left, right| compare(records[left.root], records[right.root]));
    }

    pub fn len(&self) -> usize {
        self.groups
            .iter()
            .map(|group| 1 + group.children.len())
            .sum::<usize>()
            + self.orphans.len()
    }

    pub fn flatten(&self) -> Vec<(usize, BranchMarker)> {
        let mut rows = Vec::with_capacity(self.len());
        for group in &self.groups {
            rows.push((group.root, BranchMarker::Root));
            let last = group.children.len().saturating_sub(1);
            for (position, child) in group.children.iter().enumerate() {
                let marker = if position == last {
                    BranchMarker::Last
                } else {
                    BranchMarker::Mid
                };
                rows.push((*child, marker));
            }
        }
        rows.extend(
            self.orphans
                .iter()
                .map(|orphan| (*orphan, BranchMarker::Root)),
        );
        rows
    }
}

pub fn build_forest(records: &[&CanonicalRecord]) -> Forest {
    let mut groups = Vec::new();
    let mut roots_by_key: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        if record.parent_name().is_none() {
            roots_by_key
                .entry((record.namespace.as_str(), record.name.as_str()))
                .or_default()
                .push(groups.len());
            groups.push(Group {
                root: index,
                children: Vec::new(),
            });
        }
    }

    let mut orphans = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(parent) = record.parent.as_ref().filter(|parent| !parent.name.is_empty()) else {
            continue;
        };

        // Same-named roots of different kinds may share a namespace; prefer the one whose
        // kind matches the owner reference.
        let group = roots_by_key
            .get(&(record.namespace.as_str(), parent.name.as_str()))
            .and_then(|candidates| {
                candidates
                    .iter()
                    .find(|candidate| records[groups[**candidate].root].kind == parent.kind)
                    .or_else(|| candidates.first())
            })
            .copied();

        match group {
            Some(group) => groups[group].children.push(index),
            None => orphans.push(index),
        }
    }

    for group in &mut groups {
        group
            .children
            .sort_by(|left, right| compare_children(records[*left], records[*right]));
    }
    orphans.sort_by(|left, right| {
        let (left, right) = (records[*left], records[*right]);
        left.namespace
            .cmp(&right.namespace)
            .then_with(|| left.parent_name().cmp(&right.parent_name()))
            .then_with(|| compare_children(left, right))
    });

    Forest { groups, orphans }
}

/// Newest start first, unstarted last, then name descending.
fn compare_children(left: &CanonicalRecord, right: &CanonicalRecord) -> Ordering {
    let by_start = match (left.start_time, right.start_time) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_start.then_with(|| right.name.cmp(&left.name))
}

#[cfg(test)]
mod tests {
    use super::build_forest;
    use crate::model::{BranchMarker, CanonicalRecord, ParentRef, ResourceKind};
    use jiff::Timestamp;

    fn record(kind: ResourceKind, namespace: &str, name: &str) -> CanonicalRecord {
        CanonicalRecord::new(kind, namespace, name)
    }

    fn child(name: &str, parent: &str, started: Option<&str>) -> CanonicalRecord {
        let mut job = record(ResourceKind::Job, "ops", name);
        job.parent = Some(ParentRef {
            kind: ResourceKind::CronJob,
            name: parent.to_string(),
        });
        job.start_time = started.map(|value| value.parse::<Timestamp>().expect("timestamp"));
        job
    }

    fn names(records: &[&CanonicalRecord], rows: &[(usize, BranchMarker)]) -> Vec<(String, BranchMarker)> {
        rows.iter()
            .map(|(index, marker)| (records[*index].name.clone(), *marker))
            .collect()
    }

    #[test]
    fn children_nest_newest_first_with_branch_markers() {
        let owned = vec![
            child("nightly-1", "nightly", Some("2024-01-01T02:00:00Z")),
            record(ResourceKind::CronJob, "ops", "nightly"),
            child("nightly-2", "nightly", Some("2024-01-02T02:00:00Z")),
            child("nightly-0", "nightly", None),
        ];
        let records = owned.iter().collect::<Vec<_>>();

        let forest = build_forest(&records);
        let rows = names(&records, &forest.flatten());
        assert_eq!(
            rows,
            vec![
                ("nightly".to_string(), BranchMarker::Root),
                ("nightly-2".to_string(), BranchMarker::Mid),
                ("nightly-1".to_string(), BranchMarker::Mid),
                ("nightly-0".to_string(), BranchMarker::Last),
            ]
        );
    }

    #[test]
    fn unstarted_children_order_by_name_descending() {
        let owned = vec![
            record(ResourceKind::CronJob, "ops", "p"),
            child("p-a", "p", None),
            child("p-c", "p", None),
            child("p-b", "p", None),
        ];
        let records = owned.iter().collect::<Vec<_>>();
        let forest = build_forest(&records);
        assert_eq!(forest.groups[0].children, vec![2, 3, 1]);
    }

    #[test]
    fn missing_parent_leaves_orphans_after_groups() {
        let owned = vec![
            child("gone-1", "gone", Some("2024-01-01T00:00:00Z")),
            record(ResourceKind::CronJob, "ops", "kept"),
            child("kept-1", "kept", None),
        ];
        let records = owned.iter().collect::<Vec<_>>();

        let forest = build_forest(&records);
        assert_eq!(forest.orphans, vec![0]);
        let rows = names(&records, &forest.flatten());
        assert_eq!(
            rows,
            vec![
                ("kept".to_string(), BranchMarker::Root),
                ("kept-1".to_string(), BranchMarker::Last),
                ("gone-1".to_string(), BranchMarker::Root),
            ]
        );
    }

    #[test]
    fn parent_in_other_namespace_does_not_adopt() {
        let mut stranger = child("nightly-1", "nightly", None);
        stranger.namespace = "staging".to_string();
        let owned = vec![record(ResourceKind::CronJob, "ops", "nightly"), stranger];
        let records = owned.iter().collect::<Vec<_>>();

        let forest = build_forest(&records);
        assert!(forest.groups[0].children.is_empty());
        assert_eq!(forest.orphans, vec![1]);
    }

    #[test]
    fn same_named_roots_prefer_matching_kind() {
        let owned = vec![
            record(ResourceKind::Sensor, "ops", "nightly"),
            record(ResourceKind::CronJob, "ops", "nightly"),
            child("nightly-1", "nightly", None),
        ];
        let records = owned.iter().collect::<Vec<_>>();

        let forest = build_forest(&records);
        assert!(forest.groups[0].children.is_empty());
        assert_eq!(forest.groups[1].children, vec![2]);
    }

    #[test]
    fn every_record_appears_exactly_once() {
        let owned = vec![
            record(ResourceKind::CronJob, "ops", "a"),
            child("a-1", "a", Some("2024-01-01T00:00:00Z")),
            child("a-2", "a", Some("2024-01-01T01:00:00Z")),
            child("b-1", "b", None),
            record(ResourceKind::Workflow, "data", "etl"),
        ];
        let records = owned.iter().collect::<Vec<_>>();

        let forest = build_forest(&records);
        let mut seen = forest
            .flatten()
            .into_iter()
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(forest.len(), 5);
    }

    #[test]
    fn orphans_are_ordered_by_namespace_then_parent() {
        let mut late = child("z-1", "z", None);
        late.namespace = "b".to_string();
        let mut early = child("y-1", "y", None);
        early.namespace = "a".to_string();
        let mut sibling = child("x-1", "x", None);
        sibling.namespace = "a".to_string();
        let owned = vec![late, early, sibling];
        let records = owned.iter().collect::<Vec<_>>();

        let forest = build_forest(&records);
        assert_eq!(forest.orphans, vec![2, 1, 0]);
    }

    #[test]
    fn empty_input_builds_empty_forest() {
        let forest = build_forest(&[]);
        assert!(forest.flatten().is_empty());
    }
}
