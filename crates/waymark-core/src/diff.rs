//! Structural diff between two snapshots of a [`WorkItem`].
//!
//! The engine is pure and total: it never fails, and diffing a record with
//! itself yields an empty [`WorkItemDiff`]. Three comparison strategies are
//! used:
//!
//! - **scalar** fields compare by value and report `{from, to}`;
//! - **set-like** arrays (`acceptance_criteria`) ignore order and
//!   duplicates;
//! - **keyed** collections (`diagrams`, `test_cases`) match elements by `id`
//!   and report added, removed, modified and unchanged elements.
//!
//! `attributes` is an open map: every key present on either side whose
//! value differs gets an [`AttributeChange`]; equal keys are omitted.
//!
//! Record identity (`id`, `project_id`) is not compared. Callers pass two
//! versions of the same logical record.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::scalar::Scalar;
use crate::model::work_item::{Diagram, TestCase, WorkItem, WorkItemType};

/// A changed scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleChange<T> {
    pub from: T,
    pub to: T,
}

/// A changed attribute. An absent side means the key was not present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Scalar>,
}

impl AttributeChange {
    /// The key appeared in `after`.
    #[must_use]
    pub const fn is_addition(&self) -> bool {
        self.from.is_none()
    }

    /// The key disappeared from `after`.
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        self.to.is_none()
    }
}

/// Set-style change of an array field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayChange<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
    pub unchanged: Vec<T>,
}

/// Both versions of a keyed element whose content changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modified<T> {
    pub before: T,
    pub after: T,
}

/// Change of a collection keyed by element id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyedChange<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
    pub modified: Vec<Modified<T>>,
    pub unchanged: Vec<T>,
}

pub type DiagramChange = KeyedChange<Diagram>;
pub type TestCaseChange = KeyedChange<TestCase>;

/// An element with a stable identity inside a keyed collection.
///
/// Two elements with the same key are "unchanged" iff they are equal.
pub trait Keyed: PartialEq {
    fn key(&self) -> &str;
}

impl Keyed for Diagram {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for TestCase {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Field-by-field diff of two work item snapshots.
///
/// `None` means "no change" for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkItemDiff {
    pub title: Option<SimpleChange<String>>,
    pub description: Option<SimpleChange<String>>,
    #[serde(rename = "type")]
    pub item_type: Option<SimpleChange<WorkItemType>>,
    pub parent_id: Option<SimpleChange<Option<String>>>,
    pub validation_status: Option<SimpleChange<String>>,
    pub attributes: BTreeMap<String, AttributeChange>,
    pub acceptance_criteria: Option<ArrayChange<String>>,
    pub diagrams: Option<DiagramChange>,
    pub test_cases: Option<TestCaseChange>,
}

impl WorkItemDiff {
    /// Returns `true` if any field changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changed_fields().is_empty()
    }

    /// Wire names of the fields that changed, in declaration order.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("type", self.item_type.is_some()),
            ("parent_id", self.parent_id.is_some()),
            ("validation_status", self.validation_status.is_some()),
            ("attributes", !self.attributes.is_empty()),
            ("acceptance_criteria", self.acceptance_criteria.is_some()),
            ("diagrams", self.diagrams.is_some()),
            ("test_cases", self.test_cases.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, changed)| changed.then_some(name))
            .collect()
    }
}

/// Diff two snapshots of the same work item.
#[must_use]
pub fn diff(before: &WorkItem, after: &WorkItem) -> WorkItemDiff {
    WorkItemDiff {
        title: diff_scalar(&before.title, &after.title),
        description: diff_scalar(&before.description, &after.description),
        item_type: diff_scalar(&before.item_type, &after.item_type),
        parent_id: diff_scalar(&before.parent_id, &after.parent_id),
        validation_status: diff_scalar(&before.validation_status, &after.validation_status),
        attributes: diff_attributes(&before.attributes, &after.attributes),
        acceptance_criteria: diff_set(&before.acceptance_criteria, &after.acceptance_criteria),
        diagrams: diff_keyed(&before.diagrams, &after.diagrams),
        test_cases: diff_keyed(&before.test_cases, &after.test_cases),
    }
}

/// Returns `true` iff `diff` reports any change.
#[must_use]
pub fn has_diff(diff: &WorkItemDiff) -> bool {
    diff.has_changes()
}

/// Value comparison of one scalar field.
#[must_use]
pub fn diff_scalar<T: PartialEq + Clone>(before: &T, after: &T) -> Option<SimpleChange<T>> {
    (before != after).then(|| SimpleChange {
        from: before.clone(),
        to: after.clone(),
    })
}

/// Set comparison of two arrays: order and duplicates are ignored.
///
/// `added` and `unchanged` follow the order of `after`, `removed` the order
/// of `before`, each element listed once. Returns `None` when nothing was
/// added or removed.
#[must_use]
pub fn diff_set<T: Ord + Clone>(before: &[T], after: &[T]) -> Option<ArrayChange<T>> {
    let before_set: BTreeSet<&T> = before.iter().collect();
    let after_set: BTreeSet<&T> = after.iter().collect();

    let mut added = Vec::new();
    let mut unchanged = Vec::new();
    let mut seen = BTreeSet::new();
    for item in after {
        if !seen.insert(item) {
            continue;
        }
        if before_set.contains(item) {
            unchanged.push(item.clone());
        } else {
            added.push(item.clone());
        }
    }

    let mut removed = Vec::new();
    let mut seen = BTreeSet::new();
    for item in before {
        if seen.insert(item) && !after_set.contains(item) {
            removed.push(item.clone());
        }
    }

    if added.is_empty() && removed.is_empty() {
        return None;
    }
    Some(ArrayChange {
        added,
        removed,
        unchanged,
    })
}

/// Keyed comparison of two collections, matching elements by [`Keyed::key`].
///
/// When a key repeats within one side, its first occurrence is used and the
/// rest are ignored. Returns `None` when nothing was added, removed or
/// modified.
#[must_use]
pub fn diff_keyed<T: Keyed + Clone>(before: &[T], after: &[T]) -> Option<KeyedChange<T>> {
    let before_by_key = first_by_key(before);
    let after_by_key = first_by_key(after);

    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut unchanged = Vec::new();
    for (key, item) in unique_in_order(after) {
        match before_by_key.get(key) {
            None => added.push(item.clone()),
            Some(old) if *old == item => unchanged.push(item.clone()),
            Some(old) => modified.push(Modified {
                before: (*old).clone(),
                after: item.clone(),
            }),
        }
    }

    let removed: Vec<T> = unique_in_order(before)
        .filter(|(key, _)| !after_by_key.contains_key(key))
        .map(|(_, item)| item.clone())
        .collect();

    if added.is_empty() && removed.is_empty() && modified.is_empty() {
        return None;
    }
    Some(KeyedChange {
        added,
        removed,
        modified,
        unchanged,
    })
}

/// Per-key comparison of two attribute maps. Keys with equal values are
/// omitted.
#[must_use]
pub fn diff_attributes(
    before: &BTreeMap<String, Scalar>,
    after: &BTreeMap<String, Scalar>,
) -> BTreeMap<String, AttributeChange> {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let from = before.get(key);
            let to = after.get(key);
            (from != to).then(|| {
                (
                    key.clone(),
                    AttributeChange {
                        from: from.cloned(),
                        to: to.cloned(),
                    },
                )
            })
        })
        .collect()
}

fn first_by_key<T: Keyed>(items: &[T]) -> BTreeMap<&str, &T> {
    let mut map = BTreeMap::new();
    for item in items {
        map.entry(item.key()).or_insert(item);
    }
    map
}

fn unique_in_order<T: Keyed>(items: &[T]) -> impl Iterator<Item = (&str, &T)> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .map(|item| (item.key(), item))
        .filter(move |(key, _)| seen.insert(*key))
}
