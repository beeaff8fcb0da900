use std::{cmp::Ordering, collections::BTreeSet};

use log::{debug, trace};

use diskplan_api::{
    config::{IfNotFound, Search, SearchCondition, SortCriterion, SortKey},
    devicegraph::{Device, Sid},
};

/// Devices claimed by earlier searches of the same pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumedDevices(BTreeSet<Sid>);

impl ConsumedDevices {
    pub fn contains(&self, sid: Sid) -> bool {
        self.0.contains(&sid)
    }

    pub fn claim(&mut self, sid: Sid) -> bool {
        self.0.insert(sid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Matched devices, in selection order.
    Found(Vec<Sid>),
    /// Nothing matched; carries what the caller should do about it.
    NotFound(IfNotFound),
}

fn matches_condition(condition: Option<&SearchCondition>, device: &Device) -> bool {
    match condition {
        None => true,
        Some(SearchCondition::Name(name)) => device.matches_name(name),
        Some(SearchCondition::Number(number)) => device.number() == Some(*number),
        Some(SearchCondition::Size(size)) => size.operator.matches(device.size(), size.value),
    }
}

fn compare(a: &Device, b: &Device, criteria: &[SortCriterion]) -> Ordering {
    criteria
        .iter()
        .map(|criterion| {
            let ordering = match criterion.key {
                SortKey::Name => a.name.cmp(&b.name),
                SortKey::Size => a.size().cmp(&b.size()),
                SortKey::Number => a.number().cmp(&b.number()),
            };
            if criterion.ascending {
                ordering
            } else {
                ordering.reverse()
            }
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.sid.cmp(&b.sid))
}

/// Matches a search against a candidate pool.
///
/// Candidates are filtered by the condition, already consumed devices are
/// dropped, and the rest is sorted (by name when no criteria are given, then
/// by sid) and capped. Every selected device is claimed in `consumed`.
pub fn resolve(search: &Search, pool: &[&Device], consumed: &mut ConsumedDevices) -> SearchOutcome {
    let mut candidates: Vec<&Device> = pool
        .iter()
        .copied()
        .filter(|d| matches_condition(search.condition.as_ref(), d))
        .filter(|d| !consumed.contains(d.sid))
        .collect();

    let default_sort = [SortCriterion::ascending(SortKey::Name)];
    let criteria = if search.sort.is_empty() {
        &default_sort[..]
    } else {
        search.sort.as_slice()
    };
    candidates.sort_by(|a, b| compare(a, b, criteria));

    trace!(
        "Search candidates: {:?}",
        candidates.iter().map(|d| d.name.as_str()).collect::<Vec<_>>()
    );

    if let Some(cap) = search.max.cap() {
        candidates.truncate(cap);
    }

    if candidates.is_empty() {
        debug!(
            "Search matched no device, ifNotFound is '{}'",
            <&str>::from(search.if_not_found)
        );
        return SearchOutcome::NotFound(search.if_not_found);
    }

    let found: Vec<Sid> = candidates.iter().map(|d| d.sid).collect();
    for sid in &found {
        consumed.claim(*sid);
    }
    debug!(
        "Search matched {:?}",
        candidates.iter().map(|d| d.name.as_str()).collect::<Vec<_>>()
    );
    SearchOutcome::Found(found)
}
