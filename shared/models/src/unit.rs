use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Mapping from unit label to the identifiers the reference sheet assigns it.
///
/// Identifiers are compared as exact strings. Units iterate in the order they
/// first appeared in the reference sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitIdentifierMap {
    order: Vec<String>,
    identifiers: HashMap<String, BTreeSet<String>>,
}

impl UnitIdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `identifier` under `unit`. Returns `false` if it was already present.
    pub fn insert(&mut self, unit: impl Into<String>, identifier: impl Into<String>) -> bool {
        let unit = unit.into();
        if !self.identifiers.contains_key(&unit) {
            self.order.push(unit.clone());
        }
        self.identifiers.entry(unit).or_default().insert(identifier.into())
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn identifiers(&self, unit: &str) -> Option<&BTreeSet<String>> {
        self.identifiers.get(unit)
    }

    pub fn contains(&self, unit: &str, identifier: &str) -> bool {
        self.identifiers
            .get(unit)
            .is_some_and(|ids| ids.contains(identifier))
    }

    /// `(unit, identifiers)` pairs in sheet order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.order
            .iter()
            .filter_map(|unit| self.identifiers.get(unit).map(|ids| (unit.as_str(), ids)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn identifier_count(&self) -> usize {
        self.identifiers.values().map(BTreeSet::len).sum()
    }
}

impl<U, I> FromIterator<(U, I)> for UnitIdentifierMap
where
    U: Into<String>,
    I: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (U, I)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (unit, identifier) in iter {
            map.insert(unit, identifier);
        }
        map
    }
}

/// Identifiers of one unit actually observed in processed pages.
///
/// Only grows during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord(BTreeSet<String>);

impl MatchRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, identifier: impl Into<String>) -> bool {
        self.0.insert(identifier.into())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.0.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl FromIterator<String> for MatchRecord {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-run collection of [`MatchRecord`]s, one per unit of the reference map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchLedger {
    records: BTreeMap<String, MatchRecord>,
}

impl MatchLedger {
    /// Start an empty record for every unit in `map`.
    pub fn for_units(map: &UnitIdentifierMap) -> Self {
        Self {
            records: map
                .units()
                .map(|unit| (unit.to_string(), MatchRecord::new()))
                .collect(),
        }
    }

    /// Merge observed identifiers for `unit`.
    ///
    /// Identifiers outside the unit's entry in `map` are ignored, so a record
    /// never holds a string its unit does not own. Returns how many were new.
    pub fn absorb<'a>(
        &mut self,
        map: &UnitIdentifierMap,
        unit: &str,
        identifiers: impl IntoIterator<Item = &'a str>,
    ) -> usize {
        let Some(owned) = map.identifiers(unit) else {
            return 0;
        };
        let record = self.records.entry(unit.to_string()).or_default();

        identifiers
            .into_iter()
            .filter(|id| owned.contains(*id))
            .filter(|id| record.record(*id))
            .count()
    }

    pub fn record(&self, unit: &str) -> Option<&MatchRecord> {
        self.records.get(unit)
    }

    pub fn has_matches(&self, unit: &str) -> bool {
        self.records.get(unit).is_some_and(|record| !record.is_empty())
    }

    /// Identifiers of each unit that were never observed.
    pub fn unmatched(&self, map: &UnitIdentifierMap) -> BTreeMap<String, BTreeSet<String>> {
        map.iter()
            .map(|(unit, ids)| {
                let missing = ids
                    .iter()
                    .filter(|id| !self.records.get(unit).is_some_and(|r| r.contains(id)))
                    .cloned()
                    .collect();
                (unit.to_string(), missing)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MatchRecord)> {
        self.records.iter().map(|(unit, record)| (unit.as_str(), record))
    }

    pub fn into_sets(self) -> BTreeMap<String, BTreeSet<String>> {
        self.records
            .into_iter()
            .map(|(unit, record)| (unit, record.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> UnitIdentifierMap {
        [
            ("A12", "1234567890"),
            ("B07", "0012345678"),
            ("A12", "5555555555"),
            ("B07", "1234567890"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_units_keep_sheet_order() {
        let map = sample_map();
        assert_eq!(map.units().collect::<Vec<_>>(), vec!["A12", "B07"]);
        assert_eq!(map.identifier_count(), 4);
        assert!(map.contains("B07", "0012345678"));
        assert!(!map.contains("B07", "12345678"));
    }

    #[test]
    fn test_ledger_ignores_foreign_identifiers() {
        let map = sample_map();
        let mut ledger = MatchLedger::for_units(&map);

        let added = ledger.absorb(&map, "A12", ["1234567890", "0012345678", "1234567890"]);
        assert_eq!(added, 1);
        assert_eq!(ledger.record("A12").unwrap().len(), 1);
        assert!(!ledger.has_matches("B07"));
        assert_eq!(ledger.absorb(&map, "Z99", ["1234567890"]), 0);
    }

    #[test]
    fn test_unmatched_is_complement() {
        let map = sample_map();
        let mut ledger = MatchLedger::for_units(&map);
        ledger.absorb(&map, "A12", ["5555555555"]);

        let unmatched = ledger.unmatched(&map);
        assert_eq!(unmatched["A12"], BTreeSet::from(["1234567890".to_string()]));
        assert_eq!(unmatched["B07"].len(), 2);
    }
}
