//! Domain entities for SiteSpawner.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display key of the grand total record.
pub const TOTAL_KEY: &str = "Total:";

/// Lines hit versus lines instrumented for one subject and test type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CoverageCell {
    /// Number of instrumented lines that were executed.
    pub hit: u64,
    /// Number of instrumented lines.
    pub found: u64,
}

impl CoverageCell {
    /// A cell with no instrumented lines.
    pub const ZERO: Self = Self { hit: 0, found: 0 };

    /// Create a cell from hit and found counts.
    pub fn new(hit: u64, found: u64) -> Self {
        Self { hit, found }
    }

    /// Coverage percentage in `0..=100`, 0 when nothing is instrumented.
    pub fn percentage(&self) -> f64 {
        if self.found == 0 {
            0.0
        } else {
            self.hit as f64 / self.found as f64 * 100.0
        }
    }

    /// Componentwise sum, `None` if either count overflows.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self {
            hit: self.hit.checked_add(rhs.hit)?,
            found: self.found.checked_add(rhs.found)?,
        })
    }
}

/// Saturates at `u64::MAX`; the parser rejects sums that would overflow.
impl Add for CoverageCell {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            hit: self.hit.saturating_add(rhs.hit),
            found: self.found.saturating_add(rhs.found),
        }
    }
}

impl AddAssign for CoverageCell {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for CoverageCell {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a CoverageCell> for CoverageCell {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// Cells travel as `[hit, found]` pairs, the shape coverage templates expect.
impl Serialize for CoverageCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.hit, self.found).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CoverageCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (hit, found) = <(u64, u64)>::deserialize(deserializer)?;
        Ok(Self { hit, found })
    }
}

/// Mapping of test type name to its coverage value.
pub type CoverageRecord<C = CoverageCell> = BTreeMap<String, C>;

/// Coverage values keyed by subject (file path, directory or file name) and
/// test type, together with the grand total record.
///
/// The total is stored apart from the subjects so it can never be iterated
/// or summed as one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageTable<C = CoverageCell> {
    /// Per-subject records.
    pub subjects: BTreeMap<String, CoverageRecord<C>>,
    /// Grand total record, keyed by test type.
    pub total: CoverageRecord,
}

impl<C> Default for CoverageTable<C> {
    fn default() -> Self {
        Self {
            subjects: BTreeMap::new(),
            total: BTreeMap::new(),
        }
    }
}

impl<C> CoverageTable<C> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of test types across every subject and the total.
    pub fn test_types(&self) -> BTreeSet<String> {
        self.subjects
            .values()
            .flat_map(|record| record.keys())
            .chain(self.total.keys())
            .cloned()
            .collect()
    }

    /// Whether the table holds no subjects.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl CoverageTable {
    /// Look up a single cell.
    pub fn cell(&self, subject: &str, test_type: &str) -> Option<CoverageCell> {
        self.subjects
            .get(subject)
            .and_then(|record| record.get(test_type))
            .copied()
    }
}

impl<C: Serialize> Serialize for CoverageTable<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.subjects.len() + 1))?;
        for (subject, record) in &self.subjects {
            map.serialize_entry(subject, record)?;
        }
        map.serialize_entry(TOTAL_KEY, &self.total)?;
        map.end()
    }
}
