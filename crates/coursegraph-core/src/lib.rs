//! Core domain model for the course graph pipeline.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "coursegraph-core";

/// The three data sources whose course offerings partially overlap.
///
/// The variant order is also the merge processing order: UTSG establishes
/// the base entity set, UTM and UTSC merge into it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Campus {
    Utsg,
    Utm,
    Utsc,
}

impl Campus {
    pub const ALL: [Campus; 3] = [Campus::Utsg, Campus::Utm, Campus::Utsc];

    /// Tag used in campus-tagged requirement fragments and table columns.
    pub fn tag(self) -> &'static str {
        match self {
            Campus::Utsg => "UTSG",
            Campus::Utm => "UTM",
            Campus::Utsc => "UTSC",
        }
    }

    /// File stem of the persisted per-campus dataset.
    pub fn dataset_stem(self) -> &'static str {
        match self {
            Campus::Utsg => "utsg_courses",
            Campus::Utm => "utm_courses",
            Campus::Utsc => "utsc_courses",
        }
    }
}

impl std::fmt::Display for Campus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// The three free-text requirement fields carried by every course record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequirementKind {
    Prerequisites,
    Corequisites,
    Exclusions,
}

impl RequirementKind {
    pub const ALL: [RequirementKind; 3] = [
        RequirementKind::Prerequisites,
        RequirementKind::Corequisites,
        RequirementKind::Exclusions,
    ];

    /// The two kinds that produce graph edges. Exclusions stay entity data.
    pub const EDGE_KINDS: [RequirementKind; 2] = [
        RequirementKind::Prerequisites,
        RequirementKind::Corequisites,
    ];
}

/// Uniform intermediate record shape produced by the campus adapters,
/// one per raw source-specific course code. Absent fields stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawCourseRecord {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prerequisites: Option<String>,
    #[serde(default)]
    pub corequisites: Option<String>,
    #[serde(default)]
    pub exclusions: Option<String>,
}

impl RawCourseRecord {
    pub fn requirement(&self, kind: RequirementKind) -> Option<&str> {
        match kind {
            RequirementKind::Prerequisites => self.prerequisites.as_deref(),
            RequirementKind::Corequisites => self.corequisites.as_deref(),
            RequirementKind::Exclusions => self.exclusions.as_deref(),
        }
    }
}

/// Persisted output of one campus mining run, keyed by raw source code.
/// `BTreeMap` keeps merge batches deterministic across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampusDataset {
    pub campus: Campus,
    pub fetched_at: DateTime<Utc>,
    pub courses: BTreeMap<String, RawCourseRecord>,
}

/// Per-campus presence flags. Monotonic: merging only ever sets a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CampusFlags {
    pub utsg: bool,
    pub utm: bool,
    pub utsc: bool,
}

impl CampusFlags {
    pub fn only(campus: Campus) -> Self {
        let mut flags = Self::default();
        flags.set(campus);
        flags
    }

    pub fn set(&mut self, campus: Campus) {
        match campus {
            Campus::Utsg => self.utsg = true,
            Campus::Utm => self.utm = true,
            Campus::Utsc => self.utsc = true,
        }
    }

    pub fn get(&self, campus: Campus) -> bool {
        match campus {
            Campus::Utsg => self.utsg,
            Campus::Utm => self.utm,
            Campus::Utsc => self.utsc,
        }
    }
}

/// One node of the output graph: a distinct course under its canonical code.
///
/// `id` is assigned at creation, strictly increasing and never reused; the
/// final id set is always the contiguous range `0..N`. Requirement display
/// strings accumulate campus-tagged fragments (`[UTSG: ...] [UTM: ...]`)
/// during merging; the parsed sets are filled once, after all merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEntity {
    pub id: usize,
    pub code: String,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub offered: CampusFlags,
    pub prerequisites: String,
    pub corequisites: String,
    pub exclusions: String,
    pub parsed_prerequisites: BTreeSet<String>,
    pub parsed_corequisites: BTreeSet<String>,
    pub parsed_exclusions: BTreeSet<String>,
}

impl CourseEntity {
    /// Minimal entity for a code that was referenced but never scraped.
    pub fn placeholder(id: usize, code: &str) -> Self {
        Self {
            id,
            code: code.to_string(),
            title: String::new(),
            description: String::new(),
            subject: subject_of(code),
            offered: CampusFlags::default(),
            prerequisites: String::new(),
            corequisites: String::new(),
            exclusions: String::new(),
            parsed_prerequisites: BTreeSet::new(),
            parsed_corequisites: BTreeSet::new(),
            parsed_exclusions: BTreeSet::new(),
        }
    }

    pub fn requirement_text(&self, kind: RequirementKind) -> &str {
        match kind {
            RequirementKind::Prerequisites => &self.prerequisites,
            RequirementKind::Corequisites => &self.corequisites,
            RequirementKind::Exclusions => &self.exclusions,
        }
    }

    pub fn requirement_text_mut(&mut self, kind: RequirementKind) -> &mut String {
        match kind {
            RequirementKind::Prerequisites => &mut self.prerequisites,
            RequirementKind::Corequisites => &mut self.corequisites,
            RequirementKind::Exclusions => &mut self.exclusions,
        }
    }

    pub fn parsed(&self, kind: RequirementKind) -> &BTreeSet<String> {
        match kind {
            RequirementKind::Prerequisites => &self.parsed_prerequisites,
            RequirementKind::Corequisites => &self.parsed_corequisites,
            RequirementKind::Exclusions => &self.parsed_exclusions,
        }
    }

    pub fn parsed_mut(&mut self, kind: RequirementKind) -> &mut BTreeSet<String> {
        match kind {
            RequirementKind::Prerequisites => &mut self.parsed_prerequisites,
            RequirementKind::Corequisites => &mut self.parsed_corequisites,
            RequirementKind::Exclusions => &mut self.parsed_exclusions,
        }
    }
}

/// First three characters of a canonical code, e.g. `CSC` for `CSC108H1`.
pub fn subject_of(code: &str) -> String {
    code.chars().take(3).collect()
}

/// Directed requirement edge (prerequisite/corequisite -> course).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
}

impl Edge {
    /// Fixed type tag emitted for every edge.
    pub const TYPE: &'static str = "Directed";
    /// Fixed weight emitted for every edge.
    pub const WEIGHT: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campus_order_is_the_merge_order() {
        assert_eq!(Campus::ALL, [Campus::Utsg, Campus::Utm, Campus::Utsc]);
    }

    #[test]
    fn campus_flags_are_monotonic_per_campus() {
        let mut flags = CampusFlags::only(Campus::Utsg);
        assert!(flags.get(Campus::Utsg));
        assert!(!flags.get(Campus::Utm));
        flags.set(Campus::Utsc);
        assert!(flags.get(Campus::Utsg) && flags.get(Campus::Utsc));
    }

    #[test]
    fn placeholder_entities_are_empty_apart_from_identity() {
        let entity = CourseEntity::placeholder(7, "MAT137Y1");
        assert_eq!(entity.id, 7);
        assert_eq!(entity.subject, "MAT");
        assert!(entity.title.is_empty());
        assert!(!entity.offered.get(Campus::Utsg));
        assert!(entity.parsed_prerequisites.is_empty());
    }

    #[test]
    fn subject_is_safe_on_short_codes() {
        assert_eq!(subject_of("AB"), "AB");
        assert_eq!(subject_of("CSC108H1"), "CSC");
    }
}
