//! The canonical course catalog: one entity per canonical code, plus the
//! merge, placeholder-resolution and edge-emission passes over it.
//!
//! The catalog is the single piece of mutable pipeline state. It is owned by
//! one build run and threaded explicitly through the stages; entity ids are
//! vector positions, so they are contiguous and creation-ordered by
//! construction and never reused.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use coursegraph_core::{
    Campus, CampusFlags, CourseEntity, Edge, RawCourseRecord, RequirementKind,
};
use serde::Serialize;
use thiserror::Error;

use crate::extract::extract_codes;
use crate::normalize::{canonical_code, level_alternate};

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Emission ran into a code that neither exists literally nor via its
    /// letter-to-digit alternate. Placeholder resolution guarantees this
    /// cannot happen, so hitting it means a pass was skipped or reordered.
    #[error("reference to {code} survived placeholder resolution")]
    DanglingReference { code: String },
}

/// Counters for one campus merge batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub created: usize,
    pub merged: usize,
    pub skipped_duplicates: usize,
}

#[derive(Debug, Default)]
pub struct CourseCatalog {
    entities: Vec<CourseEntity>,
    index: HashMap<String, usize>,
}

impl CourseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in id order.
    pub fn entities(&self) -> &[CourseEntity] {
        &self.entities
    }

    /// Exact-code lookup; no alternate mapping.
    pub fn get(&self, code: &str) -> Option<&CourseEntity> {
        self.index.get(code).map(|&i| &self.entities[i])
    }

    fn campus_fragment(campus: Campus, text: &str) -> String {
        format!("[{}: {}]", campus.tag(), text.trim())
    }

    /// Merge one campus's raw record batch. Campuses must be merged in
    /// [`Campus::ALL`] order — fragment order in the accumulated display
    /// strings is the processing order.
    ///
    /// Multiple raw source codes (lecture/tutorial section variants) can
    /// normalize to the same canonical code; only the first per batch is
    /// taken, the rest are counted as skipped.
    pub fn merge_campus(
        &mut self,
        campus: Campus,
        courses: &BTreeMap<String, RawCourseRecord>,
    ) -> MergeStats {
        let mut stats = MergeStats::default();
        let mut processed: HashSet<String> = HashSet::new();

        for (raw_code, record) in courses {
            let code = canonical_code(campus, raw_code);
            if !processed.insert(code.clone()) {
                stats.skipped_duplicates += 1;
                continue;
            }

            match self.index.get(&code).copied() {
                Some(i) => {
                    self.append_campus(&mut stats, i, campus, record);
                }
                None => {
                    self.create_from_record(&mut stats, code, campus, record);
                }
            }
        }

        stats
    }

    fn append_campus(
        &mut self,
        stats: &mut MergeStats,
        index: usize,
        campus: Campus,
        record: &RawCourseRecord,
    ) {
        let entity = &mut self.entities[index];
        entity.offered.set(campus);

        for kind in RequirementKind::ALL {
            let Some(text) = non_empty(record.requirement(kind)) else {
                continue;
            };
            let field = entity.requirement_text_mut(kind);
            field.push(' ');
            field.push_str(&Self::campus_fragment(campus, text));
            // An originally-empty field would otherwise keep the joining space.
            *field = field.trim_start().to_string();
        }

        stats.merged += 1;
    }

    fn create_from_record(
        &mut self,
        stats: &mut MergeStats,
        code: String,
        campus: Campus,
        record: &RawCourseRecord,
    ) {
        let id = self.entities.len();
        let mut entity = CourseEntity::placeholder(id, &code);
        entity.title = record.title.trim().to_string();
        entity.description = record
            .description
            .as_deref()
            .unwrap_or_default()
            .to_string();
        entity.offered = CampusFlags::only(campus);
        for kind in RequirementKind::ALL {
            if let Some(text) = non_empty(record.requirement(kind)) {
                *entity.requirement_text_mut(kind) = Self::campus_fragment(campus, text);
            }
        }

        self.index.insert(code, id);
        self.entities.push(entity);
        stats.created += 1;
    }

    /// Fill every entity's parsed reference sets from its accumulated
    /// requirement text. Run once, after all campus merges.
    pub fn parse_requirements(&mut self) {
        for entity in &mut self.entities {
            for kind in RequirementKind::ALL {
                *entity.parsed_mut(kind) = extract_codes(entity.requirement_text(kind));
            }
        }
    }

    /// Resolve a referenced code to an entity id, trying the literal code
    /// first and its letter-to-digit alternate second.
    fn resolve_code(&self, code: &str) -> Option<usize> {
        if let Some(&i) = self.index.get(code) {
            return Some(i);
        }
        level_alternate(code).and_then(|alt| self.index.get(&alt).copied())
    }

    /// Create a minimal entity for every referenced-but-unknown code so the
    /// emitted graph has no dangling endpoints. Returns how many were
    /// created. Requires [`parse_requirements`](Self::parse_requirements)
    /// to have run.
    pub fn resolve_placeholders(&mut self) -> usize {
        let mut missing: BTreeSet<String> = BTreeSet::new();
        for entity in &self.entities {
            for kind in RequirementKind::ALL {
                for code in entity.parsed(kind) {
                    if self.resolve_code(code).is_none() {
                        missing.insert(code.clone());
                    }
                }
            }
        }

        let created = missing.len();
        for code in missing {
            let id = self.entities.len();
            self.index.insert(code.clone(), id);
            self.entities.push(CourseEntity::placeholder(id, &code));
        }
        created
    }

    /// Emit the deduplicated directed edge set: requirement -> course, for
    /// prerequisites and corequisites only. Exclusions stay entity data.
    pub fn edges(&self) -> Result<Vec<Edge>, CatalogError> {
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut edges = Vec::new();

        for entity in &self.entities {
            for kind in RequirementKind::EDGE_KINDS {
                for code in entity.parsed(kind) {
                    let source =
                        self.resolve_code(code)
                            .ok_or_else(|| CatalogError::DanglingReference {
                                code: code.clone(),
                            })?;
                    if seen.insert((source, entity.id)) {
                        edges.push(Edge {
                            source,
                            target: entity.id,
                        });
                    }
                }
            }
        }

        Ok(edges)
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}
