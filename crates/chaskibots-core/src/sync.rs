//! Teacher-course level reconciliation.
//!
//! `teacher_courses.levelId` is a denormalized copy of the level of the
//! referenced course or program. This job rebuilds the authoritative
//! business-id → level map from the `programs` and `courses` tables and
//! repairs assignments that drifted from it.
//!
//! The job holds no lock and is not transactional. Corrections are written
//! one at a time; a failed write is recorded and the batch continues.
//! Re-running converges whatever was not fixed and is a no-op otherwise.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::airtable::{Record, TableStore};
use crate::config::TableNames;
use crate::models::academic::HasLevel;
use crate::models::{Course, Program, TeacherCourse};

/// Business id (course or program) → authoritative level id.
pub type LevelIdMap = HashMap<String, String>;

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn insert_levels<'a, T: HasLevel + 'a>(map: &mut LevelIdMap, items: impl Iterator<Item = &'a T>) {
    for item in items {
        let id = non_empty(item.business_id());
        if let (Some(id), Some(level)) = (id, non_empty(item.level_id())) {
            map.insert(id.to_string(), level.to_string());
        }
    }
}

/// Build the level map. Courses are applied after programs, so a course
/// wins when both tables define the same business id.
pub fn build_level_map(programs: &[Record<Program>], courses: &[Record<Course>]) -> LevelIdMap {
    let mut map = LevelIdMap::new();
    insert_levels(&mut map, programs.iter().map(|r| &r.fields));
    insert_levels(&mut map, courses.iter().map(|r| &r.fields));
    map
}

/// One assignment whose level must change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub record_id: String,
    pub course_id: String,
    pub course_name: Option<String>,
    pub teacher_name: Option<String>,
    pub old_level_id: Option<String>,
    pub new_level_id: String,
}

/// Corrections needed, in the order the assignments were fetched.
/// Assignments whose course is unknown are left alone.
pub fn find_corrections(
    assignments: &[Record<TeacherCourse>],
    levels: &LevelIdMap,
) -> Vec<Correction> {
    assignments
        .iter()
        .filter_map(|record| {
            let fields = &record.fields;
            let course_id = non_empty(fields.course_id.as_deref())?;
            let correct = levels.get(course_id)?;
            if fields.level_id.as_deref() == Some(correct.as_str()) {
                return None;
            }
            Some(Correction {
                record_id: record.id.clone(),
                course_id: course_id.to_string(),
                course_name: fields.course_name.clone(),
                teacher_name: fields.teacher_name.clone(),
                old_level_id: fields.level_id.clone(),
                new_level_id: correct.clone(),
            })
        })
        .collect()
}

/// Everything one run needs, fetched fresh from the store.
#[derive(Debug)]
pub struct Snapshot {
    pub total_programs: usize,
    pub total_courses: usize,
    pub assignments: Vec<Record<TeacherCourse>>,
    pub levels: LevelIdMap,
    /// Every business id present in programs or courses, with or without a level.
    pub known_ids: HashSet<String>,
}

pub async fn load_snapshot<S: TableStore>(store: &S, tables: &TableNames) -> Result<Snapshot> {
    let (programs, courses) = futures::try_join!(
        store.list_all::<Program>(&tables.programs),
        store.list_all::<Course>(&tables.courses),
    )?;
    let levels = build_level_map(&programs, &courses);

    let known_ids = programs
        .iter()
        .filter_map(|r| non_empty(r.fields.id.as_deref()))
        .chain(courses.iter().filter_map(|r| non_empty(r.fields.id.as_deref())))
        .map(str::to_string)
        .collect();

    let assignments = store
        .list_all::<TeacherCourse>(&tables.teacher_courses)
        .await?;

    Ok(Snapshot {
        total_programs: programs.len(),
        total_courses: courses.len(),
        assignments,
        levels,
        known_ids,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inconsistency {
    pub course_id: String,
    pub course_name: Option<String>,
    pub teacher_name: Option<String>,
    pub current_level_id: Option<String>,
    pub correct_level_id: String,
}

impl From<&Correction> for Inconsistency {
    fn from(c: &Correction) -> Self {
        Self {
            course_id: c.course_id.clone(),
            course_name: c.course_name.clone(),
            teacher_name: c.teacher_name.clone(),
            current_level_id: c.old_level_id.clone(),
            correct_level_id: c.new_level_id.clone(),
        }
    }
}

/// Dry-run result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub total_assignments: usize,
    pub total_programs: usize,
    pub total_courses: usize,
    pub inconsistencies: Vec<Inconsistency>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub total_assignments: usize,
    pub corrections_needed: usize,
    pub corrected: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionError {
    pub record_id: String,
    pub course_id: String,
    pub error: String,
}

/// Write-mode result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    pub stats: SyncStats,
    pub corrections: Vec<Correction>,
    pub errors: Vec<CorrectionError>,
}

/// Report inconsistencies without writing anything.
pub async fn dry_run<S: TableStore>(store: &S, tables: &TableNames) -> Result<SyncReport> {
    let snapshot = load_snapshot(store, tables).await?;
    let corrections = find_corrections(&snapshot.assignments, &snapshot.levels);

    let message = if corrections.is_empty() {
        "All teacher course assignments have the correct level".to_string()
    } else {
        format!("Found {} assignments with an outdated level", corrections.len())
    };

    info!(
        assignments = snapshot.assignments.len(),
        inconsistencies = corrections.len(),
        "Teacher course sync dry run"
    );

    Ok(SyncReport {
        success: true,
        total_assignments: snapshot.assignments.len(),
        total_programs: snapshot.total_programs,
        total_courses: snapshot.total_courses,
        inconsistencies: corrections.iter().map(Inconsistency::from).collect(),
        message,
    })
}

/// Apply every correction, one update per record. A failed update is
/// recorded in `errors` and does not stop the remaining ones.
pub async fn apply<S: TableStore>(store: &S, tables: &TableNames) -> Result<SyncOutcome> {
    let snapshot = load_snapshot(store, tables).await?;
    let corrections = find_corrections(&snapshot.assignments, &snapshot.levels);

    let mut corrected = 0;
    let mut errors = Vec::new();

    for correction in &corrections {
        let patch = TeacherCourse::level_patch(&correction.new_level_id);
        match store
            .update(&tables.teacher_courses, &correction.record_id, &patch)
            .await
        {
            Ok(_) => {
                corrected += 1;
                info!(
                    record_id = %correction.record_id,
                    course_id = %correction.course_id,
                    old_level = ?correction.old_level_id,
                    new_level = %correction.new_level_id,
                    "Corrected teacher course level"
                );
            }
            Err(e) => {
                warn!(
                    record_id = %correction.record_id,
                    error = %e,
                    "Failed to correct teacher course level"
                );
                errors.push(CorrectionError {
                    record_id: correction.record_id.clone(),
                    course_id: correction.course_id.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    let message = if corrections.is_empty() {
        "All teacher course assignments already have the correct level".to_string()
    } else if errors.is_empty() {
        format!("Corrected {} assignments", corrected)
    } else {
        format!(
            "Corrected {} of {} assignments, {} failed",
            corrected,
            corrections.len(),
            errors.len()
        )
    };

    Ok(SyncOutcome {
        success: true,
        message,
        stats: SyncStats {
            total_assignments: snapshot.assignments.len(),
            corrections_needed: corrections.len(),
            corrected,
            errors: errors.len(),
        },
        corrections,
        errors,
    })
}

/// An assignment whose course no longer exists in programs or courses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanAssignment {
    pub record_id: String,
    pub teacher_id: Option<String>,
    pub teacher_name: Option<String>,
    pub course_id: Option<String>,
    pub course_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanReport {
    pub success: bool,
    pub total_assignments: usize,
    pub orphans: Vec<OrphanAssignment>,
    pub message: String,
}

pub fn find_orphans(
    assignments: &[Record<TeacherCourse>],
    known_ids: &HashSet<String>,
) -> Vec<OrphanAssignment> {
    assignments
        .iter()
        .filter(|record| match non_empty(record.fields.course_id.as_deref()) {
            Some(id) => !known_ids.contains(id),
            None => true,
        })
        .map(|record| OrphanAssignment {
            record_id: record.id.clone(),
            teacher_id: record.fields.teacher_id.clone(),
            teacher_name: record.fields.teacher_name.clone(),
            course_id: record.fields.course_id.clone(),
            course_name: record.fields.course_name.clone(),
        })
        .collect()
}

/// List assignments pointing at courses that no longer exist. Read-only.
pub async fn orphan_report<S: TableStore>(store: &S, tables: &TableNames) -> Result<OrphanReport> {
    let snapshot = load_snapshot(store, tables).await?;
    let orphans = find_orphans(&snapshot.assignments, &snapshot.known_ids);
    let message = if orphans.is_empty() {
        "Every assignment references an existing course or program".to_string()
    } else {
        format!("Found {} assignments without a matching course or program", orphans.len())
    };
    Ok(OrphanReport {
        success: true,
        total_assignments: snapshot.assignments.len(),
        orphans,
        message,
    })
}
