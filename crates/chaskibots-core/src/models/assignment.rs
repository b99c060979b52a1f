use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A teacher assigned to a course (or program).
///
/// `level_id` is a copy of the level of `course_id`, kept so that a
/// teacher's dashboard can filter by level without a join. The sync job
/// repairs it when it drifts from the course/program table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct TeacherCourse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "super::lenient::datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TeacherCourse {
    /// Patch payload that only rewrites the denormalized level.
    pub fn level_patch(level_id: &str) -> Self {
        Self {
            level_id: Some(level_id.to_string()),
            ..Default::default()
        }
    }
}
