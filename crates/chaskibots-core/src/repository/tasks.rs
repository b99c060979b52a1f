//! Student task submissions and grading.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{Repository, RepositoryError};
use crate::airtable::record::Entity;
use crate::airtable::{Formula, ListQuery, SortDirection, TableStore};
use crate::cache::keys;
use crate::models::{TaskStatus, TaskSubmission};

/// Highest grade on the vigesimal (0-20) school scale.
const MAX_GRADE: f64 = 20.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeTask {
    pub grade: f64,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl<S: TableStore> Repository<S> {
    pub async fn list_tasks(
        &self,
        student_id: Option<&str>,
    ) -> Result<Vec<Entity<TaskSubmission>>> {
        let query = ListQuery::new()
            .filter_opt(student_id.map(|id| Formula::eq("studentId", id)))
            .sort_by("submittedAt", SortDirection::Desc);
        self.cached_list(keys::tasks(student_id), self.ttls.tasks(), &self.tables.tasks, query)
            .await
    }

    /// Record a new submission. Grading fields from the client are ignored.
    pub async fn submit_task(&self, mut task: TaskSubmission) -> Result<Entity<TaskSubmission>> {
        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());
        if !present(&task.student_id) || !present(&task.lesson_id) {
            return Err(
                RepositoryError::Invalid("studentId and lessonId are required".to_string()).into(),
            );
        }
        if !present(&task.content) && !present(&task.link) {
            return Err(
                RepositoryError::Invalid("A submission needs content or a link".to_string()).into(),
            );
        }

        task.submitted_at = Some(Utc::now());
        task.status = Some(TaskStatus::Submitted);
        task.grade = None;
        task.feedback = None;
        self.create(&task).await
    }

    pub async fn grade_task(
        &self,
        record_id: &str,
        grade: &GradeTask,
    ) -> Result<Entity<TaskSubmission>> {
        if !grade.grade.is_finite() || !(0.0..=MAX_GRADE).contains(&grade.grade) {
            return Err(RepositoryError::Invalid(format!(
                "Grade must be between 0 and {}",
                MAX_GRADE
            ))
            .into());
        }

        let patch = TaskSubmission {
            grade: Some(grade.grade),
            feedback: grade.feedback.clone(),
            status: Some(TaskStatus::Graded),
            ..Default::default()
        };
        self.update(record_id, &patch).await
    }
}
