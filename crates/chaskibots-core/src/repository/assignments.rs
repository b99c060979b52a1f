//! Teacher-course assignments and their reconciliation.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Repository, RepositoryError};
use crate::airtable::record::Entity;
use crate::airtable::{Formula, ListQuery, TableStore};
use crate::cache::keys;
use crate::models::{Role, TeacherCourse, User};
use crate::sync::{self, OrphanReport, SyncOutcome, SyncReport};

/// Request to assign a teacher to a course or program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTeacher {
    pub teacher_id: String,
    pub course_id: String,
}

impl<S: TableStore> Repository<S> {
    pub async fn list_teacher_courses(
        &self,
        teacher_id: Option<&str>,
    ) -> Result<Vec<Entity<TeacherCourse>>> {
        let query = ListQuery::new().filter_opt(teacher_id.map(|id| Formula::eq("teacherId", id)));
        self.cached_list(
            keys::teacher_courses(teacher_id),
            self.ttls.teacher_courses(),
            &self.tables.teacher_courses,
            query,
        )
        .await
    }

    /// Create an assignment, copying names and the course's current level
    /// into the denormalized fields.
    pub async fn assign_teacher(&self, request: &AssignTeacher) -> Result<Entity<TeacherCourse>> {
        let teacher_id = request.teacher_id.trim();
        let course_id = request.course_id.trim();
        if teacher_id.is_empty() || course_id.is_empty() {
            return Err(
                RepositoryError::Invalid("teacherId and courseId are required".to_string()).into(),
            );
        }

        let teacher = self
            .store
            .list::<User>(
                &self.tables.users,
                &ListQuery::new().filter(Formula::eq("id", teacher_id)).max_records(1),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::NotFound(format!("Teacher {} not found", teacher_id)))?;
        if matches!(teacher.fields.role, Some(Role::Student)) {
            let reason = format!("User {} is not a teacher", teacher_id);
            return Err(RepositoryError::Invalid(reason).into());
        }

        let course = self
            .find_course(course_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Course {} not found", course_id)))?;

        let existing = self
            .store
            .list::<TeacherCourse>(
                &self.tables.teacher_courses,
                &ListQuery::new()
                    .filter(Formula::and([
                        Formula::eq("teacherId", teacher_id),
                        Formula::eq("courseId", course_id),
                    ]))
                    .max_records(1),
            )
            .await?;
        if !existing.is_empty() {
            return Err(RepositoryError::Conflict(format!(
                "Teacher {} is already assigned to {}",
                teacher_id, course_id
            ))
            .into());
        }

        let school_id = course.school_id.clone().or(teacher.fields.school_id.clone());
        let school_name = match school_id.as_deref() {
            Some(id) => self.school_name(id).await?,
            None => None,
        };

        let assignment = TeacherCourse {
            teacher_id: Some(teacher_id.to_string()),
            teacher_name: teacher.fields.name,
            course_id: Some(course_id.to_string()),
            course_name: course.name,
            level_id: course.level_id,
            school_id,
            school_name,
            created_at: Some(Utc::now()),
        };

        let created = self.create(&assignment).await?;
        info!(
            teacher_id = teacher_id,
            course_id = course_id,
            record_id = %created.record_id,
            "Assigned teacher to course"
        );
        Ok(created)
    }

    pub async fn unassign_teacher(&self, record_id: &str) -> Result<()> {
        self.delete::<TeacherCourse>(record_id).await?;
        info!(record_id = record_id, "Removed teacher assignment");
        Ok(())
    }

    pub async fn teacher_course_sync_report(&self) -> Result<SyncReport> {
        sync::dry_run(&self.store, &self.tables).await
    }

    /// Run the reconciliation in write mode and drop cached assignment lists
    /// if anything changed.
    pub async fn apply_teacher_course_sync(&self) -> Result<SyncOutcome> {
        let outcome = sync::apply(&self.store, &self.tables).await?;
        if outcome.stats.corrected > 0 {
            self.invalidate(keys::TEACHER_COURSES);
        }
        Ok(outcome)
    }

    pub async fn orphan_assignments(&self) -> Result<OrphanReport> {
        sync::orphan_report(&self.store, &self.tables).await
    }
}
