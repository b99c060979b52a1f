//! Levels, programs, courses, schools, kits and lessons.

use anyhow::Result;

use super::Repository;
use crate::airtable::record::Entity;
use crate::airtable::{Formula, ListQuery, SortDirection, TableStore};
use crate::cache::keys;
use crate::models::{Course, Kit, Lesson, Level, Program, School};

/// What a teacher can be assigned to: a course, or a program standing in
/// for one. Both live in the same business-id space.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseRef {
    pub name: Option<String>,
    pub level_id: Option<String>,
    pub school_id: Option<String>,
}

fn level_filter(level_id: Option<&str>) -> Option<Formula> {
    level_id.map(|id| Formula::eq("levelId", id))
}

impl<S: TableStore> Repository<S> {
    pub async fn list_levels(&self) -> Result<Vec<Entity<Level>>> {
        let query = ListQuery::new().sort_by("order", SortDirection::Asc);
        self.cached_list(keys::levels(), self.ttls.levels(), &self.tables.levels, query)
            .await
    }

    pub async fn list_programs(&self, level_id: Option<&str>) -> Result<Vec<Entity<Program>>> {
        let query = ListQuery::new()
            .filter_opt(level_filter(level_id))
            .sort_by("name", SortDirection::Asc);
        self.cached_list(
            keys::programs(level_id),
            self.ttls.programs(),
            &self.tables.programs,
            query,
        )
        .await
    }

    pub async fn list_courses(&self, school_id: Option<&str>) -> Result<Vec<Entity<Course>>> {
        let query = ListQuery::new()
            .filter_opt(school_id.map(|id| Formula::eq("schoolId", id)))
            .sort_by("name", SortDirection::Asc);
        self.cached_list(
            keys::courses(school_id),
            self.ttls.courses(),
            &self.tables.courses,
            query,
        )
        .await
    }

    pub async fn list_schools(&self) -> Result<Vec<Entity<School>>> {
        let query = ListQuery::new().sort_by("name", SortDirection::Asc);
        self.cached_list(keys::schools(), self.ttls.schools(), &self.tables.schools, query)
            .await
    }

    pub async fn list_kits(&self, level_id: Option<&str>) -> Result<Vec<Entity<Kit>>> {
        let query = ListQuery::new()
            .filter_opt(level_filter(level_id))
            .sort_by("order", SortDirection::Asc);
        self.cached_list(keys::kits(level_id), self.ttls.kits(), &self.tables.kits, query)
            .await
    }

    pub async fn list_lessons(&self, level_id: Option<&str>) -> Result<Vec<Entity<Lesson>>> {
        let query = ListQuery::new()
            .filter_opt(level_filter(level_id))
            .sort_by("order", SortDirection::Asc);
        self.cached_list(
            keys::lessons(level_id),
            self.ttls.lessons(),
            &self.tables.lessons,
            query,
        )
        .await
    }

    /// Resolve a course business id, checking courses before programs so
    /// the answer agrees with the sync job's precedence.
    pub async fn find_course(&self, course_id: &str) -> Result<Option<CourseRef>> {
        let by_id = || ListQuery::new().filter(Formula::eq("id", course_id)).max_records(1);

        let courses = self
            .store
            .list::<Course>(&self.tables.courses, &by_id())
            .await?;
        if let Some(course) = courses.into_iter().next() {
            return Ok(Some(CourseRef {
                name: course.fields.name,
                level_id: course.fields.level_id,
                school_id: course.fields.school_id,
            }));
        }

        let programs = self
            .store
            .list::<Program>(&self.tables.programs, &by_id())
            .await?;
        Ok(programs.into_iter().next().map(|program| CourseRef {
            name: program.fields.name,
            level_id: program.fields.level_id,
            school_id: None,
        }))
    }

    /// School display name by business id, from the cached school list.
    pub async fn school_name(&self, school_id: &str) -> Result<Option<String>> {
        let schools = self.list_schools().await?;
        Ok(schools
            .into_iter()
            .find(|s| s.data.id.as_deref() == Some(school_id))
            .and_then(|s| s.data.name))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::repository;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_levels_sorted_by_order() {
        let repo = repository();
        repo.store().insert("levels", json!({"id": "L3", "order": 3}));
        repo.store().insert("levels", json!({"id": "L1", "order": 1}));
        repo.store().insert("levels", json!({"id": "L2", "order": 2}));

        let ids: Vec<_> = repo
            .list_levels()
            .await
            .unwrap()
            .into_iter()
            .filter_map(|l| l.data.id)
            .collect();
        assert_eq!(ids, vec!["L1", "L2", "L3"]);
    }

    #[tokio::test]
    async fn test_kits_filtered_by_level_and_cached_per_filter() {
        let repo = repository();
        repo.store().insert("kits", json!({"id": "K1", "levelId": "L1"}));
        repo.store().insert("kits", json!({"id": "K2", "levelId": "L2"}));
        repo.store().insert("kits", json!({"id": "K3", "levelId": "L1"}));

        assert_eq!(repo.list_kits(Some("L1")).await.unwrap().len(), 2);
        assert_eq!(repo.list_kits(Some("L2")).await.unwrap().len(), 1);
        assert_eq!(repo.list_kits(None).await.unwrap().len(), 3);
        assert_eq!(repo.store().list_calls(), 3);

        repo.list_kits(Some("L1")).await.unwrap();
        assert_eq!(repo.store().list_calls(), 3);
        assert!(repo.cache().get::<Vec<Entity<Kit>>>(&keys::kits(Some("L2"))).is_some());
    }

    #[tokio::test]
    async fn test_lessons_and_programs_by_level() {
        let repo = repository();
        repo.store().insert("lessons", json!({"id": "LS1", "levelId": "L1", "order": 2}));
        repo.store().insert("lessons", json!({"id": "LS2", "levelId": "L1", "order": 1}));
        repo.store().insert("programs", json!({"id": "p1", "levelId": "L2", "name": "Robótica"}));

        let lessons = repo.list_lessons(Some("L1")).await.unwrap();
        assert_eq!(lessons[0].data.id.as_deref(), Some("LS2"));
        assert!(repo.list_programs(Some("L1")).await.unwrap().is_empty());
        assert_eq!(repo.list_programs(Some("L2")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_courses_by_school() {
        let repo = repository();
        repo.store().insert("courses", json!({"id": "C1", "schoolId": "S1"}));
        repo.store().insert("courses", json!({"id": "C2", "schoolId": "S2"}));
        let courses = repo.list_courses(Some("S2")).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].data.id.as_deref(), Some("C2"));
    }

    #[tokio::test]
    async fn test_find_course_prefers_courses_table() {
        let repo = repository();
        repo.store().insert("programs", json!({"id": "x", "levelId": "LP", "name": "Program X"}));
        repo.store().insert(
            "courses",
            json!({"id": "x", "levelId": "LC", "name": "Course X", "schoolId": "S1"}),
        );
        repo.store().insert("programs", json!({"id": "p1", "levelId": "L1", "name": "Program 1"}));

        let x = repo.find_course("x").await.unwrap().unwrap();
        assert_eq!(x.level_id.as_deref(), Some("LC"));
        assert_eq!(x.school_id.as_deref(), Some("S1"));

        let p1 = repo.find_course("p1").await.unwrap().unwrap();
        assert_eq!(p1.level_id.as_deref(), Some("L1"));
        assert_eq!(p1.name.as_deref(), Some("Program 1"));

        assert!(repo.find_course("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_school_name() {
        let repo = repository();
        repo.store().insert("schools", json!({"id": "S1", "name": "IE Los Andes"}));
        assert_eq!(repo.school_name("S1").await.unwrap().as_deref(), Some("IE Los Andes"));
        assert_eq!(repo.school_name("S9").await.unwrap(), None);
    }
}
