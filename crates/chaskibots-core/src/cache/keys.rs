//! Cache key builders.
//!
//! Every key has the form `{resource}:{filter}`. The unfiltered list of a
//! resource uses the filter `all`; filtered lists use the percent-encoded
//! filter value. Encoding keeps `:` and `%` inside a value from forging
//! another key, and the literal value `all` is encoded as `%61ll` so it can
//! never hit the unfiltered entry.
//!
//! Invalidate a whole resource with `cache.invalidate_prefix(&prefix(LEVELS))`.

use std::borrow::Cow;

pub const LEVELS: &str = "levels";
pub const PROGRAMS: &str = "programs";
pub const COURSES: &str = "courses";
pub const SCHOOLS: &str = "schools";
pub const KITS: &str = "kits";
pub const LESSONS: &str = "lessons";
pub const USERS: &str = "users";
pub const TEACHER_COURSES: &str = "teacher_courses";
pub const TASKS: &str = "tasks";

const ALL: &str = "all";

/// Prefix shared by every key of `resource`.
pub fn prefix(resource: &str) -> String {
    format!("{}:", resource)
}

/// Key for `resource`, optionally narrowed by one filter value.
pub fn scoped(resource: &str, filter: Option<&str>) -> String {
    match filter {
        None => format!("{}:{}", resource, ALL),
        Some(value) => format!("{}:{}", resource, encode_filter(value)),
    }
}

fn encode_filter(value: &str) -> Cow<'_, str> {
    if value == ALL {
        Cow::Borrowed("%61ll")
    } else {
        urlencoding::encode(value)
    }
}

pub fn levels() -> String {
    scoped(LEVELS, None)
}

pub fn programs(level_id: Option<&str>) -> String {
    scoped(PROGRAMS, level_id)
}

pub fn courses(school_id: Option<&str>) -> String {
    scoped(COURSES, school_id)
}

pub fn schools() -> String {
    scoped(SCHOOLS, None)
}

pub fn kits(level_id: Option<&str>) -> String {
    scoped(KITS, level_id)
}

pub fn lessons(level_id: Option<&str>) -> String {
    scoped(LESSONS, level_id)
}

pub fn users(course_id: Option<&str>) -> String {
    scoped(USERS, course_id)
}

pub fn teacher_courses(teacher_id: Option<&str>) -> String {
    scoped(TEACHER_COURSES, teacher_id)
}

pub fn tasks(student_id: Option<&str>) -> String {
    scoped(TASKS, student_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys() {
        assert_eq!(levels(), "levels:all");
        assert_eq!(kits(Some("L1")), "kits:L1");
        assert_eq!(kits(None), "kits:all");
        assert_eq!(users(Some("course-1")), "users:course-1");
        assert_eq!(users(None), "users:all");
        assert_eq!(teacher_courses(Some("T9")), "teacher_courses:T9");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(lessons(Some("Nivel 3")), lessons(Some("Nivel 3")));
    }

    #[test]
    fn test_literal_all_does_not_collide() {
        assert_ne!(users(Some("all")), users(None));
        assert_eq!(users(Some("all")), "users:%61ll");
    }

    #[test]
    fn test_separators_are_encoded() {
        // A value containing the separator must not look like a nested key
        assert_eq!(kits(Some("a:b")), "kits:a%3Ab");
        assert_ne!(kits(Some("a:b")), kits(Some("a%3Ab")));
        assert_eq!(kits(Some("Nivel 3")), "kits:Nivel%203");
    }

    #[test]
    fn test_keys_start_with_resource_prefix() {
        for key in [users(None), users(Some("x")), users(Some("all")), users(Some(""))] {
            assert!(key.starts_with(&prefix(USERS)));
        }
        // No resource prefix is a prefix of another resource's keys
        assert!(!teacher_courses(None).starts_with(&prefix(COURSES)));
        assert!(!tasks(None).starts_with(&prefix(TEACHER_COURSES)));
    }

    #[test]
    fn test_different_resources_do_not_collide() {
        assert_ne!(kits(Some("L1")), lessons(Some("L1")));
        assert_ne!(programs(Some("L1")), kits(Some("L1")));
    }
}
