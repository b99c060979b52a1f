//! Users and access-code login.

use anyhow::Result;
use tracing::{info, warn};

use super::{Repository, RepositoryError};
use crate::airtable::record::Entity;
use crate::airtable::{Formula, ListQuery, SortDirection, TableStore};
use crate::cache::keys;
use crate::models::user::{generate_access_code, normalize_access_code};
use crate::models::User;

/// Attempts at generating an access code that is not already taken.
const ACCESS_CODE_ATTEMPTS: usize = 5;

impl<S: TableStore> Repository<S> {
    pub async fn list_users(&self, course_id: Option<&str>) -> Result<Vec<Entity<User>>> {
        let query = ListQuery::new()
            .filter_opt(course_id.map(|id| Formula::eq("courseId", id)))
            .sort_by("name", SortDirection::Asc);
        self.cached_list(keys::users(course_id), self.ttls.users(), &self.tables.users, query)
            .await
    }

    /// Look up a user by access code, trimmed and compared case-insensitively.
    /// Never served from cache.
    pub async fn find_by_access_code(&self, code: &str) -> Result<Option<Entity<User>>> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        let query = ListQuery::new()
            .filter(Formula::eq_ignore_case("accessCode", code))
            .max_records(1);
        let users = self.store.list::<User>(&self.tables.users, &query).await?;
        Ok(users.into_iter().next().map(|u| u.into_entity()))
    }

    /// Authenticate with an access code, returning the profile without the code.
    pub async fn login(&self, code: &str) -> Result<Entity<User>> {
        let user = match self.find_by_access_code(code).await? {
            Some(user) if user.data.is_active() => user,
            Some(user) => {
                warn!(record_id = %user.record_id, "Login attempt for inactive user");
                return Err(RepositoryError::InvalidAccessCode.into());
            }
            None => return Err(RepositoryError::InvalidAccessCode.into()),
        };

        info!(record_id = %user.record_id, role = ?user.data.role, "User logged in");
        Ok(Entity {
            record_id: user.record_id,
            created_time: user.created_time,
            data: user.data.without_access_code(),
        })
    }

    /// Create a user, generating a unique access code when none is given.
    pub async fn create_user(&self, mut user: User) -> Result<Entity<User>> {
        if user.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
            return Err(RepositoryError::Invalid("User name is required".to_string()).into());
        }

        match user.access_code.as_deref().map(normalize_access_code) {
            Some(code) if !code.is_empty() => {
                if self.find_by_access_code(&code).await?.is_some() {
                    return Err(RepositoryError::Conflict(format!(
                        "Access code {} is already in use",
                        code
                    ))
                    .into());
                }
                user.access_code = Some(code);
            }
            _ => user.access_code = Some(self.unused_access_code(&user).await?),
        }

        self.create(&user).await
    }

    /// Partial update. A new access code is normalized and must not belong
    /// to another user.
    pub async fn update_user(&self, record_id: &str, mut patch: User) -> Result<Entity<User>> {
        if let Some(code) = patch.access_code.as_deref().map(normalize_access_code) {
            if code.is_empty() {
                return Err(
                    RepositoryError::Invalid("Access code cannot be blank".to_string()).into(),
                );
            }
            if let Some(owner) = self.find_by_access_code(&code).await? {
                if owner.record_id != record_id {
                    return Err(RepositoryError::Conflict(format!(
                        "Access code {} is already in use",
                        code
                    ))
                    .into());
                }
            }
            patch.access_code = Some(code);
        }
        self.update(record_id, &patch).await
    }

    async fn unused_access_code(&self, user: &User) -> Result<String> {
        for _ in 0..ACCESS_CODE_ATTEMPTS {
            let code = generate_access_code(user.role);
            if self.find_by_access_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(RepositoryError::Conflict("Could not generate a unique access code".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::repository;
    use super::*;
    use crate::models::Role;
    use serde_json::json;

    #[tokio::test]
    async fn test_login_with_access_code() {
        let repo = repository();
        repo.store().insert(
            "users",
            json!({"id": "U1", "name": "Luis", "role": "student", "accessCode": "EST-ABC234"}),
        );

        let user = repo.login("  est-abc234 ").await.unwrap();
        assert_eq!(user.data.name.as_deref(), Some("Luis"));
        assert_eq!(user.data.role, Some(Role::Student));
        assert!(user.data.access_code.is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_unknown_and_inactive() {
        let repo = repository();
        repo.store().insert(
            "users",
            json!({"id": "U2", "name": "Eva", "accessCode": "DOC-ZZZ999", "active": false}),
        );

        let err = repo.login("EST-NOPE22").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::InvalidAccessCode)
        ));
        assert!(repo.login("DOC-ZZZ999").await.is_err());
        assert!(repo.login("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_login_with_lowercase_stored_code() {
        let repo = repository();
        repo.store().insert("users", json!({"name": "Eva", "accessCode": "est-abc234"}));

        let exact = repo.login("est-abc234").await.unwrap();
        assert_eq!(exact.data.name.as_deref(), Some("Eva"));
        assert!(repo.login(" EST-ABC234 ").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_role_does_not_break_listing() {
        let repo = repository();
        repo.store().insert("users", json!({"name": "Luis", "role": "student"}));
        repo.store().insert("users", json!({"name": "Rosa", "role": "coordinador"}));

        let users = repo.list_users(None).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].data.role, Some(Role::Student));
        assert!(users[1].data.role.is_none());
    }

    #[tokio::test]
    async fn test_hostile_access_code_matches_nothing() {
        let repo = repository();
        repo.store().insert(
            "users",
            json!({"id": "U1", "name": "Luis", "accessCode": "EST-ABC234"}),
        );
        assert!(repo.login(r#"" , TRUE()) , OR(""#).await.is_err());
    }

    #[tokio::test]
    async fn test_create_user_generates_code() {
        let repo = repository();
        let created = repo
            .create_user(User {
                name: Some("Rosa".to_string()),
                role: Some(Role::Teacher),
                ..Default::default()
            })
            .await
            .unwrap();
        let code = created.data.access_code.clone().unwrap();
        assert!(code.starts_with("DOC-"));

        let found = repo.find_by_access_code(&code).await.unwrap().unwrap();
        assert_eq!(found.record_id, created.record_id);
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_code_and_missing_name() {
        let repo = repository();
        repo.store().insert("users", json!({"name": "Luis", "accessCode": "EST-ABC234"}));

        let dup = repo
            .create_user(User {
                name: Some("Otro".to_string()),
                access_code: Some("est-abc234".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            dup.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::Conflict(_))
        ));

        let nameless = repo.create_user(User::default()).await.unwrap_err();
        assert!(matches!(
            nameless.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_update_user_access_code() {
        let repo = repository();
        let luis = repo
            .store()
            .insert("users", json!({"name": "Luis", "accessCode": "EST-ABC234"}));
        let eva = repo.store().insert("users", json!({"name": "Eva", "accessCode": "EST-XYZ789"}));

        let taken = repo
            .update_user(
                &eva,
                User {
                    access_code: Some("est-abc234".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            taken.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::Conflict(_))
        ));

        // Re-saving your own code is fine
        let same = repo
            .update_user(
                &luis,
                User {
                    access_code: Some(" est-abc234".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.data.access_code.as_deref(), Some("EST-ABC234"));
        assert_eq!(same.data.name.as_deref(), Some("Luis"));
    }

    #[tokio::test]
    async fn test_users_by_course_invalidated_on_create() {
        let repo = repository();
        repo.store().insert("users", json!({"name": "A", "courseId": "course-1"}));
        assert_eq!(repo.list_users(Some("course-1")).await.unwrap().len(), 1);

        repo.create_user(User {
            name: Some("B".to_string()),
            course_id: Some("course-1".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(repo.list_users(Some("course-1")).await.unwrap().len(), 2);
    }
}
