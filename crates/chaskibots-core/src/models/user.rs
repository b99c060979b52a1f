use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters used in generated access codes.
/// Excludes 0/O and 1/I/L, which students routinely mistype.
const ACCESS_CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Length of the random part of an access code.
const ACCESS_CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "estudiante", alias = "Student", alias = "Estudiante")]
    Student,
    #[serde(alias = "docente", alias = "profesor", alias = "Teacher", alias = "Docente")]
    Teacher,
    #[serde(alias = "administrador", alias = "Admin", alias = "Administrador")]
    Admin,
}

impl Role {
    fn code_prefix(self) -> &'static str {
        match self {
            Role::Student => "EST",
            Role::Teacher => "DOC",
            Role::Admin => "ADM",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(deserialize_with = "super::lenient::select")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl User {
    /// Users are active unless explicitly deactivated.
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }

    /// Copy safe to hand back to the user who just logged in.
    pub fn without_access_code(mut self) -> Self {
        self.access_code = None;
        self
    }
}

/// Generate a new access code such as `EST-7KQ2MZ`.
pub fn generate_access_code(role: Option<Role>) -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..ACCESS_CODE_LENGTH)
        .map(|_| ACCESS_CODE_ALPHABET[rng.gen_range(0..ACCESS_CODE_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", role.unwrap_or(Role::Student).code_prefix(), code)
}

/// Canonical form for storing a new access code: trimmed and uppercased.
/// Lookups compare case-insensitively, so older mixed-case codes still match.
pub fn normalize_access_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_aliases() {
        let user: User = serde_json::from_value(json!({"role": "docente"})).unwrap();
        assert_eq!(user.role, Some(Role::Teacher));
        let user: User = serde_json::from_value(json!({"role": "Estudiante"})).unwrap();
        assert_eq!(user.role, Some(Role::Student));
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
    }

    #[test]
    fn test_unknown_role_is_dropped() {
        let user: User =
            serde_json::from_value(json!({"name": "Rosa", "role": "coordinador"})).unwrap();
        assert!(user.role.is_none());
        assert_eq!(user.name.as_deref(), Some("Rosa"));
    }

    #[test]
    fn test_generate_access_code() {
        let code = generate_access_code(Some(Role::Teacher));
        assert!(code.starts_with("DOC-"));
        assert_eq!(code.len(), 4 + ACCESS_CODE_LENGTH);
        assert!(code[4..].bytes().all(|b| ACCESS_CODE_ALPHABET.contains(&b)));

        assert!(generate_access_code(None).starts_with("EST-"));
    }

    #[test]
    fn test_normalize_access_code() {
        assert_eq!(normalize_access_code("  est-7kq2mz \n"), "EST-7KQ2MZ");
    }

    #[test]
    fn test_without_access_code() {
        let user = User {
            name: Some("Luis".to_string()),
            access_code: Some("EST-AAAAAA".to_string()),
            ..Default::default()
        };
        let safe = user.without_access_code();
        assert!(safe.access_code.is_none());
        assert_eq!(safe.name.as_deref(), Some("Luis"));
    }

    #[test]
    fn test_active_default() {
        assert!(User::default().is_active());
        let inactive = User {
            active: Some(false),
            ..Default::default()
        };
        assert!(!inactive.is_active());
    }
}
