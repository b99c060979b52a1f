//! Airtable record shapes, both as stored and as served to API clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of an Airtable table.
///
/// `id` is Airtable's own record id (`rec...`), distinct from any business
/// `id` field stored inside `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record<F> {
    pub id: String,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    pub fields: F,
}

impl<F> Record<F> {
    pub fn into_entity(self) -> Entity<F> {
        Entity {
            record_id: self.id,
            created_time: self.created_time,
            data: self.fields,
        }
    }
}

/// Domain shape returned by the HTTP API: the business fields flattened
/// next to the Airtable record id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity<F> {
    pub record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub data: F,
}

// Wire types for list/write endpoints

#[derive(Debug, Deserialize)]
pub(crate) struct ListPage<F> {
    #[serde(default = "Vec::new")]
    pub records: Vec<Record<F>>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WriteRequest<'a, F> {
    pub records: Vec<WriteRecord<'a, F>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WriteRecord<'a, F> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub fields: &'a F,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WriteResponse<F> {
    pub records: Vec<Record<F>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteResponse {
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase", default)]
    struct Fields {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        level_id: Option<String>,
    }

    #[test]
    fn test_parse_list_page() {
        let body = json!({
            "records": [
                {
                    "id": "recA",
                    "createdTime": "2024-03-01T12:00:00.000Z",
                    "fields": {"id": "p1", "levelId": "L1"}
                },
                {"id": "recB", "createdTime": "2024-03-02T12:00:00.000Z", "fields": {}}
            ],
            "offset": "itrX/recB"
        });
        let page: ListPage<Fields> = serde_json::from_value(body).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].fields.level_id.as_deref(), Some("L1"));
        assert_eq!(page.records[1].fields, Fields::default());
        assert_eq!(page.offset.as_deref(), Some("itrX/recB"));
    }

    #[test]
    fn test_last_page_has_no_offset() {
        let page: ListPage<Fields> = serde_json::from_value(json!({"records": []})).unwrap();
        assert!(page.offset.is_none());
    }

    #[test]
    fn test_write_request_shape() {
        let fields = Fields {
            level_id: Some("L2".to_string()),
            ..Default::default()
        };
        let body = WriteRequest {
            records: vec![WriteRecord { id: Some("recA"), fields: &fields }],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"records": [{"id": "recA", "fields": {"levelId": "L2"}}]})
        );

        let create = WriteRequest {
            records: vec![WriteRecord { id: None, fields: &fields }],
        };
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({"records": [{"fields": {"levelId": "L2"}}]})
        );
    }

    #[test]
    fn test_entity_flattens_fields() {
        let record = Record {
            id: "recA".to_string(),
            created_time: None,
            fields: Fields {
                id: Some("p1".to_string()),
                level_id: Some("L1".to_string()),
            },
        };
        assert_eq!(
            serde_json::to_value(record.into_entity()).unwrap(),
            json!({"recordId": "recA", "id": "p1", "levelId": "L1"})
        );
    }
}
