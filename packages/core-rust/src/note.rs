//! The note resource and the request bodies that create and modify it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{Constraint, FieldRules, Validate, ValidationErrors};

/// A persisted note as returned to clients.
///
/// `id` and `created_at` are assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned positive identifier.
    pub id: i64,
    /// Note title.
    pub title: String,
    /// Note body.
    pub content: String,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /notes`.
///
/// Missing fields decode as empty strings so that a well-formed body lacking
/// a field is rejected by [`Validate`], not by the JSON decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNote {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl Validate for CreateNote {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut rules = FieldRules::new();
        rules.check("title", &self.title, &[Constraint::Required]);
        rules.check("content", &self.content, &[Constraint::MinLen(1)]);
        rules.finish()
    }
}

/// Body of `PATCH /notes/{id}`.
///
/// `None` leaves the stored value untouched. The title must still be
/// supplied on every patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNote {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl Validate for UpdateNote {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut rules = FieldRules::new();
        rules.check_optional(
            "title",
            self.title.as_deref(),
            &[Constraint::Required, Constraint::MinLen(1)],
        );
        rules.check_optional("content", self.content.as_deref(), &[Constraint::MinLen(1)]);
        rules.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_note_missing_fields_decode_as_empty() {
        let dto: CreateNote = serde_json::from_str(r#"{"title":"a"}"#).unwrap();
        assert_eq!(dto.title, "a");
        assert_eq!(dto.content, "");
    }

    #[test]
    fn create_note_requires_title_and_content() {
        let ok = CreateNote {
            title: "a".into(),
            content: "b".into(),
        };
        assert!(ok.validate().is_ok());

        let empty_content = CreateNote {
            title: "a".into(),
            content: String::new(),
        };
        let err = empty_content.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["content"]);

        let err = CreateNote::default().validate().unwrap_err();
        assert_eq!(err.fields(), vec!["title", "content"]);
    }

    #[test]
    fn update_note_requires_title_but_content_is_optional() {
        let patch: UpdateNote = serde_json::from_str(r#"{"title":"new"}"#).unwrap();
        assert!(patch.validate().is_ok());

        let patch: UpdateNote = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        let err = patch.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["title"]);

        let patch = UpdateNote {
            title: Some("t".into()),
            content: Some(String::new()),
        };
        let err = patch.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["content"]);
    }

    #[test]
    fn note_serializes_with_wire_field_names() {
        let note = Note {
            id: 7,
            title: "t".into(),
            content: "c".into(),
            created_at: DateTime::from_timestamp(0, 0).unwrap(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["title"], "t");
        assert_eq!(json["content"], "c");
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
    }
}
