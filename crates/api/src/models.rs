//! Issue payloads exchanged with the Jira REST API (v2).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// Reserved field holding an issue's attachment metadata.
pub const ATTACHMENT_FIELD: &str = "attachment";

/// A single issue. Top-level members other than `key`, `self` and `fields`
/// (e.g. `id`, `expand`) are kept in `extra` so an update can echo them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(rename = "self")]
    pub self_uri: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field value as shown to the user; missing and `null` render empty.
    pub fn field_text(&self, name: &str) -> String {
        display_value(self.field(name))
    }

    /// Names of the issue's top-level members. Unknown members come first
    /// in payload order, matching Jira's `expand, id, self, key, fields`.
    pub fn member_names(&self) -> Vec<&str> {
        self.extra
            .keys()
            .map(String::as_str)
            .chain(["self", "key", "fields"])
            .collect()
    }

    /// Attachment list, or empty when the field is absent or `null`.
    pub fn attachments(&self) -> Result<Vec<Attachment>> {
        match self.field(ATTACHMENT_FIELD) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ApiError::InvalidResponse(format!(
                    "{}: malformed attachment list: {e}",
                    self.key
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
}

impl SearchResult {
    /// First matching issue; an empty result is an error rather than a panic.
    pub fn first(&self, jql: &str) -> Result<&Issue> {
        self.issues.first().ok_or_else(|| ApiError::NoMatchingIssue {
            jql: jql.to_string(),
        })
    }

    pub fn into_first(self, jql: &str) -> Result<Issue> {
        self.issues
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NoMatchingIssue {
                jql: jql.to_string(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub filename: String,
    /// URI the attachment body is downloaded from.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// PUT body for a single-field update.
///
/// Every field of the fetched issue except the one being changed is
/// dropped, so the server only touches that field.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRequest {
    pub key: String,
    #[serde(rename = "self")]
    pub self_uri: String,
    pub fields: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UpdateRequest {
    pub fn single_field(issue: Issue, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(name.into(), value.into());
        Self {
            key: issue.key,
            self_uri: issue.self_uri,
            fields,
            extra: issue.extra,
        }
    }
}

/// Renders a JSON value for display: strings unquoted, `null` and missing
/// as empty, everything else as compact JSON.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}
