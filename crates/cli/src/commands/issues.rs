use anyhow::Result;
use jira_update_api::error::Result as ApiResult;
use jira_update_api::{display_value, ApiClient, Issue, SearchResult, UpdateRequest};
use jira_update_config::DisplayField;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::utils::{report_failure, JiraContext, Outcome};
use crate::query::SearchQuery;

pub const SEARCH_PATH: &str = "/rest/api/2/search";

// Request helpers

pub async fn search_issues(client: &ApiClient, query: &SearchQuery) -> ApiResult<SearchResult> {
    debug!(jql = %query, "Searching issues");
    client.get_json(&format!("{SEARCH_PATH}?jql={query}")).await
}

pub async fn fetch_issue(client: &ApiClient, self_uri: &str) -> ApiResult<Issue> {
    client.get_json(self_uri).await
}

pub async fn update_issue(client: &ApiClient, request: &UpdateRequest) -> ApiResult<()> {
    client.put_json(&request.self_uri, request).await
}

/// Search, take the first match and fetch its full record.
pub async fn locate_issue(client: &ApiClient, query: &SearchQuery) -> ApiResult<Issue> {
    let jql = query.to_string();
    let result = search_issues(client, query).await?;
    if result.issues.len() > 1 {
        info!(%jql, matches = result.issues.len(), "Using the first matching issue");
    }
    let found = result.into_first(&jql)?;
    fetch_issue(client, &found.self_uri).await
}

// Single-field update

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub query: SearchQuery,
    pub field_name: String,
    pub field_value: String,
}

/// Locates the issue and replaces one field, leaving every other field
/// alone. Returns the updated issue's key.
pub async fn apply_field_update(client: &ApiClient, update: &FieldUpdate) -> ApiResult<String> {
    let issue = locate_issue(client, &update.query).await?;

    println!("{}", update_notice(&issue, update));

    let request = UpdateRequest::single_field(
        issue,
        update.field_name.clone(),
        update.field_value.clone(),
    );
    update_issue(client, &request).await?;

    info!(key = %request.key, field = %update.field_name, "Issue updated successfully");
    Ok(request.key)
}

/// `Updating KEY: FIELD from 'OLD' to 'NEW'`
fn update_notice(issue: &Issue, update: &FieldUpdate) -> String {
    format!(
        "Updating {}: {} from '{}' to '{}'",
        issue.key,
        update.field_name,
        issue.field_text(&update.field_name),
        update.field_value
    )
}

pub async fn update_one(ctx: &JiraContext<'_>, update: &FieldUpdate) -> Outcome {
    match apply_field_update(&ctx.client, update).await {
        Ok(_) => Outcome::Success,
        Err(err) => {
            report_failure(&err);
            ctx.renderer.failure("see output");
            Outcome::Failed
        }
    }
}

// Find and display

pub async fn find_issue(ctx: &JiraContext<'_>, query: &SearchQuery) -> Result<Outcome> {
    let jql = query.to_string();

    let result = match search_issues(&ctx.client, query).await {
        Ok(result) => result,
        Err(err) => {
            report_failure(&err);
            return Ok(Outcome::Failed);
        }
    };

    let issue = match result.first(&jql) {
        Ok(issue) => issue,
        Err(err) => {
            report_failure(&err);
            return Ok(Outcome::Failed);
        }
    };

    let summary = issue_summary(issue, &ctx.display_fields)?;
    ctx.renderer.render(&summary)?;
    Ok(Outcome::Success)
}

/// Ordered `label -> value` view of an issue for display.
fn issue_summary(issue: &Issue, display_fields: &[DisplayField]) -> ApiResult<Map<String, Value>> {
    let mut summary = Map::new();
    summary.insert("Self".to_string(), Value::from(issue.self_uri.as_str()));
    summary.insert("Key".to_string(), Value::from(issue.key.as_str()));

    for display in display_fields {
        summary.insert(
            display.label.clone(),
            Value::from(display_value(issue.field(&display.field))),
        );
    }

    summary.insert("Fields".to_string(), Value::from(issue.member_names()));

    let attachments = issue.attachments()?;
    if !attachments.is_empty() {
        let listed: Vec<String> = attachments
            .iter()
            .map(|a| format!("{} ({})", a.filename, a.content))
            .collect();
        summary.insert("Attachments".to_string(), Value::from(listed));
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jira_update_api::error::ApiError;
    use jira_update_config::default_display_fields;
    use jira_update_output::{OutputFormat, OutputRenderer};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issue_json(server: &MockServer, id: &str, key: &str) -> Value {
        json!({
            "expand": "renderedFields,names",
            "id": id,
            "self": format!("{}/rest/api/2/issue/{}", server.uri(), id),
            "key": key,
            "fields": {
                "summary": "Broken widget",
                "customfield_12775": "42",
                "customfield_12850": "old"
            }
        })
    }

    async fn mount_search(server: &MockServer, jql: &str, issues: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("jql", jql))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 0,
                "maxResults": 50,
                "total": issues.len(),
                "issues": issues
            })))
            .mount(server)
            .await;
    }

    async fn mount_fetch(server: &MockServer, id: &str, key: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/api/2/issue/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(issue_json(server, id, key)))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri())
            .unwrap()
            .with_basic_auth("jdoe", "secret")
    }

    fn field_update(field: &str, value: &str) -> FieldUpdate {
        FieldUpdate {
            query: SearchQuery::new("key", "JIRA-123"),
            field_name: field.to_string(),
            field_value: value.to_string(),
        }
    }

    async fn put_bodies(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|req| req.method.as_str() == "PUT")
            .map(|req| serde_json::from_slice(&req.body).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_search_by_key_uses_exact_match() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-123", vec![issue_json(&server, "10001", "JIRA-123")])
            .await;

        let client = client_for(&server);
        let result = search_issues(&client, &SearchQuery::new("key", "JIRA-123"))
            .await
            .unwrap();

        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].key, "JIRA-123");
    }

    #[tokio::test]
    async fn test_search_custom_field_uses_contains_and_keeps_escaping() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            "\"Legacy Row No\"~M1-048",
            vec![issue_json(&server, "10002", "JIRA-200")],
        )
        .await;

        let client = client_for(&server);
        let query = SearchQuery::new("\"Legacy%20Row%20No\"", "M1-048");
        let result = search_issues(&client, &query).await.unwrap();

        assert_eq!(result.issues[0].key, "JIRA-200");
    }

    #[tokio::test]
    async fn test_search_failure_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("Field 'nope' does not exist"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = search_issues(&client, &SearchQuery::new("nope", "x"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_fetch_by_self_uri() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-123", vec![issue_json(&server, "10001", "JIRA-123")])
            .await;
        mount_fetch(&server, "10001", "JIRA-123").await;

        let client = client_for(&server);
        let result = search_issues(&client, &SearchQuery::new("key", "JIRA-123"))
            .await
            .unwrap();
        let issue = fetch_issue(&client, &result.issues[0].self_uri)
            .await
            .unwrap();

        assert_eq!(issue.key, "JIRA-123");
        assert_eq!(issue.field_text("customfield_12775"), "42");
    }

    #[tokio::test]
    async fn test_locate_with_no_matches() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-404", vec![]).await;

        let client = client_for(&server);
        let err = locate_issue(&client, &SearchQuery::new("key", "JIRA-404"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NoMatchingIssue { ref jql } if jql == "key=JIRA-404"));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_sends_single_field_and_needs_204() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-123", vec![issue_json(&server, "10001", "JIRA-123")])
            .await;
        mount_fetch(&server, "10001", "JIRA-123").await;
        Mock::given(method("PUT"))
            .and(path("/rest/api/2/issue/10001"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let key = apply_field_update(&client, &field_update("customfield_12850", "1234"))
            .await
            .unwrap();
        assert_eq!(key, "JIRA-123");

        let bodies = put_bodies(&server).await;
        assert_eq!(bodies.len(), 1);
        let fields = bodies[0]["fields"].as_object().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["customfield_12850"], "1234");
        assert_eq!(bodies[0]["key"], "JIRA-123");
    }

    #[tokio::test]
    async fn test_update_non_204_is_failure_with_status() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-123", vec![issue_json(&server, "10001", "JIRA-123")])
            .await;
        mount_fetch(&server, "10001", "JIRA-123").await;
        Mock::given(method("PUT"))
            .and(path("/rest/api/2/issue/10001"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"errors":{"customfield_12850":"not on screen"}}"#),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = apply_field_update(&client, &field_update("customfield_12850", "1234"))
            .await
            .unwrap_err();

        let diagnostic = err.to_string();
        assert!(diagnostic.contains("400"));
        assert!(diagnostic.contains("not on screen"));
    }

    #[tokio::test]
    async fn test_update_one_outcome() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-123", vec![]).await;

        let renderer = OutputRenderer::new(OutputFormat::Quiet);
        let ctx = JiraContext {
            client: client_for(&server),
            renderer: &renderer,
            display_fields: default_display_fields(),
        };

        let outcome = update_one(&ctx, &field_update("summary", "x")).await;
        assert_eq!(outcome, Outcome::Failed);
        assert!(put_bodies(&server).await.is_empty());
    }

    #[tokio::test]
    async fn test_find_issue_end_to_end() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-123", vec![issue_json(&server, "10001", "JIRA-123")])
            .await;

        let renderer = OutputRenderer::new(OutputFormat::Quiet);
        let ctx = JiraContext {
            client: client_for(&server),
            renderer: &renderer,
            display_fields: default_display_fields(),
        };

        let outcome = find_issue(&ctx, &SearchQuery::new("key", "JIRA-123"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn test_find_issue_without_match_fails() {
        let server = MockServer::start().await;
        mount_search(&server, "key=JIRA-9", vec![]).await;

        let renderer = OutputRenderer::new(OutputFormat::Quiet);
        let ctx = JiraContext {
            client: client_for(&server),
            renderer: &renderer,
            display_fields: default_display_fields(),
        };

        let outcome = find_issue(&ctx, &SearchQuery::new("key", "JIRA-9"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failed);
    }

    #[test]
    fn test_issue_summary_lines() {
        let issue: Issue = serde_json::from_value(json!({
            "expand": "renderedFields",
            "id": "10001",
            "self": "https://host/rest/api/2/issue/10001",
            "key": "JIRA-123",
            "fields": {
                "customfield_12775": "42",
                "attachment": [
                    {"filename": "a.txt", "content": "https://host/secure/attachment/1/a.txt"}
                ]
            }
        }))
        .unwrap();

        let summary = issue_summary(&issue, &default_display_fields()).unwrap();
        let labels: Vec<&str> = summary.keys().map(String::as_str).collect();

        assert_eq!(labels, vec!["Self", "Key", "Row #", "CFACTS", "Fields", "Attachments"]);
        assert_eq!(summary["Key"], "JIRA-123");
        assert_eq!(summary["Fields"], json!(["expand", "id", "self", "key", "fields"]));
        assert_eq!(summary["Row #"], "42");
        assert_eq!(summary["CFACTS"], "");
        assert_eq!(
            summary["Attachments"],
            json!(["a.txt (https://host/secure/attachment/1/a.txt)"])
        );
    }

    #[test]
    fn test_update_notice_shows_old_and_new_value() {
        let issue: Issue = serde_json::from_value(json!({
            "self": "https://host/rest/api/2/issue/10001",
            "key": "JIRA-123",
            "fields": {"customfield_12850": "old", "summary": null}
        }))
        .unwrap();

        assert_eq!(
            update_notice(&issue, &field_update("customfield_12850", "1234")),
            "Updating JIRA-123: customfield_12850 from 'old' to '1234'"
        );
        assert_eq!(
            update_notice(&issue, &field_update("summary", "New title")),
            "Updating JIRA-123: summary from '' to 'New title'"
        );
    }

    #[test]
    fn test_issue_summary_without_attachments() {
        let issue: Issue = serde_json::from_value(json!({
            "self": "https://host/rest/api/2/issue/1",
            "key": "A-1",
            "fields": {"attachment": []}
        }))
        .unwrap();

        let summary = issue_summary(&issue, &[]).unwrap();
        assert!(!summary.contains_key("Attachments"));
        assert_eq!(summary["Fields"], json!(["self", "key", "fields"]));
    }
}
