use jira_update_api::error::ApiError;
use jira_update_api::{ApiClient, Issue};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(server.uri())
        .unwrap()
        .with_basic_auth("jdoe", "secret")
}

#[tokio::test]
async fn test_get_json_sends_basic_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/10001"))
        .and(header("authorization", "Basic amRvZTpzZWNyZXQ="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "10001",
            "key": "JIRA-123",
            "self": format!("{}/rest/api/2/issue/10001", mock_server.uri()),
            "fields": {"summary": "Broken widget"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let issue: Issue = client.get_json("/rest/api/2/issue/10001").await.unwrap();

    assert_eq!(issue.key, "JIRA-123");
    assert_eq!(issue.field_text("summary"), "Broken widget");
}

#[tokio::test]
async fn test_get_json_non_200_is_unexpected_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Issue Does Not Exist"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .get_json::<Issue>("/rest/api/2/issue/404")
        .await
        .unwrap_err();

    match err {
        ApiError::UnexpectedStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Issue Does Not Exist");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_get_json_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .get_json::<Issue>("/rest/api/2/issue/1")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_put_json_requires_204() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/rest/api/2/issue/10001"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"fields": {"summary": "new"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client
        .put_json(
            "/rest/api/2/issue/10001",
            &json!({"fields": {"summary": "new"}}),
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_put_json_200_is_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/rest/api/2/issue/10001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .put_json("/rest/api/2/issue/10001", &json!({"fields": {}}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_download_streams_body_to_writer() {
    let mock_server = MockServer::start().await;
    let payload: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();

    Mock::given(method("GET"))
        .and(path("/secure/attachment/900/blob.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("blob.bin");
    let mut file = tokio::fs::File::create(&target).await.unwrap();

    let client = client_for(&mock_server);
    let written = client
        .download(
            &format!("{}/secure/attachment/900/blob.bin", mock_server.uri()),
            &mut file,
        )
        .await
        .unwrap();
    drop(file);

    assert_eq!(written, payload.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), payload);
}

#[tokio::test]
async fn test_download_failure_writes_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secure/attachment/901/missing.txt"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing.txt");
    let mut file = tokio::fs::File::create(&target).await.unwrap();

    let client = client_for(&mock_server);
    let err = client
        .download("/secure/attachment/901/missing.txt", &mut file)
        .await
        .unwrap_err();
    drop(file);

    assert_eq!(err.status(), Some(403));
    assert!(target.exists());
    assert_eq!(std::fs::read(&target).unwrap().len(), 0);
}
