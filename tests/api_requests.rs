use mockito::Matcher;
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::json;

use fieldtask::api::endpoints::{SearchTasksParams, DEFAULT_PAGE};
use fieldtask::api::error::ApiError;
use fieldtask::api::{ApiClient, RequestOptions};
use fieldtask::session::{LoginInfo, SessionStore};
use fieldtask::storage::KvStorage;
use fieldtask::tasks::{NoticeStatus, TaskStatus};

async fn client(base_url: &str, token: Option<&str>) -> ApiClient {
    let storage = KvStorage::in_memory().await.unwrap();
    let session = SessionStore::open(storage).await.unwrap();
    if let Some(token) = token {
        session
            .update(|s| {
                s.set_login_info(LoginInfo {
                    token: Some(token.to_string()),
                    ..Default::default()
                })
            })
            .await
            .unwrap();
    }
    ApiClient::new(base_url, session)
}

#[tokio::test]
async fn fetch_tasks_posts_with_bearer() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tasks")
        .match_header("authorization", "Bearer abc")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "userid": "42",
            "date": "2024-05-01",
            "page": 1
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":0,"data":{"list":[{"id":5}],"total":1}}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Some("abc")).await;
    let res = api.fetch_tasks("2024-05-01", "42", DEFAULT_PAGE).await.unwrap();

    mock.assert_async().await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data["data"]["list"][0]["id"], 5);
}

#[tokio::test]
async fn no_bearer_without_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/task-detail")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({ "id": 9, "userid": "42" })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let api = client(&server.url(), None).await;
    api.get_task_detail(9, "42").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn auth_off_skips_bearer_even_with_token() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/version")
        .match_header("authorization", Matcher::Missing)
        .match_header("x-client", "fieldtask")
        .with_status(200)
        .with_body("1.2.0")
        .create_async()
        .await;

    let api = client(&server.url(), Some("abc")).await;
    let res = api
        .request(
            RequestOptions::new("/version")
                .auth(false)
                .header(
                    HeaderName::from_static("x-client"),
                    HeaderValue::from_static("fieldtask"),
                ),
        )
        .await
        .unwrap();

    mock.assert_async().await;
    // non-JSON bodies come back as a string
    assert_eq!(res.data, json!("1.2.0"));
}

#[tokio::test]
async fn get_sends_payload_as_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/lookup")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("userid".into(), "42".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let api = client(&server.url(), Some("abc")).await;
    api.request(RequestOptions::new("/lookup").payload(json!({ "userid": "42", "page": 2 })))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn every_endpoint_hits_its_path() {
    let mut server = mockito::Server::new_async().await;
    let expectations = [
        ("/search-tasks", json!({ "userid": "42", "yname": "Zhang" })),
        ("/update-remark", json!({ "id": 3, "remark": "gate code 1234", "userid": "42" })),
        ("/update-notice-status", json!({ "id": 3, "isnotice": 1, "userid": "42" })),
        ("/update-task-status", json!({ "id": 3, "status": 1, "userid": "42" })),
        (
            "/change-password",
            json!({ "userid": "42", "oldPassword": "old", "newPassword": "new" }),
        ),
        ("/all-tasks", json!({ "userid": "42", "date": "2024-05-01", "page": 3 })),
    ];

    let mut mocks = Vec::new();
    for (path, body) in expectations {
        mocks.push(
            server
                .mock("POST", path)
                .match_header("authorization", "Bearer abc")
                .match_body(Matcher::Json(body))
                .with_status(200)
                .with_body(r#"{"code":0}"#)
                .create_async()
                .await,
        );
    }

    let api = client(&server.url(), Some("abc")).await;
    let search = SearchTasksParams {
        userid: "42".into(),
        yname: Some("Zhang".into()),
        ..Default::default()
    };
    api.search_tasks(&search).await.unwrap();
    api.update_task_remark(3, "gate code 1234", "42").await.unwrap();
    api.update_notice_status(3, NoticeStatus::Notified, "42").await.unwrap();
    api.update_task_status(3, TaskStatus::Completed, "42").await.unwrap();
    api.change_password("42", "old", "new").await.unwrap();
    api.get_performance_data("42", "2024-05-01", 3).await.unwrap();

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn error_status_still_resolves() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/tasks")
        .with_status(500)
        .with_body(r#"{"message":"boom"}"#)
        .create_async()
        .await;

    let api = client(&server.url(), Some("abc")).await;
    let res = api.fetch_tasks("2024-05-01", "42", 1).await.unwrap();

    assert_eq!(res.status, 500);
    assert!(!res.is_success());
    assert_eq!(res.data["message"], "boom");
}

#[tokio::test]
async fn token_change_is_picked_up_by_next_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tasks")
        .match_header("authorization", "Bearer second")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let storage = KvStorage::in_memory().await.unwrap();
    let session = SessionStore::open(storage).await.unwrap();
    let api = ApiClient::new(&server.url(), session.clone());

    session
        .update(|s| {
            s.set_login_info(LoginInfo {
                token: Some("second".into()),
                ..Default::default()
            })
        })
        .await
        .unwrap();
    api.fetch_tasks("2024-05-01", "42", 1).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn transport_failure_is_an_error() {
    // nothing listens on the discard port
    let api = client("http://127.0.0.1:9", Some("abc")).await;
    let err = api.fetch_tasks("2024-05-01", "42", 1).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn nested_get_payload_fails_before_sending() {
    // nothing listens here; the error must come from encoding, not the network
    let api = client("http://127.0.0.1:9", Some("abc")).await;
    let err = api
        .request(RequestOptions::new("/lookup").payload(json!({ "filter": { "tel": "139" } })))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidQuery(_)));
}
