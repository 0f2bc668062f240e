use std::time::Duration;

use async_trait::async_trait;
use rbxluau_core::api::{ApiError, ApiErrorKind, LogGroup, LuauTask, LuauTaskApi, TaskLogsPage, TaskTarget};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const BODY_PREVIEW_LIMIT: usize = 512;
const LOG_PAGE_SIZE: &str = "100";
const MAX_LOG_PAGES: usize = 1_000;

fn from_reqwest(err: reqwest::Error, url: &str) -> ApiError {
    let kind = if err.is_timeout() {
        ApiErrorKind::Timeout
    } else if err.is_connect() {
        ApiErrorKind::Connect
    } else if err.is_request() {
        ApiErrorKind::Request
    } else if err.is_body() {
        ApiErrorKind::Body
    } else if err.is_decode() {
        ApiErrorKind::Decode
    } else {
        ApiErrorKind::Unknown
    };
    let status = err.status().map(|s| s.as_u16());
    ApiError::new(kind, err.to_string())
        .with_status(status)
        .with_url(url)
        .with_source(err)
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().nth(BODY_PREVIEW_LIMIT).is_some() {
        out.push_str("...");
    }
    out
}

async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp.text().await.map_err(|err| from_reqwest(err, &url))?;

    if !status.is_success() {
        return Err(ApiError::status_error(status.as_u16(), url, preview_body(&body)));
    }

    serde_json::from_str::<T>(&body).map_err(|err| {
        ApiError::new(
            ApiErrorKind::Decode,
            format!(
                "failed to decode response body: {} | body={}",
                err,
                preview_body(&body)
            ),
        )
        .with_status(Some(status.as_u16()))
        .with_url(url)
        .with_source(err)
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceVersion {
    version_number: u64,
}

/// Roblox Open Cloud client for Luau execution tasks and place uploads.
///
/// The API key and user agent are fixed at construction and sent with
/// every request.
#[derive(Clone)]
pub struct OpenCloudClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenCloudClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        user_agent: &str,
        timeout_ms: u64,
    ) -> anyhow::Result<Self> {
        let mut key = HeaderValue::from_str(api_key.trim())?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn tasks_url(&self, target: &TaskTarget) -> String {
        let place = format!(
            "{}/cloud/v2/universes/{}/places/{}",
            self.base_url, target.universe_id, target.place_id
        );
        match target.version {
            Some(version) => format!("{place}/versions/{version}/luau-execution-session-tasks"),
            None => format!("{place}/luau-execution-session-tasks"),
        }
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{}/cloud/v2/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Publishes `place` as a new saved version and returns its number.
    pub async fn upload_place(
        &self,
        universe_id: &str,
        place_id: &str,
        place: Vec<u8>,
    ) -> Result<u64, ApiError> {
        let url = format!(
            "{}/universes/v1/{}/places/{}/versions",
            self.base_url, universe_id, place_id
        );
        tracing::debug!(stage = "open_cloud.upload_place.in", url = %url, bytes = place.len());
        let resp = self
            .http
            .post(&url)
            .query(&[("versionType", "Saved")])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(place)
            .send()
            .await
            .map_err(|err| from_reqwest(err, &url))?;
        let version: PlaceVersion = parse_json(resp).await?;
        tracing::info!(version = version.version_number, "place uploaded");
        Ok(version.version_number)
    }
}

#[async_trait]
impl LuauTaskApi for OpenCloudClient {
    async fn create_task(
        &self,
        target: &TaskTarget,
        script: &str,
        timeout: Duration,
    ) -> Result<LuauTask, ApiError> {
        let url = self.tasks_url(target);
        let timeout = format!("{}s", timeout.as_secs().max(1));
        tracing::debug!(stage = "open_cloud.create.in", url = %url, script_len = script.len(), timeout = %timeout);
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "script": script, "timeout": timeout }))
            .send()
            .await
            .map_err(|err| from_reqwest(err, &url))?;
        let task: LuauTask = parse_json(resp).await?;
        tracing::debug!(stage = "open_cloud.create.out", task_path = %task.path);
        Ok(task)
    }

    async fn get_task(&self, path: &str) -> Result<LuauTask, ApiError> {
        let url = self.resource_url(path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| from_reqwest(err, &url))?;
        parse_json(resp).await
    }

    async fn get_logs(&self, path: &str) -> Result<Vec<LogGroup>, ApiError> {
        let url = format!("{}/logs", self.resource_url(path));
        let mut groups = Vec::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_LOG_PAGES {
            let mut req = self.http.get(&url).query(&[("maxPageSize", LOG_PAGE_SIZE)]);
            if let Some(t) = token.as_deref() {
                req = req.query(&[("pageToken", t)]);
            }
            let resp = req.send().await.map_err(|err| from_reqwest(err, &url))?;
            let page: TaskLogsPage = parse_json(resp).await?;
            groups.extend(page.groups);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => return Ok(groups),
            }
        }

        tracing::warn!(task_path = %path, pages = MAX_LOG_PAGES, "log pagination cut short");
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rbxluau_core::api::TaskState;

    const TASK: &str = "universes/1/places/2/luau-execution-session-tasks/t1";

    fn client(url: &str) -> OpenCloudClient {
        OpenCloudClient::new(url, "secret", "rbxluau/test", 1_000).unwrap()
    }

    fn target(version: Option<u64>) -> TaskTarget {
        TaskTarget {
            universe_id: "1".into(),
            place_id: "2".into(),
            version,
        }
    }

    #[test]
    fn preview_body_empty_and_truncated() {
        assert_eq!(preview_body("   "), "<empty body>");
        let preview = preview_body(&"a".repeat(BODY_PREVIEW_LIMIT + 10));
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), BODY_PREVIEW_LIMIT + 3);
    }

    #[tokio::test]
    async fn create_task_sends_key_agent_and_timeout() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/cloud/v2/universes/1/places/2/luau-execution-session-tasks")
            .match_header("x-api-key", "secret")
            .match_header("user-agent", "rbxluau/test")
            .match_body(Matcher::Json(serde_json::json!({"script": "print(1)", "timeout": "60s"})))
            .with_status(200)
            .with_body(format!(r#"{{"path":"{TASK}","state":"QUEUED"}}"#))
            .create_async()
            .await;

        let task = client(&server.url())
            .create_task(&target(None), "print(1)", Duration::from_secs(60))
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(task.path, TASK);
        assert_eq!(task.state, TaskState::Queued);
    }

    #[tokio::test]
    async fn create_task_targets_version() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/cloud/v2/universes/1/places/2/versions/7/luau-execution-session-tasks")
            .with_status(200)
            .with_body(format!(r#"{{"path":"{TASK}"}}"#))
            .create_async()
            .await;

        client(&server.url())
            .create_task(&target(Some(7)), "print(1)", Duration::from_secs(30))
            .await
            .unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn get_task_parses_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", format!("/cloud/v2/{TASK}").as_str())
            .with_status(200)
            .with_body(r#"{"state":"FAILED","error":{"code":"INTERNAL","message":"boom"}}"#)
            .create_async()
            .await;

        let task = client(&server.url()).get_task(TASK).await.unwrap();
        assert_eq!(task.state, TaskState::Failed);
        assert_eq!(task.error.unwrap().message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn server_error_is_transient_status() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", format!("/cloud/v2/{TASK}").as_str())
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = client(&server.url()).get_task(TASK).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Status);
        assert_eq!(err.status(), Some(503));
        assert!(err.is_transient());
        assert!(err.url().unwrap_or_default().contains("/cloud/v2/universes/1"));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", format!("/cloud/v2/{TASK}").as_str())
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server.url()).get_task(TASK).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Decode);
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        let err = client("http://127.0.0.1:1").get_task(TASK).await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Connect);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn logs_follow_page_tokens() {
        let mut server = Server::new_async().await;
        let logs_path = format!("/cloud/v2/{TASK}/logs");
        let first = server
            .mock("GET", logs_path.as_str())
            .match_query(Matcher::Regex("^maxPageSize=100$".into()))
            .with_status(200)
            .with_body(r#"{"luauExecutionSessionTaskLogs":[{"messages":["a","b"]}],"nextPageToken":"p2"}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", logs_path.as_str())
            .match_query(Matcher::UrlEncoded("pageToken".into(), "p2".into()))
            .with_status(200)
            .with_body(r#"{"luauExecutionSessionTaskLogs":[{"messages":["c"]}],"nextPageToken":""}"#)
            .create_async()
            .await;

        let groups = client(&server.url()).get_logs(TASK).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let lines: Vec<String> = groups.iter().flat_map(LogGroup::lines).collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn upload_place_returns_version() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/universes/v1/1/places/2/versions")
            .match_query(Matcher::UrlEncoded("versionType".into(), "Saved".into()))
            .match_header("content-type", "application/octet-stream")
            .match_header("x-api-key", "secret")
            .match_body(b"rbxl".to_vec())
            .with_status(200)
            .with_body(r#"{"versionNumber":12}"#)
            .create_async()
            .await;

        let version = client(&server.url())
            .upload_place("1", "2", b"rbxl".to_vec())
            .await
            .unwrap();

        m.assert_async().await;
        assert_eq!(version, 12);
    }
}
