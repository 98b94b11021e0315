//! Remote mirror for finished sessions.
//!
//! Best-effort copy of each record to a per-user HTTP collection. The local
//! store stays authoritative; nothing here is retried.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use super::config::RemoteConfig;
use super::record::SessionRecord;
use crate::error::RemoteError;

pub type MirrorFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + 'a>>;

/// A second, remote sink keyed by user id.
pub trait RemoteMirror: Send + Sync {
    fn push<'a>(&'a self, user_id: &'a str, record: &'a SessionRecord) -> MirrorFuture<'a>;
}

/// POSTs records as JSON to `{endpoint}/users/{user_id}/sessions`.
#[derive(Debug, Clone)]
pub struct HttpMirror {
    client: Client,
    endpoint: Url,
}

impl HttpMirror {
    /// # Errors
    /// Fails when the endpoint is not an absolute http(s) URL or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidEndpoint(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// Build a mirror from config; `Ok(None)` when no endpoint is set.
    ///
    /// # Errors
    /// Same as [`HttpMirror::new`].
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, RemoteError> {
        match config.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => {
                Self::new(endpoint, Duration::from_secs(config.timeout_secs)).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn sessions_url(&self, user_id: &str) -> Result<Url, RemoteError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RemoteError::InvalidEndpoint(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?
            .pop_if_empty()
            .extend(["users", user_id, "sessions"]);
        Ok(url)
    }
}

impl RemoteMirror for HttpMirror {
    fn push<'a>(&'a self, user_id: &'a str, record: &'a SessionRecord) -> MirrorFuture<'a> {
        Box::pin(async move {
            let url = self.sessions_url(user_id)?;
            let resp = self.client.post(url).json(record).send().await?;

            let status = resp.status();
            if status.is_success() {
                return Ok(());
            }
            let body = resp.text().await.unwrap_or_default();
            Err(RemoteError::Rejected {
                status: status.as_u16(),
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::Category;
    use chrono::Utc;

    fn record() -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            id: "0190-test".into(),
            started_at: now,
            ended_at: now,
            duration_min: 25,
            category: Category::Coding,
            distraction_count: 0,
            completed: true,
            date: now.date_naive(),
        }
    }

    #[test]
    fn sessions_url_appends_user_segments() {
        let mirror = HttpMirror::new("https://sync.example.com/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            mirror.sessions_url("user 1").unwrap().as_str(),
            "https://sync.example.com/api/users/user%201/sessions"
        );

        let bare = HttpMirror::new("https://sync.example.com", Duration::from_secs(5)).unwrap();
        assert_eq!(
            bare.sessions_url("u").unwrap().as_str(),
            "https://sync.example.com/users/u/sessions"
        );
    }

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(HttpMirror::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
        assert!(HttpMirror::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn from_config_without_endpoint_is_none() {
        let config = RemoteConfig::default();
        assert!(HttpMirror::from_config(&config).unwrap().is_none());

        let blank = RemoteConfig {
            endpoint: Some("  ".into()),
            ..RemoteConfig::default()
        };
        assert!(HttpMirror::from_config(&blank).unwrap().is_none());
    }

    #[tokio::test]
    async fn push_posts_record_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/users/u-42/sessions")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "id": "0190-test",
                "category": "coding",
                "duration_min": 25,
                "completed": true
            })))
            .with_status(201)
            .create_async()
            .await;

        let mirror = HttpMirror::new(&server.url(), Duration::from_secs(5)).unwrap();
        mirror.push("u-42", &record()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn push_surfaces_server_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/users/u-42/sessions")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let mirror = HttpMirror::new(&server.url(), Duration::from_secs(5)).unwrap();
        match mirror.push("u-42", &record()).await {
            Err(RemoteError::Rejected { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
