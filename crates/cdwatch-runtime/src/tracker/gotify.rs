//! Notification-based commit tracker backed by a Gotify server.
//!
//! Publishers push a message per release to an application named after the
//! tracked repository; the message title carries the change identifier.
//! The tracker only ever reads the most recent message, so a target whose
//! channel has never been pushed to reports "no signal yet" rather than
//! "unchanged".

use std::path::Path;

use async_trait::async_trait;
use cdwatch_core::{CommitTracker, TrackerError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

/// Gotify application record (the subset we consume).
#[derive(Debug, Deserialize)]
struct Application {
    id: i64,
    name: String,
    token: String,
}

/// Request body for creating an application.
#[derive(Debug, Serialize)]
struct NewApplication {
    name: String,
    description: String,
}

/// One page of application messages.
#[derive(Debug, Deserialize)]
struct MessagesPage {
    messages: Vec<Message>,
}

/// Gotify message record (the subset we consume).
#[derive(Debug, Deserialize)]
struct Message {
    title: String,
}

/// Commit tracker that reads change notifications from a Gotify server.
pub struct GotifyTracker {
    /// Server base URL, without trailing slash.
    base: String,
    token: String,
    client: reqwest::Client,
}

impl GotifyTracker {
    /// Create a tracker for the given server URL and client token.
    pub fn new(server_url: &str, token: impl Into<String>) -> Result<Self, TrackerError> {
        // Parse up front so a bad URL fails at startup, not mid-iteration
        Url::parse(server_url).map_err(|e| TrackerError::InvalidUrl {
            url: server_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            base: server_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::Client::new(),
        })
    }

    async fn applications(&self) -> Result<Vec<Application>, TrackerError> {
        let url = format!("{}/application", self.base);
        let response = self
            .client
            .get(&url)
            .header("X-Gotify-Key", &self.token)
            .send()
            .await
            .map_err(|e| http_error(&url, &e))?;
        decode(&url, response).await
    }

    async fn create_application(&self, name: &str) -> Result<Application, TrackerError> {
        let url = format!("{}/application", self.base);
        let body = NewApplication {
            name: name.to_string(),
            description: format!("Created by cdwatch {}", chrono::Utc::now().to_rfc3339()),
        };
        let response = self
            .client
            .post(&url)
            .header("X-Gotify-Key", &self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| http_error(&url, &e))?;
        decode(&url, response).await
    }

    async fn latest_message(&self, app_id: i64) -> Result<Option<String>, TrackerError> {
        let url = format!("{}/application/{app_id}/message?limit=1", self.base);
        let response = self
            .client
            .get(&url)
            .header("X-Gotify-Key", &self.token)
            .send()
            .await
            .map_err(|e| http_error(&url, &e))?;
        let page: MessagesPage = decode(&url, response).await?;
        Ok(page.messages.into_iter().next().map(|m| m.title))
    }

    /// Log the command a publisher runs to push versions into this channel.
    fn log_push_hint(&self, app: &Application) {
        info!(
            "command for pushing versions: curl \"{}/message?token={}\" -F \"title=<version>\" -F \"message=<url>\"",
            self.base, app.token
        );
    }
}

#[async_trait]
impl CommitTracker for GotifyTracker {
    async fn last_change(
        &self,
        target: &str,
        _local_path: &Path,
    ) -> Result<Option<String>, TrackerError> {
        let apps = self.applications().await?;
        let app = match apps.into_iter().find(|a| a.name == target) {
            Some(app) => app,
            None => {
                info!(channel = target, "no notification channel yet, creating one");
                let app = self.create_application(target).await?;
                self.log_push_hint(&app);
                app
            }
        };
        debug!(channel = target, app_id = app.id, "reading latest notification");
        self.latest_message(app.id).await
    }
}

fn http_error(url: &str, error: &reqwest::Error) -> TrackerError {
    TrackerError::Http {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, TrackerError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TrackerError::Api {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.json().await.map_err(|e| TrackerError::Http {
        url: url.to_string(),
        reason: format!("decoding response: {e}"),
    })
}
