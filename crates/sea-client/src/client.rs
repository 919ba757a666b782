//! Sea HTTP API client implementation.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::error::{Constraint, SeaError, ValidationError};
use crate::stream::StreamSession;
use crate::types::{
    Authorization, File, FromRecord, Post, PostBody, Token, User, UserSettings, record_at,
};
use crate::ClientConfig;

/// Bounds on the timeline `count` parameter.
pub const TIMELINE_COUNT_MIN: i64 = 1;
pub const TIMELINE_COUNT_MAX: i64 = 100;

const DEFAULT_FILE_MIME: &str = "application/octet-stream";

/// Query parameters for the public timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_id: Option<i64>,
}

impl TimelineQuery {
    pub fn count(count: i64) -> Self {
        Self {
            count: Some(count),
            ..Default::default()
        }
    }

    /// Reject a `count` outside `1..=100`.
    pub fn validate(&self) -> Result<(), SeaError> {
        match self.count {
            Some(count) if !(TIMELINE_COUNT_MIN..=TIMELINE_COUNT_MAX).contains(&count) => {
                Err(SeaError::Range {
                    parameter: "count",
                    value: count,
                    min: TIMELINE_COUNT_MIN,
                    max: TIMELINE_COUNT_MAX,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Client for a Sea server.
///
/// Requests carry `Authorization: <tokenType> <accessToken>` once a token is
/// held. Transport failures, including non-2xx statuses, are returned as
/// [`SeaError::Http`] without retrying.
pub struct SeaClient {
    http: Client,
    api_base: Url,
    oauth_base: Url,
    authorization: Arc<RwLock<Authorization>>,
}

impl SeaClient {
    /// Create a new client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, SeaError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            authorization: Arc::new(RwLock::new(config.authorization())),
            api_base: config.api_base().clone(),
            oauth_base: config.oauth_base().clone(),
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn oauth_base(&self) -> &Url {
        &self.oauth_base
    }

    /// Snapshot of the held authorization.
    pub async fn authorization(&self) -> Authorization {
        self.authorization.read().await.clone()
    }

    /// The current access token, empty before `authorize`.
    pub async fn access_token(&self) -> String {
        self.authorization.read().await.access_token().to_string()
    }

    /// Build the URL a user visits to grant this application access.
    ///
    /// The `state` parameter is this client's `state_text`; matching it
    /// against the callback is left to the caller.
    pub async fn authorize_url(&self) -> Result<Url, SeaError> {
        let auth = self.authorization.read().await;
        if auth.client_id().is_empty() {
            return Err(SeaError::Config("client_id is required".to_string()));
        }

        let mut url = self.oauth_base.join("authorize")?;
        url.query_pairs_mut()
            .append_pair("client_id", auth.client_id())
            .append_pair("response_type", "code")
            .append_pair("state", auth.state_text());
        Ok(url)
    }

    /// Exchange an authorization code for an access token.
    ///
    /// The token is stored and used for every later request.
    pub async fn authorize(&self, code: &str) -> Result<String, SeaError> {
        #[derive(Serialize)]
        struct TokenRequest<'a> {
            client_id: &'a str,
            client_secret: &'a str,
            code: &'a str,
            grant_type: &'a str,
            state: &'a str,
        }

        let auth = self.authorization().await;
        if auth.client_id().is_empty() {
            return Err(SeaError::Config("client_id is required".to_string()));
        }
        if auth.client_secret().is_empty() {
            return Err(SeaError::Config("client_secret is required".to_string()));
        }

        let mut url = self.oauth_base.join("token")?;
        url.query_pairs_mut()
            .append_pair("client_id", auth.client_id())
            .append_pair("response_type", "code")
            .append_pair("state", auth.state_text());

        debug!(endpoint = %url.path(), "exchanging authorization code");

        let response = self
            .http
            .post(url)
            .json(&TokenRequest {
                client_id: auth.client_id(),
                client_secret: auth.client_secret(),
                code,
                grant_type: "authorization_code",
                state: auth.state_text(),
            })
            .send()
            .await?
            .error_for_status()?;
        let body: Value = response.json().await?;
        let token = Token::from_record(&body)?;

        let mut held = self.authorization.write().await;
        *held = held.with_token(&token);
        info!(token_type = %held.token_type(), "authorized with Sea");

        Ok(token.access_token().to_string())
    }

    /// Create a post.
    pub async fn post(&self, body: &PostBody) -> Result<Post, SeaError> {
        let request = self.request(Method::POST, "v1/posts").await?.json(body);
        let value = self.send(request).await?;
        Ok(Post::from_record(&value)?)
    }

    /// Fetch the public timeline, newest first.
    pub async fn get_timeline(
        &self,
        count: Option<i64>,
        since_id: Option<i64>,
        max_id: Option<i64>,
    ) -> Result<Vec<Post>, SeaError> {
        self.timeline(TimelineQuery {
            count,
            since_id,
            max_id,
        })
        .await
    }

    /// Fetch the public timeline with a typed query.
    ///
    /// Every entry is validated; one malformed post fails the whole call.
    pub async fn timeline(&self, query: TimelineQuery) -> Result<Vec<Post>, SeaError> {
        query.validate()?;

        let request = self
            .request(Method::GET, "v1/timelines/public")
            .await?
            .query(&query);
        let value = self.send(request).await?;

        let entries = value.as_array().ok_or_else(|| {
            ValidationError::new("timeline", Constraint::Type {
                expected: "an array",
            })
        })?;
        let posts = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| record_at::<Post>(&format!("timeline[{i}]"), entry))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = posts.len(), "fetched public timeline");
        Ok(posts)
    }

    /// Apply a partial update to the authenticated account.
    pub async fn update_account(&self, settings: &UserSettings) -> Result<User, SeaError> {
        let request = self
            .request(Method::PATCH, "v1/account")
            .await?
            .json(settings);
        let value = self.send(request).await?;
        Ok(User::from_record(&value)?)
    }

    /// Upload a file to the album.
    ///
    /// With `add_date` set, a name clash is resolved server-side by appending
    /// a date string; otherwise the server rejects the upload.
    pub async fn post_file(
        &self,
        name: &str,
        content: Vec<u8>,
        add_date: bool,
        folder_id: Option<i64>,
    ) -> Result<File, SeaError> {
        self.post_file_with_mime(name, content, DEFAULT_FILE_MIME, add_date, folder_id)
            .await
    }

    /// Upload a file with an explicit MIME type.
    pub async fn post_file_with_mime(
        &self,
        name: &str,
        content: Vec<u8>,
        mime: &str,
        add_date: bool,
        folder_id: Option<i64>,
    ) -> Result<File, SeaError> {
        let size = content.len();
        let part = Part::bytes(content)
            .file_name(name.to_string())
            .mime_str(mime)?;

        let mut form = Form::new()
            .text("name", name.to_string())
            .part("file", part)
            .text("ifNameConflicted", name_conflict_policy(add_date));
        if let Some(folder_id) = folder_id {
            form = form.text("folderId", folder_id.to_string());
        }

        debug!(name = %name, size, mime = %mime, "uploading file");

        let request = self
            .request(Method::POST, "v1/album/files")
            .await?
            .multipart(form);
        let value = self.send(request).await?;
        Ok(File::from_record(&value)?)
    }

    /// WebSocket endpoint derived from the API base.
    pub fn stream_url(&self) -> Result<Url, SeaError> {
        let mut url = self.api_base.join("stream")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => other,
        }
        .to_string();
        url.set_scheme(&scheme)
            .map_err(|()| SeaError::Config(format!("cannot stream over {scheme}")))?;
        Ok(url)
    }

    /// Open a stream session for the named stream with the held token.
    pub async fn connect_stream(&self, stream: &str) -> Result<StreamSession, SeaError> {
        let url = self.stream_url()?;
        let token = self.access_token().await;
        Ok(StreamSession::connect(url, stream, token))
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, SeaError> {
        let url = self.api_base.join(path)?;
        debug!(method = %method, endpoint = %url.path(), "sending request");

        let mut builder = self.http.request(method, url);
        if let Some(header) = self.authorization.read().await.header_value() {
            builder = builder.header(reqwest::header::AUTHORIZATION, header);
        }
        Ok(builder)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, SeaError> {
        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

fn name_conflict_policy(add_date: bool) -> &'static str {
    if add_date { "add-date-string" } else { "error" }
}
