//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::error::SeaError;
use crate::types::{Authorization, AuthorizationParams};

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000";

/// Default OAuth base URL.
pub const DEFAULT_OAUTH_BASE: &str = "http://localhost:3000/oauth";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variables read by [`ClientConfig::from_env`].
pub const ENV_API_BASE: &str = "SEA_API_BASE";
pub const ENV_OAUTH_BASE: &str = "SEA_OAUTH_BASE";
pub const ENV_CLIENT_ID: &str = "SEA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SEA_CLIENT_SECRET";
pub const ENV_ACCESS_TOKEN: &str = "SEA_ACCESS_TOKEN";

/// Configuration for a [`SeaClient`](crate::SeaClient).
///
/// # Examples
///
/// ```
/// use sea_client::ClientConfig;
///
/// let config = ClientConfig::new("https://sea.example", "https://sea.example/oauth")
///     .unwrap()
///     .with_client_id("my-app")
///     .with_client_secret("s3cret");
/// assert_eq!(config.api_base().as_str(), "https://sea.example/");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_base: Url,
    oauth_base: Url,
    client_id: Option<String>,
    client_secret: Option<String>,
    access_token: Option<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given API and OAuth bases.
    pub fn new(api_base: &str, oauth_base: &str) -> Result<Self, SeaError> {
        Ok(Self {
            api_base: parse_base(api_base)?,
            oauth_base: parse_base(oauth_base)?,
            client_id: None,
            client_secret: None,
            access_token: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Build a configuration from `SEA_*` environment variables.
    ///
    /// Unset bases fall back to the localhost defaults; empty credential
    /// variables are treated as unset.
    pub fn from_env() -> Result<Self, SeaError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SeaError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base = get(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let oauth_base = get(ENV_OAUTH_BASE).unwrap_or_else(|| DEFAULT_OAUTH_BASE.to_string());

        let mut config = Self::new(&api_base, &oauth_base)?;
        config.client_id = get(ENV_CLIENT_ID);
        config.client_secret = get(ENV_CLIENT_SECRET);
        config.access_token = get(ENV_ACCESS_TOKEN);
        Ok(config)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Use a previously issued access token instead of running `authorize`.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub fn oauth_base(&self) -> &Url {
        &self.oauth_base
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// The initial authorization state for a client built from this config.
    pub fn authorization(&self) -> Authorization {
        Authorization::new(AuthorizationParams {
            access_token: self.access_token.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            ..Default::default()
        })
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE, DEFAULT_OAUTH_BASE).expect("default base URLs are valid")
    }
}

/// Parse a base URL, normalizing it to end in `/` so relative joins keep the
/// base path.
fn parse_base(raw: &str) -> Result<Url, SeaError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)
        .map_err(|e| SeaError::Config(format!("invalid base URL {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(SeaError::Config(format!("{raw:?} cannot be used as a base URL")));
    }
    Ok(url)
}
