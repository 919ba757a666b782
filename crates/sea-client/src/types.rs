//! Domain objects for the Sea API.
//!
//! Each type is built from an untyped JSON record through [`FromRecord`] and
//! is immutable once constructed. Construction validates every field first
//! and never yields a partially-populated value.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rand::RngCore;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{Constraint, ValidationError};
use crate::validator::{Fields, check_length, check_pattern};

/// Maximum characters in a post body.
pub const POST_TEXT_MAX: usize = 512;

/// Bounds on a user's display name.
pub const USER_NAME_MIN: usize = 1;
pub const USER_NAME_MAX: usize = 20;

/// Pattern a user's screen name must match.
pub const SCREEN_NAME_PATTERN: &str = "^[0-9a-zA-Z_]{1,20}$";

/// Default OAuth token type.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

static SCREEN_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SCREEN_NAME_PATTERN).unwrap());

/// Construct a value from an untyped API record.
pub trait FromRecord: Sized {
    fn from_record(value: &Value) -> Result<Self, ValidationError>;
}

fn nested<T: FromRecord>(field: &str, value: &Value) -> Result<T, ValidationError> {
    T::from_record(value).map_err(|e| e.nested(field))
}

fn nested_list<T: FromRecord>(field: &str, values: &[Value]) -> Result<Vec<T>, ValidationError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| nested(&format!("[{i}]"), v).map_err(|e: ValidationError| e.nested(field)))
        .collect()
}

// =============================================================================
// Application
// =============================================================================

/// The client application a post was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    id: i64,
    name: String,
}

impl Application {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromRecord for Application {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;
        Ok(Self {
            id: fields.integer("id")?,
            name: fields.string("name")?.to_string(),
        })
    }
}

// =============================================================================
// Authorization
// =============================================================================

/// Optional inputs for an [`Authorization`].
#[derive(Debug, Clone, Default)]
pub struct AuthorizationParams {
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub state_text: Option<String>,
    pub token_type: Option<String>,
}

/// OAuth2 credentials and state held by a client.
///
/// Absent and empty string fields normalize to `""`, so the two cannot be
/// told apart afterwards. `token_type` falls back to `"Bearer"` and
/// `state_text` to a fresh random value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    access_token: String,
    client_id: String,
    client_secret: String,
    state_text: String,
    token_type: String,
}

impl Authorization {
    pub fn new(params: AuthorizationParams) -> Self {
        fn non_empty(s: Option<String>) -> Option<String> {
            s.filter(|s| !s.is_empty())
        }

        Self {
            access_token: params.access_token.unwrap_or_default(),
            client_id: params.client_id.unwrap_or_default(),
            client_secret: params.client_secret.unwrap_or_default(),
            state_text: non_empty(params.state_text).unwrap_or_else(generate_state_text),
            token_type: non_empty(params.token_type)
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn state_text(&self) -> &str {
        &self.state_text
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Value for an `Authorization` header, or `None` before a token exists.
    pub fn header_value(&self) -> Option<String> {
        if self.access_token.is_empty() {
            return None;
        }
        Some(format!("{} {}", self.token_type, self.access_token))
    }

    /// Copy of this authorization carrying an issued token.
    pub(crate) fn with_token(&self, token: &Token) -> Self {
        Self {
            access_token: token.access_token().to_string(),
            token_type: if token.token_type().is_empty() {
                self.token_type.clone()
            } else {
                token.token_type().to_string()
            },
            ..self.clone()
        }
    }
}

impl Default for Authorization {
    fn default() -> Self {
        Self::new(AuthorizationParams::default())
    }
}

impl FromRecord for Authorization {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;
        let get = |name: &str| -> Result<Option<String>, ValidationError> {
            Ok(fields.optional_string(name)?.map(str::to_string))
        };
        Ok(Self::new(AuthorizationParams {
            access_token: get("accessToken")?,
            client_id: get("clientId")?,
            client_secret: get("clientSecret")?,
            state_text: get("stateText")?,
            token_type: get("tokenType")?,
        }))
    }
}

/// 8 random bytes, hex-encoded, for the OAuth2 `state` parameter.
fn generate_state_text() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// =============================================================================
// Token
// =============================================================================

/// Token issued by the OAuth token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    access_token: String,
    token_type: String,
}

impl Token {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }
}

impl FromRecord for Token {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;
        Ok(Self {
            access_token: fields.string("access_token")?.to_string(),
            token_type: fields.string("token_type")?.to_string(),
        })
    }
}

// =============================================================================
// File
// =============================================================================

/// One stored rendition of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVariant {
    id: i64,
    score: i64,
    extension: String,
    kind: String,
    mime: String,
    size: i64,
    url: Url,
}

impl FileVariant {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The variant's `type` field (e.g. `image`, `thumbnail`).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl FromRecord for FileVariant {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;
        Ok(Self {
            id: fields.integer("id")?,
            score: fields.integer("score")?,
            extension: fields.string("extension")?.to_string(),
            kind: fields.string("type")?.to_string(),
            mime: fields.string("mime")?.to_string(),
            size: fields.integer("size")?,
            url: fields.url("url")?,
        })
    }
}

/// An uploaded file with its variants, best first as sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    id: i64,
    name: String,
    variants: Vec<FileVariant>,
}

impl File {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[FileVariant] {
        &self.variants
    }
}

impl FromRecord for File {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;
        let id = fields.integer("id")?;
        let name = fields.string("name")?.to_string();
        let variants = nested_list("variants", fields.array("variants")?)?;
        Ok(Self { id, name, variants })
    }
}

// =============================================================================
// User
// =============================================================================

/// A Sea account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: i64,
    name: String,
    screen_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    posts_count: i64,
    avatar_file: Option<File>,
}

impl User {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn screen_name(&self) -> &str {
        &self.screen_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn posts_count(&self) -> i64 {
        self.posts_count
    }

    pub fn avatar_file(&self) -> Option<&File> {
        self.avatar_file.as_ref()
    }
}

impl FromRecord for User {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;

        let id = fields.integer("id")?;
        let name = fields.string("name")?;
        check_length("name", name, USER_NAME_MIN, USER_NAME_MAX)?;
        let screen_name = fields.string("screenName")?;
        check_pattern("screenName", screen_name, &SCREEN_NAME_RE, SCREEN_NAME_PATTERN)?;
        let created_at = fields.date("createdAt")?;
        let updated_at = fields.date("updatedAt")?;
        let posts_count = fields.integer("postsCount")?;
        let avatar_file = fields
            .optional_object("avatarFile")?
            .map(|v| nested("avatarFile", v))
            .transpose()?;

        Ok(Self {
            id,
            name: name.to_string(),
            screen_name: screen_name.to_string(),
            created_at,
            updated_at,
            posts_count,
            avatar_file,
        })
    }
}

// =============================================================================
// Post
// =============================================================================

/// A post on a timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    id: i64,
    text: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    application: Application,
    user: User,
    files: Vec<File>,
}

impl Post {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }
}

impl FromRecord for Post {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;

        let id = fields.integer("id")?;
        let text = fields.string("text")?;
        check_length("text", text, 0, POST_TEXT_MAX)?;
        let created_at = fields.date("createdAt")?;
        let updated_at = fields.date("updatedAt")?;

        // Loose shape checks first; the nested constructors are authoritative.
        let application = fields.object("application")?;
        let user = fields.object("user")?;
        let files = fields.array("files")?;

        Ok(Self {
            id,
            text: text.to_string(),
            created_at,
            updated_at,
            application: nested("application", application)?,
            user: nested("user", user)?,
            files: nested_list("files", files)?,
        })
    }
}

// =============================================================================
// Outbound bodies
// =============================================================================

/// Body for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBody {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_ids: Option<Vec<i64>>,
}

impl PostBody {
    pub fn new(
        text: impl Into<String>,
        file_ids: Option<Vec<i64>>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        check_length("text", &text, 0, POST_TEXT_MAX)?;
        Ok(Self { text, file_ids })
    }

    /// Plain text post with no attachments.
    pub fn plain(text: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(text, None)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file_ids(&self) -> Option<&[i64]> {
        self.file_ids.as_deref()
    }
}

impl FromRecord for PostBody {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;
        let text = fields.string("text")?;
        let file_ids = fields.optional_integer_array("fileIds")?;
        Self::new(text, file_ids)
    }
}

/// Partial update for the authenticated account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_file_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl UserSettings {
    pub fn new(avatar_file_id: Option<i64>, name: Option<String>) -> Result<Self, ValidationError> {
        if let Some(name) = name.as_deref() {
            check_length("name", name, USER_NAME_MIN, USER_NAME_MAX)?;
        }
        Ok(Self {
            avatar_file_id,
            name,
        })
    }

    pub fn with_name(self, name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(self.avatar_file_id, Some(name.into()))
    }

    pub fn with_avatar_file_id(self, avatar_file_id: i64) -> Self {
        Self {
            avatar_file_id: Some(avatar_file_id),
            ..self
        }
    }

    pub fn avatar_file_id(&self) -> Option<i64> {
        self.avatar_file_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl FromRecord for UserSettings {
    fn from_record(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(value)?;
        let avatar_file_id = fields.optional_integer("avatarFileId")?;
        let name = fields.optional_string("name")?.map(str::to_string);
        Self::new(avatar_file_id, name)
    }
}

/// Build a nested record from a raw value, surfacing a type error for
/// non-objects under `field`.
pub fn record_at<T: FromRecord>(field: &str, value: &Value) -> Result<T, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::new(field, Constraint::Type {
            expected: "an object",
        }));
    }
    nested(field, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn file_json(id: i64) -> Value {
        json!({
            "id": id,
            "name": "cat.png",
            "variants": [{
                "id": id * 10,
                "score": 100,
                "extension": "png",
                "type": "image",
                "mime": "image/png",
                "size": 2048,
                "url": "https://sea.example/files/cat.png"
            }]
        })
    }

    fn user_json() -> Value {
        json!({
            "id": 1,
            "name": "Alice",
            "screenName": "alice_01",
            "createdAt": "2019-02-17T12:00:00.000Z",
            "updatedAt": "2019-02-18T12:00:00.000Z",
            "postsCount": 42,
            "avatarFile": null
        })
    }

    fn post_json() -> Value {
        json!({
            "id": 100,
            "text": "hello sea",
            "createdAt": "2019-02-17T12:34:56.000Z",
            "updatedAt": "2019-02-17T12:34:56.000Z",
            "application": {"id": 3, "name": "web"},
            "user": user_json(),
            "files": [file_json(7)]
        })
    }

    fn without(mut value: Value, field: &str) -> Value {
        value.as_object_mut().unwrap().remove(field);
        value
    }

    #[test]
    fn test_application() {
        let app = Application::from_record(&json!({"id": 3, "name": "web"})).unwrap();
        assert_eq!(app.id(), 3);
        assert_eq!(app.name(), "web");
    }

    #[test]
    fn test_application_missing_fields() {
        for field in ["id", "name"] {
            let value = without(json!({"id": 3, "name": "web"}), field);
            let err = Application::from_record(&value).unwrap_err();
            assert_eq!(err, ValidationError::new(field, Constraint::Required));
        }
    }

    #[test]
    fn test_authorization_defaults() {
        let auth = Authorization::default();
        assert_eq!(auth.token_type(), "Bearer");
        assert_eq!(auth.access_token(), "");
        assert_eq!(auth.client_id(), "");
        assert_eq!(auth.client_secret(), "");
        assert_eq!(auth.state_text().len(), 16);
        assert!(auth.state_text().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(auth.header_value(), None);
    }

    #[test]
    fn test_authorization_state_is_random() {
        let a = Authorization::default();
        let b = Authorization::default();
        assert_ne!(a.state_text(), b.state_text());
    }

    #[test]
    fn test_authorization_empty_and_absent_are_equivalent() {
        let explicit = Authorization::new(AuthorizationParams {
            client_id: Some(String::new()),
            state_text: Some("abc".to_string()),
            ..Default::default()
        });
        let absent = Authorization::new(AuthorizationParams {
            state_text: Some("abc".to_string()),
            ..Default::default()
        });
        assert_eq!(explicit, absent);
    }

    #[test]
    fn test_authorization_from_record() {
        let auth = Authorization::from_record(&json!({
            "clientId": "client",
            "clientSecret": "secret",
            "stateText": "0123456789abcdef",
            "tokenType": ""
        }))
        .unwrap();
        assert_eq!(auth.client_id(), "client");
        assert_eq!(auth.client_secret(), "secret");
        assert_eq!(auth.state_text(), "0123456789abcdef");
        assert_eq!(auth.token_type(), "Bearer");
    }

    #[test]
    fn test_authorization_with_token() {
        let token = Token::from_record(&json!({
            "access_token": "tok",
            "token_type": "Bearer"
        }))
        .unwrap();
        let auth = Authorization::default().with_token(&token);
        assert_eq!(auth.header_value().as_deref(), Some("Bearer tok"));
    }

    #[test]
    fn test_token_requires_wire_names() {
        let err = Token::from_record(&json!({"accessToken": "tok", "token_type": "Bearer"}))
            .unwrap_err();
        assert_eq!(err.field, "access_token");
        let err = Token::from_record(&json!({"access_token": "tok"})).unwrap_err();
        assert_eq!(err.field, "token_type");
    }

    #[test]
    fn test_file() {
        let file = File::from_record(&file_json(7)).unwrap();
        assert_eq!(file.id(), 7);
        assert_eq!(file.variants().len(), 1);
        let variant = &file.variants()[0];
        assert_eq!(variant.kind(), "image");
        assert_eq!(variant.url().as_str(), "https://sea.example/files/cat.png");
    }

    #[test]
    fn test_file_empty_variants() {
        let file =
            File::from_record(&json!({"id": 1, "name": "empty", "variants": []})).unwrap();
        assert!(file.variants().is_empty());
    }

    #[test]
    fn test_file_bad_variant_url() {
        let mut value = file_json(7);
        value["variants"][0]["url"] = json!("files/cat.png");
        let err = File::from_record(&value).unwrap_err();
        assert_eq!(err, ValidationError::new("variants[0].url", Constraint::Url));
    }

    #[test]
    fn test_file_missing_fields() {
        for field in ["id", "name", "variants"] {
            let err = File::from_record(&without(file_json(7), field)).unwrap_err();
            assert_eq!(err, ValidationError::new(field, Constraint::Required));
        }
    }

    #[test]
    fn test_file_variant_missing_fields() {
        for field in ["id", "score", "extension", "type", "mime", "size", "url"] {
            let mut value = file_json(7);
            let variant = without(value["variants"][0].take(), field);
            value["variants"][0] = variant;

            let err = File::from_record(&value).unwrap_err();
            let path = format!("variants[0].{field}");
            assert_eq!(err, ValidationError::new(path, Constraint::Required));

            let err = FileVariant::from_record(&value["variants"][0]).unwrap_err();
            assert_eq!(err, ValidationError::new(field, Constraint::Required));
        }
    }

    #[test]
    fn test_user() {
        let user = User::from_record(&user_json()).unwrap();
        assert_eq!(user.screen_name(), "alice_01");
        assert_eq!(
            user.created_at(),
            Utc.with_ymd_and_hms(2019, 2, 17, 12, 0, 0).unwrap()
        );
        assert_eq!(user.posts_count(), 42);
        assert!(user.avatar_file().is_none());
    }

    #[test]
    fn test_user_missing_fields() {
        for field in ["id", "name", "screenName", "createdAt", "updatedAt", "postsCount"] {
            let err = User::from_record(&without(user_json(), field)).unwrap_err();
            assert_eq!(err, ValidationError::new(field, Constraint::Required));
        }
        // avatarFile is optional.
        assert!(User::from_record(&without(user_json(), "avatarFile")).is_ok());
    }

    #[test]
    fn test_user_with_avatar() {
        let mut value = user_json();
        value["avatarFile"] = file_json(9);
        let user = User::from_record(&value).unwrap();
        assert_eq!(user.avatar_file().map(File::id), Some(9));
    }

    #[test]
    fn test_user_name_bounds() {
        let mut value = user_json();
        value["name"] = json!("a".repeat(20));
        assert!(User::from_record(&value).is_ok());

        value["name"] = json!("a".repeat(21));
        let err = User::from_record(&value).unwrap_err();
        assert_eq!(err, ValidationError::new("name", Constraint::Length { min: 1, max: 20 }));

        value["name"] = json!("");
        assert!(User::from_record(&value).is_err());
    }

    #[test]
    fn test_user_screen_name_pattern() {
        let too_long = "a".repeat(21);
        for bad in ["alice-01", "alice 01", "ありす", "", too_long.as_str()] {
            let mut value = user_json();
            value["screenName"] = json!(bad);
            let err = User::from_record(&value).unwrap_err();
            assert_eq!(err.field, "screenName", "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_user_bad_date() {
        let mut value = user_json();
        value["updatedAt"] = json!("not a date");
        let err = User::from_record(&value).unwrap_err();
        assert_eq!(err, ValidationError::new("updatedAt", Constraint::Date));
    }

    #[test]
    fn test_post() {
        let post = Post::from_record(&post_json()).unwrap();
        assert_eq!(post.id(), 100);
        assert_eq!(post.text(), "hello sea");
        assert_eq!(post.application().name(), "web");
        assert_eq!(post.user().id(), 1);
        assert_eq!(post.files().len(), 1);
        assert_eq!(
            post.created_at(),
            Utc.with_ymd_and_hms(2019, 2, 17, 12, 34, 56).unwrap()
        );
    }

    #[test]
    fn test_post_missing_required_fields() {
        for field in [
            "id",
            "text",
            "createdAt",
            "updatedAt",
            "application",
            "user",
            "files",
        ] {
            let err = Post::from_record(&without(post_json(), field)).unwrap_err();
            assert_eq!(err, ValidationError::new(field, Constraint::Required));
        }
    }

    #[test]
    fn test_post_text_limit() {
        let mut value = post_json();
        value["text"] = json!("x".repeat(512));
        assert!(Post::from_record(&value).is_ok());
        value["text"] = json!("x".repeat(513));
        assert_eq!(Post::from_record(&value).unwrap_err().field, "text");
    }

    #[test]
    fn test_post_surfaces_innermost_violation() {
        let mut value = post_json();
        value["user"]["screenName"] = json!("no spaces allowed");
        let err = Post::from_record(&value).unwrap_err();
        assert_eq!(err.field, "user.screenName");

        let mut value = post_json();
        value["files"][0]["variants"][0]["size"] = json!("big");
        let err = Post::from_record(&value).unwrap_err();
        assert_eq!(err.field, "files[0].variants[0].size");
    }

    #[test]
    fn test_post_loose_shape_check() {
        let mut value = post_json();
        value["application"] = json!("web");
        let err = Post::from_record(&value).unwrap_err();
        assert_eq!(err, ValidationError::new("application", Constraint::Type {
            expected: "an object"
        }));
    }

    #[test]
    fn test_post_body_serialization() {
        let body = PostBody::new("hi", Some(vec![1, 2])).unwrap();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"text": "hi", "fileIds": [1, 2]})
        );
        let body = PostBody::plain("hi").unwrap();
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"text": "hi"}));
    }

    #[test]
    fn test_post_body_limit() {
        assert!(PostBody::plain("x".repeat(512)).is_ok());
        assert!(PostBody::plain("x".repeat(513)).is_err());
    }

    #[test]
    fn test_post_body_from_record() {
        let body = PostBody::from_record(&json!({"text": "hi", "fileIds": [5]})).unwrap();
        assert_eq!(body.file_ids(), Some(&[5][..]));
    }

    #[test]
    fn test_user_settings() {
        let settings = UserSettings::default()
            .with_avatar_file_id(5)
            .with_name("Alice")
            .unwrap();
        assert_eq!(
            serde_json::to_value(&settings).unwrap(),
            json!({"avatarFileId": 5, "name": "Alice"})
        );
        assert_eq!(serde_json::to_value(UserSettings::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_user_settings_name_bounds() {
        assert!(UserSettings::new(None, Some(String::new())).is_err());
        assert!(UserSettings::new(None, Some("a".repeat(21))).is_err());
        assert!(UserSettings::from_record(&json!({"name": "ok"})).is_ok());
    }

    #[test]
    fn test_record_at_rejects_non_object() {
        let err = record_at::<Post>("content", &json!("hello")).unwrap_err();
        assert_eq!(err.field, "content");
    }

    #[test]
    fn test_record_at_nests_path() {
        let mut value = post_json();
        value["user"]["name"] = json!("");
        let err = record_at::<Post>("content", &value).unwrap_err();
        assert_eq!(err.field, "content.user.name");
    }
}
