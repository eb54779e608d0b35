// API client module: a small blocking HTTP client that talks to the Funix
// Cloud server. One method per route; every answer comes back wrapped in the
// same `{code, message, data}` envelope.

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Code the server uses for a successful call.
pub const SUCCESS: i64 = 0;

/// Every route the client calls, relative to the server URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    BindEmail,
    Me,
    TwoFaGenerate,
    TwoFaBind,
    ChangePassword,
    ForgetPassword,
    ResetPassword,
    DeployGit,
    DeployUpload,
    QueryInstance,
    ListInstances,
    RemoveInstance,
    UploadFile,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/user/login",
            Route::Register => "/user/register",
            Route::BindEmail => "/user/email/bind",
            Route::Me => "/user/me",
            Route::TwoFaGenerate => "/user/2fa/generate",
            Route::TwoFaBind => "/user/2fa/bind",
            Route::ChangePassword => "/user/password/change",
            Route::ForgetPassword => "/user/password/forget",
            Route::ResetPassword => "/user/password/reset",
            Route::DeployGit => "/instance/create/git",
            Route::DeployUpload => "/instance/create/upload",
            Route::QueryInstance => "/instance/query",
            Route::ListInstances => "/instance/query/all",
            Route::RemoveInstance => "/instance/remove",
            Route::UploadFile => "/file/upload",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Route::ListInstances => Method::GET,
            _ => Method::POST,
        }
    }

    /// Whether the route needs the bearer token.
    pub fn needs_auth(self) -> bool {
        !matches!(
            self,
            Route::Login | Route::Register | Route::ForgetPassword | Route::ResetPassword
        )
    }
}

/// The wrapper around every server answer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS
    }

    /// Decodes `data` into the shape a successful call promises.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.clone().unwrap_or(Value::Null);
        serde_json::from_value(data)
            .with_context(|| format!("Unexpected response data for code {}", self.code))
    }
}

#[derive(Serialize, Debug)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct TokenData {
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct MeData {
    pub id: Value,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub has_2fa: bool,
}

#[derive(Deserialize, Debug)]
pub struct TwoFaTicket {
    pub ticket: String,
    pub otpauth: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetTicket {
    pub ticket: String,
}

#[derive(Deserialize, Debug)]
pub struct UploadData {
    pub file_id: Value,
}

#[derive(Deserialize, Debug)]
pub struct DeployData {
    pub application_name: String,
    pub instance_id: i64,
}

/// Row of the instance listing.
#[derive(Deserialize, Debug, Clone)]
pub struct InstanceSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub start_time: Option<String>,
    pub state: i64,
}

/// Full record returned by an instance query.
#[derive(Deserialize, Debug, Clone)]
pub struct InstanceDetail {
    pub id: i64,
    pub name: String,
    pub state: i64,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub done_time: Option<String>,
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LimiterSource {
    Browser,
    Ip,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    pub max_calls: u32,
    pub period: u32,
    pub source: LimiterSource,
}

/// Parameters shared by both ways of creating an instance.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeploySettings {
    pub name: String,
    pub entry_point: String,
    pub with_no_frontend: bool,
    pub with_transform: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rate_limiters: Vec<RateLimiter>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub envs: BTreeMap<String, String>,
}

#[derive(Serialize, Debug)]
struct GitDeploy<'a> {
    repo_link: &'a str,
    #[serde(flatten)]
    settings: &'a DeploySettings,
}

#[derive(Serialize, Debug)]
struct UploadDeploy<'a> {
    file_id: &'a Value,
    #[serde(flatten)]
    settings: &'a DeploySettings,
}

/// Blocking client holding the reqwest client, the server URL and the token
/// used for authenticated routes.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("funix-cloud/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, route: Route) -> String {
        format!("{}{}", self.base_url, route.path())
    }

    fn request(&self, route: Route) -> RequestBuilder {
        log::debug!("{} {}", route.method(), self.url(route));
        let req = self.client.request(route.method(), self.url(route));
        match (&self.token, route.needs_auth()) {
            (Some(token), true) => req.bearer_auth(token),
            _ => req,
        }
    }

    /// Sends the request and parses the envelope. The HTTP status is not
    /// consulted; failures are carried by `code`.
    fn send(&self, route: Route, req: RequestBuilder) -> Result<Envelope> {
        let res = req
            .send()
            .with_context(|| format!("Failed to send request to {}", route.path()))?;
        let status = res.status();
        let envelope: Envelope = res
            .json()
            .with_context(|| format!("Invalid response from {} ({status})", route.path()))?;
        log::debug!("{} -> {} code {}", route.path(), status, envelope.code);
        Ok(envelope)
    }

    fn post_json<T: Serialize + ?Sized>(&self, route: Route, body: &T) -> Result<Envelope> {
        self.send(route, self.request(route).json(body))
    }

    fn call(&self, route: Route) -> Result<Envelope> {
        self.send(route, self.request(route))
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Envelope> {
        self.post_json(Route::Login, &Credentials { username, password })
    }

    pub fn register(&self, username: &str, password: &str) -> Result<Envelope> {
        self.post_json(Route::Register, &Credentials { username, password })
    }

    pub fn bind_email(&self, email: &str) -> Result<Envelope> {
        self.post_json(Route::BindEmail, &serde_json::json!({ "email": email }))
    }

    pub fn me(&self) -> Result<Envelope> {
        self.call(Route::Me)
    }

    pub fn two_fa_request(&self) -> Result<Envelope> {
        self.call(Route::TwoFaGenerate)
    }

    pub fn two_fa_bind(&self, ticket: &str, code: &str) -> Result<Envelope> {
        self.post_json(
            Route::TwoFaBind,
            &serde_json::json!({ "ticket": ticket, "code": code }),
        )
    }

    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<Envelope> {
        self.post_json(
            Route::ChangePassword,
            &serde_json::json!({ "old_password": old_password, "new_password": new_password }),
        )
    }

    pub fn forget_password(&self, username: &str, email: &str) -> Result<Envelope> {
        self.post_json(
            Route::ForgetPassword,
            &serde_json::json!({ "username": username, "email": email }),
        )
    }

    pub fn reset_password(&self, ticket: &str, code: i64, password: &str) -> Result<Envelope> {
        self.post_json(
            Route::ResetPassword,
            &serde_json::json!({ "ticket": ticket, "code": code, "password": password }),
        )
    }

    pub fn deploy_git(&self, repo_link: &str, settings: &DeploySettings) -> Result<Envelope> {
        self.post_json(Route::DeployGit, &GitDeploy { repo_link, settings })
    }

    pub fn deploy_upload(&self, file_id: &Value, settings: &DeploySettings) -> Result<Envelope> {
        self.post_json(Route::DeployUpload, &UploadDeploy { file_id, settings })
    }

    pub fn list_instances(&self) -> Result<Envelope> {
        self.call(Route::ListInstances)
    }

    pub fn query_instance(&self, id: i64) -> Result<Envelope> {
        self.post_json(Route::QueryInstance, &serde_json::json!({ "id": id }))
    }

    pub fn remove_instance(&self, id: i64) -> Result<Envelope> {
        self.post_json(Route::RemoveInstance, &serde_json::json!({ "id": id }))
    }

    /// Uploads an archive as multipart field `file`.
    pub fn upload(&self, path: &Path) -> Result<Envelope> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("deploy.zip")
            .to_string();
        let len = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        let part = multipart::Part::reader_with_length(file, len)
            .file_name(file_name)
            .mime_str("application/zip")
            .context("Invalid mime type for upload")?;
        let form = multipart::Form::new().part("file", part);
        self.send(Route::UploadFile, self.request(Route::UploadFile).multipart(form))
    }
}
