// API client module: a small blocking HTTP client that POSTs registration
// requests to the configured endpoint, plus the classification of the
// status codes it answers with.

use crate::config::RunConfig;
use crate::user::UserRecord;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::Serialize;

/// JSON body sent for each user. Field names are what the endpoint expects.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub bde: &'a str,
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub member: bool,
}

impl<'a> RegisterRequest<'a> {
    pub fn new(user: &'a UserRecord, bde: &'a str) -> Self {
        RegisterRequest {
            email: &user.email,
            bde,
            firstname: &user.firstname,
            lastname: &user.lastname,
            member: user.member,
        }
    }
}

/// Status and body text of an answered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Anything that can receive a registration. `ApiClient` is the real one;
/// the row loop only depends on this trait.
pub trait RegistrationEndpoint {
    /// Send one registration. `Err` means no response was received at all.
    fn register(&self, req: &RegisterRequest<'_>) -> Result<ApiResponse>;
}

/// Blocking client bound to one endpoint URL and one token.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    url: Url,
    headers: HeaderMap,
}

impl ApiClient {
    /// Build a client for `url`. The token is sent verbatim as the
    /// `Authorization` header of every request.
    pub fn new(url: Url, token: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(token).context("Token is not a valid header value")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient { client, url, headers })
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        let url = Url::parse(&config.api)
            .with_context(|| format!("Invalid API url {:?}", config.api))?;
        Self::new(url, &config.token)
    }
}

impl RegistrationEndpoint for ApiClient {
    fn register(&self, req: &RegisterRequest<'_>) -> Result<ApiResponse> {
        let res = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .json(req)
            .send()
            .with_context(|| format!("Failed to send register request to {}", self.url))?;
        let status = res.status().as_u16();
        let body = res.text().unwrap_or_default();
        tracing::debug!(url = %self.url, status, email = req.email, "register request answered");
        Ok(ApiResponse { status, body })
    }
}

/// What a response status means for the user and for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created,
    ServerError,
    NotFound,
    BadRequest(String),
    Unexpected { status: u16, body: String },
}

/// Whether the row loop may go on after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    FatalStop,
}

impl Outcome {
    pub fn classify(response: ApiResponse) -> Self {
        match response.status {
            201 => Outcome::Created,
            500 => Outcome::ServerError,
            404 => Outcome::NotFound,
            400 => Outcome::BadRequest(response.body),
            status => Outcome::Unexpected { status, body: response.body },
        }
    }

    /// 500 and 404 stop the run; every other status lets it go on.
    pub fn flow(&self) -> Flow {
        match self {
            Outcome::ServerError | Outcome::NotFound => Flow::FatalStop,
            _ => Flow::Continue,
        }
    }
}
