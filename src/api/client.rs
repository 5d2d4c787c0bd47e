//! Blocking HTTP access to the issue tracker and test plan services.
//!
//! [`RestClient`] owns the session token and implements [`IssueApi`]. The
//! wire itself sits behind [`Transport`] so the request building and the
//! token refresh can be exercised without a network.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{Value, json};

use crate::{
    api::IssueApi,
    domain::{Config, Level},
};

const AUTH_HEADER: &str = "X-Auth-Token";
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Errors raised by the transport layer.
///
/// These never reach [`IssueApi`] callers; the client logs them and answers
/// `None`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request could not be sent or its body could not be read.
    #[error("{method} {url} failed: {source}")]
    Http {
        /// Request method.
        method: Method,
        /// Request URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The identity service refused to issue a token.
    #[error("token request returned status {0}")]
    TokenRejected(u16),

    /// The identity service answered without a token header.
    #[error("token response carries no X-Subject-Token header")]
    MissingToken,

    /// No user name is configured, so no token can be requested.
    #[error("no credentials configured")]
    NoCredentials,
}

/// A request to one of the services.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Full URL without query string.
    pub url: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }
}

/// A raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body text.
    pub body: String,
}

/// Password credentials for the identity service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Token endpoint.
    pub iam_url: String,
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
    /// The user's domain.
    pub domain_name: String,
    /// Project the token is scoped to.
    pub project_id: String,
}

impl Credentials {
    /// The password-identity token request body.
    #[must_use]
    pub fn token_request(&self) -> Value {
        json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.username,
                            "password": self.password,
                            "domain": { "name": self.domain_name }
                        }
                    }
                },
                "scope": {
                    "project": { "id": self.project_id }
                }
            }
        })
    }
}

/// Sends requests and obtains tokens.
pub trait Transport {
    /// Sends `request` with `token` as the auth header.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    fn send(&mut self, request: &ApiRequest, token: &str) -> Result<ApiResponse, ClientError>;

    /// Requests a new token.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity service does not issue one.
    fn authenticate(&mut self, credentials: &Credentials) -> Result<String, ClientError>;
}

/// [`Transport`] over `reqwest`'s blocking client.
///
/// Certificate verification is disabled; the services run on private
/// certificates.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &ApiRequest, token: &str) -> Result<ApiResponse, ClientError> {
        let http_error = |source| ClientError::Http {
            method: request.method.clone(),
            url: request.url.clone(),
            source,
        };

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .query(&request.query)
            .header(AUTH_HEADER, token);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(http_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(http_error)?;
        Ok(ApiResponse { status, body })
    }

    fn authenticate(&mut self, credentials: &Credentials) -> Result<String, ClientError> {
        let response = self
            .client
            .post(&credentials.iam_url)
            .json(&credentials.token_request())
            .send()
            .map_err(|source| ClientError::Http {
                method: Method::POST,
                url: credentials.iam_url.clone(),
                source,
            })?;

        if response.status() != StatusCode::CREATED {
            return Err(ClientError::TokenRejected(response.status().as_u16()));
        }

        response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(ClientError::MissingToken)
    }
}

/// Service endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoints {
    ipd_tree_url: String,
    ipd_detail_url: String,
    tc_all_url: String,
    tc_detail_url: String,
    execution_type_id: u64,
}

/// The [`IssueApi`] implementation used in production.
#[derive(Debug)]
pub struct RestClient<T = HttpTransport> {
    transport: T,
    credentials: Credentials,
    endpoints: Endpoints,
    token: Option<String>,
}

impl RestClient<HttpTransport> {
    /// Builds a client over HTTP from the run configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config.timeout())?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> RestClient<T> {
    /// Builds a client over the given transport.
    ///
    /// A pre-issued token from the configuration is used until rejected.
    pub fn with_transport(transport: T, config: &Config) -> Self {
        Self {
            transport,
            credentials: Credentials {
                iam_url: config.iam_url.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
                domain_name: config.domain_name.clone(),
                project_id: config.project_id.clone(),
            },
            endpoints: Endpoints {
                ipd_tree_url: config.ipd_tree_url.clone(),
                ipd_detail_url: config.ipd_detail_url.clone(),
                tc_all_url: config.tc_all_url.clone(),
                tc_detail_url: config.tc_detail_url.clone(),
                execution_type_id: config.execution_type_id,
            },
            token: config.token.clone(),
        }
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    fn token(&mut self) -> Option<String> {
        if let Some(token) = &self.token {
            return Some(token.clone());
        }

        tracing::info!("requesting a new token");
        let result = if self.credentials.username.is_empty() {
            Err(ClientError::NoCredentials)
        } else {
            self.transport.authenticate(&self.credentials)
        };

        match result {
            Ok(token) => {
                self.token = Some(token.clone());
                Some(token)
            }
            Err(e) => {
                tracing::error!("failed to obtain a token: {e}");
                None
            }
        }
    }

    fn send(&mut self, request: &ApiRequest, token: &str) -> Option<ApiResponse> {
        tracing::debug!("{} {}", request.method, request.url);
        self.transport
            .send(request, token)
            .inspect_err(|e| tracing::warn!("{e}"))
            .ok()
    }

    /// Sends a request and decodes the JSON answer.
    ///
    /// A 401 answer drops the token, requests a new one and retries once.
    /// Any failure, or a status other than 200 or 201, yields `None`.
    pub fn execute(&mut self, request: &ApiRequest) -> Option<Value> {
        let token = self.token()?;
        let mut response = self.send(request, &token)?;

        if response.status == StatusCode::UNAUTHORIZED.as_u16() {
            tracing::warn!("token rejected, requesting a new one");
            self.token = None;
            let token = self.token()?;
            response = self.send(request, &token)?;
        }

        match response.status {
            200 | 201 => serde_json::from_str(&response.body)
                .inspect_err(|e| tracing::warn!("invalid JSON from {}: {e}", request.url))
                .ok(),
            status => {
                tracing::warn!("{} {} returned status {status}", request.method, request.url);
                None
            }
        }
    }
}

impl<T: Transport> IssueApi for RestClient<T> {
    fn search_sf(&mut self, keyword: &str) -> Option<Value> {
        let request = ApiRequest::post(
            self.endpoints.ipd_tree_url.clone(),
            json!({ "keyword": keyword }),
        )
        .query("category", Level::Sf.issue_type());
        self.execute(&request)
    }

    fn issue_detail(&mut self, level: Level, id: &str) -> Option<Value> {
        let request = ApiRequest::get(format!("{}{id}", self.endpoints.ipd_detail_url))
            .query("issue_type", level.issue_type());
        self.execute(&request)
    }

    fn list_test_cases(&mut self, offset: usize, limit: usize) -> Option<Value> {
        let request = ApiRequest::post(
            self.endpoints.tc_all_url.clone(),
            json!({
                "offset": offset,
                "limit": limit,
                "execution_type_id": self.endpoints.execution_type_id,
            }),
        );
        self.execute(&request)
    }

    fn test_case_detail(&mut self, number: &str) -> Option<Value> {
        let request = ApiRequest::get(self.endpoints.tc_detail_url.clone())
            .query("testcase_number", number);
        self.execute(&request)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Answers from a script and records what was asked of it.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        responses: VecDeque<ApiResponse>,
        tokens: VecDeque<String>,
        sent: Vec<(ApiRequest, String)>,
        authentications: usize,
    }

    impl ScriptedTransport {
        fn respond(mut self, status: u16, body: &str) -> Self {
            self.responses.push_back(ApiResponse {
                status,
                body: body.to_string(),
            });
            self
        }

        fn issue(mut self, token: &str) -> Self {
            self.tokens.push_back(token.to_string());
            self
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&mut self, request: &ApiRequest, token: &str) -> Result<ApiResponse, ClientError> {
            self.sent.push((request.clone(), token.to_string()));
            self.responses.pop_front().ok_or(ClientError::MissingToken)
        }

        fn authenticate(&mut self, _: &Credentials) -> Result<String, ClientError> {
            self.authentications += 1;
            self.tokens.pop_front().ok_or(ClientError::TokenRejected(401))
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.username = "tester".to_string();
        config.password = "secret".to_string();
        config.ipd_tree_url = "https://req.test/tree".to_string();
        config.ipd_detail_url = "https://req.test/issues/".to_string();
        config.tc_all_url = "https://tc.test/batch".to_string();
        config.tc_detail_url = "https://tc.test/testcase".to_string();
        config
    }

    fn config_with_token(token: &str) -> Config {
        let mut config = config();
        config.token = Some(token.to_string());
        config
    }

    #[test]
    fn token_is_acquired_lazily_and_reused() {
        let transport = ScriptedTransport::default()
            .issue("t1")
            .respond(200, "{}")
            .respond(200, "{}");
        let mut client = RestClient::with_transport(transport, &config());

        assert!(client.search_sf("uCOS-III").is_some());
        assert!(client.test_case_detail("tc_OS_01").is_some());

        let transport = client.transport();
        assert_eq!(transport.authentications, 1);
        assert!(transport.sent.iter().all(|(_, token)| token == "t1"));
    }

    #[test]
    fn unauthorized_triggers_one_refresh_and_one_retry() {
        let transport = ScriptedTransport::default()
            .issue("fresh")
            .respond(401, "")
            .respond(200, r#"{"result": []}"#);
        let config = config_with_token("stale");
        let mut client = RestClient::with_transport(transport, &config);

        let value = client.issue_detail(Level::Ir, "42");

        assert_eq!(value, Some(json!({"result": []})));
        let transport = client.transport();
        assert_eq!(transport.authentications, 1);
        let tokens: Vec<_> = transport.sent.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(tokens, ["stale", "fresh"]);
    }

    #[test]
    fn second_unauthorized_gives_up() {
        let transport = ScriptedTransport::default()
            .issue("fresh")
            .respond(401, "")
            .respond(401, "");
        let config = config_with_token("stale");
        let mut client = RestClient::with_transport(transport, &config);

        assert_eq!(client.issue_detail(Level::Ar, "1"), None);
        assert_eq!(client.transport().sent.len(), 2);
        assert_eq!(client.transport().authentications, 1);
    }

    #[test]
    fn failed_refresh_gives_up_without_retrying() {
        let transport = ScriptedTransport::default().respond(401, "");
        let config = config_with_token("stale");
        let mut client = RestClient::with_transport(transport, &config);

        assert_eq!(client.issue_detail(Level::Sr, "1"), None);
        assert_eq!(client.transport().sent.len(), 1);
    }

    #[test]
    fn missing_credentials_skip_authentication() {
        let mut config = config();
        config.username.clear();
        let mut client = RestClient::with_transport(ScriptedTransport::default(), &config);

        assert_eq!(client.search_sf("x"), None);
        assert_eq!(client.transport().authentications, 0);
        assert!(client.transport().sent.is_empty());
    }

    #[test]
    fn other_statuses_and_bad_json_yield_none() {
        let transport = ScriptedTransport::default()
            .issue("t")
            .respond(500, "{}")
            .respond(200, "not json")
            .respond(201, r#"{"ok": true}"#);
        let mut client = RestClient::with_transport(transport, &config());

        assert_eq!(client.list_test_cases(0, 100), None);
        assert_eq!(client.list_test_cases(100, 100), None);
        assert_eq!(client.list_test_cases(200, 100), Some(json!({"ok": true})));
    }

    #[test]
    fn requests_are_built_per_endpoint() {
        let transport = ScriptedTransport::default()
            .issue("t")
            .respond(200, "{}")
            .respond(200, "{}")
            .respond(200, "{}")
            .respond(200, "{}");
        let mut client = RestClient::with_transport(transport, &config());

        client.search_sf("uCOS-III");
        client.issue_detail(Level::Sr, "123");
        client.list_test_cases(200, 100);
        client.test_case_detail("tc_OS_01_01_01_01");

        let sent: Vec<_> = client.transport().sent.iter().map(|(r, _)| r).collect();

        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[0].url, "https://req.test/tree");
        assert_eq!(sent[0].query, [("category".to_string(), "SF".to_string())]);
        assert_eq!(sent[0].body, Some(json!({"keyword": "uCOS-III"})));

        assert_eq!(sent[1].method, Method::GET);
        assert_eq!(sent[1].url, "https://req.test/issues/123");
        assert_eq!(sent[1].query, [("issue_type".to_string(), "SR".to_string())]);

        assert_eq!(
            sent[2].body,
            Some(json!({"offset": 200, "limit": 100, "execution_type_id": 10005}))
        );

        assert_eq!(sent[3].url, "https://tc.test/testcase");
        assert_eq!(
            sent[3].query,
            [(
                "testcase_number".to_string(),
                "tc_OS_01_01_01_01".to_string()
            )]
        );
    }

    #[test]
    fn token_request_body_scopes_to_project() {
        let credentials = RestClient::with_transport(ScriptedTransport::default(), &config())
            .credentials
            .clone();
        let body = credentials.token_request();

        assert_eq!(body["auth"]["identity"]["methods"], json!(["password"]));
        assert_eq!(
            body["auth"]["identity"]["password"]["user"]["name"],
            json!("tester")
        );
        assert_eq!(
            body["auth"]["scope"]["project"]["id"],
            json!("3f0e944126fc40488b99174119ef90c9")
        );
    }
}
