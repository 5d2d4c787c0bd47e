use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured password.
pub const PASSWORD_ENV: &str = "REQTRACE_PASSWORD";

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_FILE_NAME: &str = "reqtrace.toml";

/// Configuration for a report run.
///
/// Holds the service endpoints, the credentials used to obtain a token, the
/// root search keyword and the output layout. Every field has a default, so
/// an empty file (or no file) yields a usable configuration apart from the
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Token endpoint of the identity service.
    pub iam_url: String,

    /// Domain the user belongs to.
    pub domain_name: String,

    /// Project the token is scoped to.
    pub project_id: String,

    /// User name for password authentication.
    pub username: String,

    /// Password for password authentication.
    pub password: String,

    /// A pre-issued token.
    ///
    /// When set, it is used until the service rejects it, after which a new
    /// token is requested with the credentials above.
    pub token: Option<String>,

    timeout_secs: u64,

    /// Keyword used to find the root SF.
    pub sf_keyword: String,

    /// Issue tree search endpoint.
    pub ipd_tree_url: String,

    /// Issue detail endpoint; the issue id is appended.
    pub ipd_detail_url: String,

    /// Test case batch query endpoint.
    pub tc_all_url: String,

    /// Test case detail endpoint.
    pub tc_detail_url: String,

    /// Execution type filter sent with the test case query.
    pub execution_type_id: u64,

    /// Top-level output directory.
    pub base_dir: PathBuf,

    /// Requirements directory under [`Self::base_dir`].
    pub req_dir: String,

    /// Number of test cases requested per page.
    pub page_size: usize,

    pacing_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iam_url: default_iam_url(),
            domain_name: default_domain_name(),
            project_id: default_project_id(),
            username: String::new(),
            password: String::new(),
            token: None,
            timeout_secs: default_timeout_secs(),
            sf_keyword: default_sf_keyword(),
            ipd_tree_url: default_ipd_tree_url(),
            ipd_detail_url: default_ipd_detail_url(),
            tc_all_url: default_tc_all_url(),
            tc_detail_url: default_tc_detail_url(),
            execution_type_id: default_execution_type_id(),
            base_dir: default_base_dir(),
            req_dir: default_req_dir(),
            page_size: default_page_size(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl Config {
    /// Reads a run configuration. Keys missing from the file take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns a message naming `path` if it is unreadable or not a
    /// configuration of a known `_version`.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        toml::from_str(&content).map_err(|e| format!("invalid config {}: {e}", path.display()))
    }

    /// Writes every setting, credentials included, tagged with the current
    /// `_version`.
    ///
    /// # Errors
    ///
    /// Returns a message naming `path` if it cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("cannot encode config for {}: {e}", path.display()))?;
        std::fs::write(path, content).map_err(|e| format!("cannot write {}: {e}", path.display()))
    }

    /// Request timeout for every HTTP call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Delay between consecutive test case detail requests.
    #[must_use]
    pub const fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Sets the delay between consecutive test case detail requests.
    pub fn set_pacing(&mut self, pacing: Duration) {
        self.pacing_ms = u64::try_from(pacing.as_millis()).unwrap_or(u64::MAX);
    }

    /// Replaces the password when `value` is present and non-empty.
    ///
    /// Intended for the value of [`PASSWORD_ENV`].
    pub fn override_password(&mut self, value: Option<String>) {
        if let Some(password) = value.filter(|p| !p.is_empty()) {
            self.password = password;
        }
    }

    /// The directory that holds the requirement pages.
    #[must_use]
    pub fn requirements_root(&self) -> PathBuf {
        self.base_dir.join(&self.req_dir)
    }
}

fn default_iam_url() -> String {
    "https://iam-apigateway-proxy.cn-avicasgt-1.avicasgt.com/v3/auth/tokens".to_string()
}

fn default_domain_name() -> String {
    "avicasgt-team".to_string()
}

fn default_project_id() -> String {
    "3f0e944126fc40488b99174119ef90c9".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_sf_keyword() -> String {
    "uCOS-III".to_string()
}

fn default_ipd_tree_url() -> String {
    "https://codeartsreq.cn-avicasgt-1.avicasgt.com/v1/ipdprojectservice/projects/6c9fff785268446bab66073c5bc1fa56/issues/tree".to_string()
}

fn default_ipd_detail_url() -> String {
    "https://codeartsreq.cn-avicasgt-1.avicasgt.com/v1/ipdprojectservice/projects/6c9fff785268446bab66073c5bc1fa56/issues/".to_string()
}

fn default_tc_all_url() -> String {
    "https://codeartstestplan.cn-avicasgt-1.avicasgt.com/v1/6c9fff785268446bab66073c5bc1fa56/testcases/batch-query".to_string()
}

fn default_tc_detail_url() -> String {
    "https://codeartstestplan.cn-avicasgt-1.avicasgt.com/v1/projects/6c9fff785268446bab66073c5bc1fa56/testcase".to_string()
}

const fn default_execution_type_id() -> u64 {
    10005
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("verifymaterial")
}

fn default_req_dir() -> String {
    "requirement".to_string()
}

const fn default_page_size() -> usize {
    100
}

const fn default_pacing_ms() -> u64 {
    100
}

/// On-disk shapes of [`Config`], selected by the `_version` key.
///
/// Defaults are applied per key here, so a `reqtrace.toml` holding only
/// `_version = "1"` and the credentials is complete.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_iam_url")]
        iam_url: String,

        #[serde(default = "default_domain_name")]
        domain_name: String,

        #[serde(default = "default_project_id")]
        project_id: String,

        #[serde(default)]
        username: String,

        #[serde(default, skip_serializing_if = "String::is_empty")]
        password: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,

        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,

        #[serde(default = "default_sf_keyword")]
        sf_keyword: String,

        #[serde(default = "default_ipd_tree_url")]
        ipd_tree_url: String,

        #[serde(default = "default_ipd_detail_url")]
        ipd_detail_url: String,

        #[serde(default = "default_tc_all_url")]
        tc_all_url: String,

        #[serde(default = "default_tc_detail_url")]
        tc_detail_url: String,

        #[serde(default = "default_execution_type_id")]
        execution_type_id: u64,

        #[serde(default = "default_base_dir")]
        base_dir: PathBuf,

        #[serde(default = "default_req_dir")]
        req_dir: String,

        /// Test cases per page.
        #[serde(default = "default_page_size")]
        page_size: usize,

        /// Milliseconds between test case detail requests.
        #[serde(default = "default_pacing_ms")]
        pacing_ms: u64,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                iam_url,
                domain_name,
                project_id,
                username,
                password,
                token,
                timeout_secs,
                sf_keyword,
                ipd_tree_url,
                ipd_detail_url,
                tc_all_url,
                tc_detail_url,
                execution_type_id,
                base_dir,
                req_dir,
                page_size,
                pacing_ms,
            } => Self {
                iam_url,
                domain_name,
                project_id,
                username,
                password,
                token: token.filter(|t| !t.is_empty()),
                timeout_secs,
                sf_keyword,
                ipd_tree_url,
                ipd_detail_url,
                tc_all_url,
                tc_detail_url,
                execution_type_id,
                base_dir,
                req_dir,
                page_size: page_size.max(1),
                pacing_ms,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            iam_url: config.iam_url,
            domain_name: config.domain_name,
            project_id: config.project_id,
            username: config.username,
            password: config.password,
            token: config.token,
            timeout_secs: config.timeout_secs,
            sf_keyword: config.sf_keyword,
            ipd_tree_url: config.ipd_tree_url,
            ipd_detail_url: config.ipd_detail_url,
            tc_all_url: config.tc_all_url,
            tc_detail_url: config.tc_detail_url,
            execution_type_id: config.execution_type_id,
            base_dir: config.base_dir,
            req_dir: config.req_dir,
            page_size: config.page_size,
            pacing_ms: config.pacing_ms,
        }
    }
}
