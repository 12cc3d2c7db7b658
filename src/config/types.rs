use serde::Deserialize;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub harvest: HarvestConfig,
    pub scope: ScopeConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Traversal behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Crawl-root URLs, processed in order
    pub roots: Vec<String>,

    /// Maximum embedding depth below a crawl root
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Start every crawl root with empty visited and hash sets
    #[serde(rename = "reset-visited-per-root", default = "default_true")]
    pub reset_visited_per_root: bool,

    /// Allow a visited URL to be fetched again when it is reached at a shallower
    /// depth that is below this threshold
    #[serde(rename = "recheck-duplicates-below-depth", default)]
    pub recheck_duplicates_below_depth: Option<u32>,

    /// Drop repeated structural fragments (see `selectors.fragments`)
    #[serde(rename = "dedup-fragments", default)]
    pub dedup_fragments: bool,
}

/// Which hosts the harvester may follow links into
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Domain patterns (e.g., "kb.example.com" or "*.example.com")
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,
}

/// CSS selectors describing the site's page layout
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Content root candidates, first match wins
    #[serde(default = "default_content_selectors")]
    pub content: Vec<String>,

    /// Title candidates, first non-empty match wins
    #[serde(default = "default_title_selectors")]
    pub title: Vec<String>,

    /// Elements removed before any processing
    #[serde(default)]
    pub ignored: Vec<String>,

    /// Navigation widgets, detached and expanded once per unique content
    #[serde(default)]
    pub navigation: Vec<String>,

    /// Elements whose links are never embedded
    #[serde(rename = "non-recursive", default)]
    pub non_recursive: Vec<String>,

    /// Structural fragments considered for duplicate suppression
    #[serde(default)]
    pub fragments: Vec<String>,

    /// Table-of-contents items that name their target through an attribute
    #[serde(rename = "nested-index", default)]
    pub nested_index: Option<NestedIndexConfig>,
}

/// Nested index items carry a page identifier instead of an href
#[derive(Debug, Clone, Deserialize)]
pub struct NestedIndexConfig {
    /// Attribute holding the target identifier (e.g., "data-page-id")
    pub attribute: String,

    /// Target URL with an `{id}` placeholder
    #[serde(rename = "url-template")]
    pub url_template: String,
}

/// Page fetching configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Form login performed once before the first page fetch
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// URL the login form posts to
    #[serde(rename = "login-url")]
    pub login_url: String,

    /// Form field name for the username
    #[serde(rename = "username-field")]
    pub username_field: String,

    /// Form field name for the password
    #[serde(rename = "password-field")]
    pub password_field: String,

    /// Account name
    pub username: String,

    /// Environment variable holding the password
    #[serde(rename = "password-env")]
    pub password_env: String,

    /// Text that only appears in the response when the login was rejected
    #[serde(rename = "failure-marker", default)]
    pub failure_marker: Option<String>,
}

/// Image download configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    /// Download images and replace them with placeholder tokens
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory of the content-addressed image store
    #[serde(default = "default_image_directory")]
    pub directory: String,

    /// Download attempts per image URL
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding one append-only artifact per crawl root
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            content: default_content_selectors(),
            title: default_title_selectors(),
            ignored: Vec::new(),
            navigation: Vec::new(),
            non_recursive: Vec::new(),
            fragments: Vec::new(),
            nested_index: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_image_directory(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_content_selectors() -> Vec<String> {
    vec!["main".to_string(), "article".to_string(), "body".to_string()]
}

fn default_title_selectors() -> Vec<String> {
    vec!["h1".to_string(), "title".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("kb-harvester/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_image_directory() -> String {
    "./images".to_string()
}

fn default_output_directory() -> String {
    "./out".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}
