use serde::Deserialize;

/// Main configuration structure for Rulespider
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,

    /// Seed URLs loaded into the frontier before the crawl loop starts
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Site-specific extraction rules, in declaration order
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Upper bound on a single page fetch (milliseconds)
    #[serde(rename = "fetch-timeout-ms", default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Fixed pacing delay applied after each fetch (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Path to the durable visit counter file
    #[serde(rename = "counter-path")]
    pub counter_path: String,

    /// Size of the dedup filter in bits
    #[serde(rename = "dedup-bits", default = "default_dedup_bits")]
    pub dedup_bits: usize,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Default JSON-lines record file, used by rules without their own
    #[serde(rename = "records-path")]
    pub records_path: String,
}

/// One declarative extraction rule
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Optional rule name for logs and error messages
    #[serde(default)]
    pub name: Option<String>,

    /// URL scheme this rule governs ("http" or "https")
    pub scheme: String,

    /// Host this rule governs
    pub host: String,

    /// Explicit port; omit for scheme-default ports
    #[serde(default)]
    pub port: Option<u16>,

    /// Path pattern, matched as an unanchored regular expression
    pub pattern: String,

    /// Ordered pipeline of extraction steps
    #[serde(default, rename = "processor")]
    pub processors: Vec<ProcessorConfig>,

    /// Per-rule record file overriding `[output] records-path`
    #[serde(default, rename = "records-path")]
    pub records_path: Option<String>,
}

impl RuleConfig {
    /// Name used in logs and validation errors.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.host, self.pattern))
    }
}

/// One pipeline step of a rule
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Operation kind: "grab", "save" or "appendInfo"
    pub op: String,

    /// CSS selector; required for grab/save
    #[serde(default)]
    pub selector: Option<String>,

    /// Target: the attribute to read for grab, the record field for save
    /// and appendInfo
    pub tag: String,

    /// Source key read from the per-visit parameters (appendInfo only)
    #[serde(default)]
    pub val: Option<String>,
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_page_delay_ms() -> u64 {
    1_000
}

fn default_dedup_bits() -> usize {
    crate::dedup::DEFAULT_FILTER_BITS
}

fn default_user_agent() -> String {
    format!("rulespider/{}", env!("CARGO_PKG_VERSION"))
}
