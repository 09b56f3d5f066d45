//! Compiled extraction rules
//!
//! A [`Rule`] binds a URL shape to an ordered pipeline of [`Processor`] steps
//! and a persistence sink. Rules are compiled once from the configuration and
//! are immutable and shared read-only for the crawl lifetime.

mod matcher;

pub use matcher::RuleSet;

use crate::config::{ProcessorConfig, RuleConfig};
use crate::output::RecordSink;
use crate::{ConfigError, ConfigResult};
use regex::Regex;
use scraper::Selector;
use std::sync::Arc;
use url::Url;

/// Coarse first-stage match key: (scheme, host, port).
///
/// `port` is `None` for absent or scheme-default ports; the `url` crate
/// normalizes default ports away, so an explicit `:80` on an http URL and no
/// port at all produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl RuleKey {
    /// Builds the match key for a target URL; `None` when the URL has no host.
    pub fn from_url(url: &Url) -> Option<Self> {
        url.host_str().map(|host| Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port(),
        })
    }
}

/// One step of a rule's extraction pipeline.
pub enum Processor {
    /// Link discovery: read attribute `attr` from every selected node,
    /// normalize it and enqueue it if unseen. No record effect.
    Grab { selector: Selector, attr: String },

    /// Append the text content of every selected node to record field
    /// `field`, joining repeats with the fixed delimiter.
    Save { selector: Selector, field: String },

    /// Copy the per-visit parameter `source` into record field `field`.
    AppendInfo { field: String, source: String },
}

impl Processor {
    fn compile(rule: &str, cfg: &ProcessorConfig) -> ConfigResult<Self> {
        let parse_selector = |raw: &str| {
            Selector::parse(raw).map_err(|e| ConfigError::InvalidSelector {
                rule: rule.to_string(),
                message: format!("{raw:?}: {e}"),
            })
        };

        match cfg.op.as_str() {
            "grab" => {
                let raw = cfg.selector.as_deref().ok_or_else(|| {
                    ConfigError::Validation(format!("rule {rule}: grab requires a selector"))
                })?;
                Ok(Processor::Grab {
                    selector: parse_selector(raw)?,
                    attr: cfg.tag.clone(),
                })
            }
            "save" => {
                let raw = cfg.selector.as_deref().ok_or_else(|| {
                    ConfigError::Validation(format!("rule {rule}: save requires a selector"))
                })?;
                Ok(Processor::Save {
                    selector: parse_selector(raw)?,
                    field: cfg.tag.clone(),
                })
            }
            "appendInfo" => {
                let source = cfg.val.clone().ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "rule {rule}: appendInfo requires a val source key"
                    ))
                })?;
                Ok(Processor::AppendInfo {
                    field: cfg.tag.clone(),
                    source,
                })
            }
            other => Err(ConfigError::Validation(format!(
                "rule {rule}: unknown processor op {other:?}"
            ))),
        }
    }
}

/// A compiled rule: URL shape, ordered pipeline, persistence sink.
pub struct Rule {
    pub name: String,
    pub key: RuleKey,
    pub pattern: Regex,
    pub processors: Vec<Processor>,
    pub sink: Arc<dyn RecordSink>,
}

impl Rule {
    /// Compiles a configured rule, binding it to its persistence sink.
    pub fn compile(cfg: &RuleConfig, sink: Arc<dyn RecordSink>) -> ConfigResult<Self> {
        let name = cfg.display_name();

        let pattern = Regex::new(&cfg.pattern).map_err(|source| ConfigError::InvalidPattern {
            rule: name.clone(),
            source,
        })?;

        let processors = cfg
            .processors
            .iter()
            .map(|p| Processor::compile(&name, p))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            name,
            key: RuleKey {
                scheme: cfg.scheme.clone(),
                host: cfg.host.clone(),
                port: cfg.port,
            },
            pattern,
            processors,
            sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;

    fn processor(op: &str, selector: Option<&str>, tag: &str, val: Option<&str>) -> ProcessorConfig {
        ProcessorConfig {
            op: op.to_string(),
            selector: selector.map(str::to_string),
            tag: tag.to_string(),
            val: val.map(str::to_string),
        }
    }

    fn rule_config(processors: Vec<ProcessorConfig>) -> RuleConfig {
        RuleConfig {
            name: None,
            scheme: "http".to_string(),
            host: "example.com".to_string(),
            port: None,
            pattern: "^/a$".to_string(),
            processors,
            records_path: None,
        }
    }

    #[test]
    fn test_compile_full_pipeline() {
        let cfg = rule_config(vec![
            processor("grab", Some("a"), "href", None),
            processor("save", Some("title"), "title", None),
            processor("appendInfo", None, "origin", Some("url")),
        ]);
        let rule = Rule::compile(&cfg, Arc::new(MemorySink::new())).unwrap();
        assert_eq!(rule.processors.len(), 3);
        assert_eq!(rule.name, "example.com ^/a$");
        assert!(matches!(rule.processors[0], Processor::Grab { .. }));
        assert!(matches!(rule.processors[2], Processor::AppendInfo { .. }));
    }

    #[test]
    fn test_compile_rejects_unknown_op() {
        let cfg = rule_config(vec![processor("scoop", Some("a"), "href", None)]);
        assert!(Rule::compile(&cfg, Arc::new(MemorySink::new())).is_err());
    }

    #[test]
    fn test_compile_rejects_missing_selector() {
        let cfg = rule_config(vec![processor("save", None, "title", None)]);
        assert!(Rule::compile(&cfg, Arc::new(MemorySink::new())).is_err());
    }

    #[test]
    fn test_key_from_url() {
        let url = Url::parse("http://example.com:8080/a").unwrap();
        let key = RuleKey::from_url(&url).unwrap();
        assert_eq!(key.scheme, "http");
        assert_eq!(key.host, "example.com");
        assert_eq!(key.port, Some(8080));
    }

    #[test]
    fn test_key_default_port_is_none() {
        let explicit = Url::parse("http://example.com:80/a").unwrap();
        let implicit = Url::parse("http://example.com/a").unwrap();
        assert_eq!(
            RuleKey::from_url(&explicit).unwrap(),
            RuleKey::from_url(&implicit).unwrap()
        );
    }
}
