//! Configuration validation
//!
//! Surfaces rule-authoring mistakes at load time rather than mid-crawl: a
//! `grab`/`save` processor without a selector, an unrecognized operation, an
//! `appendInfo` without a source key, and patterns or selectors that do not
//! compile are all rejected here.

use crate::config::types::{Config, ProcessorConfig, RuleConfig};
use crate::ConfigError;
use url::Url;

/// Operations a processor may declare.
const KNOWN_OPS: &[&str] = &["grab", "save", "appendInfo"];

/// Validates a parsed configuration
///
/// # Returns
///
/// * `Ok(())` - Configuration is valid
/// * `Err(ConfigError)` - The first problem found
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.fetch_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "crawler.fetch-timeout-ms must be greater than 0".to_string(),
        ));
    }

    if config.crawler.dedup_bits == 0 {
        return Err(ConfigError::Validation(
            "crawler.dedup-bits must be greater than 0".to_string(),
        ));
    }

    if config.crawler.counter_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler.counter-path must not be empty".to_string(),
        ));
    }

    if config.rules.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[rule]] is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("seed {seed}: {e}"))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "seed {seed}: only http and https are supported"
            )));
        }
    }

    for rule in &config.rules {
        validate_rule(rule)?;
    }

    Ok(())
}

fn validate_rule(rule: &RuleConfig) -> Result<(), ConfigError> {
    let name = rule.display_name();

    if rule.scheme != "http" && rule.scheme != "https" {
        return Err(ConfigError::Validation(format!(
            "rule {name}: scheme must be http or https, got {:?}",
            rule.scheme
        )));
    }

    if rule.host.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "rule {name}: host must not be empty"
        )));
    }

    regex::Regex::new(&rule.pattern).map_err(|source| ConfigError::InvalidPattern {
        rule: name.clone(),
        source,
    })?;

    if rule.processors.is_empty() {
        return Err(ConfigError::Validation(format!(
            "rule {name}: at least one [[rule.processor]] is required"
        )));
    }

    for processor in &rule.processors {
        validate_processor(&name, processor)?;
    }

    Ok(())
}

fn validate_processor(rule: &str, processor: &ProcessorConfig) -> Result<(), ConfigError> {
    if !KNOWN_OPS.contains(&processor.op.as_str()) {
        return Err(ConfigError::Validation(format!(
            "rule {rule}: unknown processor op {:?} (expected one of {KNOWN_OPS:?})",
            processor.op
        )));
    }

    if processor.tag.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "rule {rule}: processor tag must not be empty"
        )));
    }

    match processor.op.as_str() {
        "grab" | "save" => {
            let selector = processor.selector.as_deref().ok_or_else(|| {
                ConfigError::Validation(format!(
                    "rule {rule}: {} processor requires a selector",
                    processor.op
                ))
            })?;
            scraper::Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
                rule: rule.to_string(),
                message: format!("{selector:?}: {e}"),
            })?;
        }
        "appendInfo" => {
            if processor.val.is_none() {
                return Err(ConfigError::Validation(format!(
                    "rule {rule}: appendInfo processor requires a val source key"
                )));
            }
            if processor.selector.is_some() {
                return Err(ConfigError::Validation(format!(
                    "rule {rule}: appendInfo processor does not take a selector"
                )));
            }
        }
        _ => unreachable!("op checked against KNOWN_OPS"),
    }

    Ok(())
}
