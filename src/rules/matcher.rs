//! Rule matching: URL to governing rule
//!
//! Matching is two-staged. The coarse key (scheme, host, port) selects all
//! rules registered for that site; the fine stage walks those candidates in
//! registration order and takes the first whose path pattern finds a match
//! anywhere in the URL path. A substring match is sufficient, so rule authors
//! order specific patterns before general ones.

use crate::config::Config;
use crate::output::{JsonlSink, RecordSink};
use crate::rules::{Rule, RuleKey};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// The full configured rule set, indexed for matching.
pub struct RuleSet {
    index: HashMap<RuleKey, Vec<Arc<Rule>>>,
    len: usize,
}

impl RuleSet {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            len: 0,
        }
    }

    /// Compiles the configured rules, opening one JSON-lines sink per
    /// distinct record file (rules sharing a path share the sink).
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut sinks: HashMap<String, Arc<JsonlSink>> = HashMap::new();
        let mut set = Self::new();

        for rule_cfg in &config.rules {
            let path = rule_cfg
                .records_path
                .clone()
                .unwrap_or_else(|| config.output.records_path.clone());
            let sink = match sinks.get(&path) {
                Some(sink) => Arc::clone(sink),
                None => {
                    let sink = Arc::new(JsonlSink::open(&path)?);
                    sinks.insert(path, Arc::clone(&sink));
                    sink
                }
            };
            set.insert(Rule::compile(rule_cfg, sink as Arc<dyn RecordSink>)?);
        }

        Ok(set)
    }

    /// Registers a rule; insertion order is preserved per key.
    pub fn insert(&mut self, rule: Rule) {
        self.index
            .entry(rule.key.clone())
            .or_default()
            .push(Arc::new(rule));
        self.len += 1;
    }

    /// Finds the single governing rule for a URL.
    ///
    /// Returns `None` when no rule is registered under the URL's
    /// (scheme, host, port) key or no candidate's pattern matches its path.
    pub fn find_rule(&self, url: &Url) -> Option<Arc<Rule>> {
        let key = RuleKey::from_url(url)?;
        let candidates = self.index.get(&key)?;
        let path = url.path();
        candidates
            .iter()
            .find(|rule| rule.pattern.is_match(path))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}
