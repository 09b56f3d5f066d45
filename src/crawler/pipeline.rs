//! Extraction pipeline execution
//!
//! Runs a rule's ordered processor list against a fetched document. `grab`
//! steps discover links (normalized, dedup-checked, enqueued); `save` steps
//! accumulate node text into record fields; `appendInfo` steps copy values
//! from the per-visit parameters. The pipeline itself never fails: malformed
//! links are skipped with a log line and everything else is best-effort.

use crate::dedup::DedupFilter;
use crate::frontier::Frontier;
use crate::output::Record;
use crate::rules::{Processor, Rule};
use crate::url::normalize;
use scraper::Html;
use std::collections::HashMap;
use url::Url;

/// Executes `rule`'s pipeline over `html`, producing the record for `url`.
///
/// `params` is the per-visit parameter map feeding `appendInfo` steps; the
/// engine pre-seeds it with the visited URL under the key `"url"`. Discovered
/// links go straight into `frontier` unless `dedup` already reports them seen.
pub fn run(
    rule: &Rule,
    html: &Html,
    url: &Url,
    params: &HashMap<String, String>,
    dedup: &DedupFilter,
    frontier: &Frontier,
) -> Record {
    let mut record = Record::new(url.as_str());

    for processor in &rule.processors {
        match processor {
            Processor::Grab { selector, attr } => {
                for element in html.select(selector) {
                    let Some(raw) = element.value().attr(attr) else {
                        continue;
                    };
                    match normalize(raw, url) {
                        Ok(link) => {
                            if !dedup.might_contain(&link) {
                                tracing::info!("Found link to visit: {}", link);
                                frontier.push(link);
                            } else {
                                tracing::debug!("Skip visited link: {}", link);
                            }
                        }
                        Err(e) => {
                            tracing::debug!("Skipping unusable link {:?}: {}", raw, e);
                        }
                    }
                }
            }

            Processor::Save { selector, field } => {
                for element in html.select(selector) {
                    let text: String = element.text().collect();
                    record.append(field, &text);
                }
            }

            Processor::AppendInfo { field, source } => {
                if let Some(value) = params.get(source) {
                    record.set(field, value);
                } else {
                    tracing::debug!("No visit parameter {:?} for field {:?}", source, field);
                }
            }
        }
    }

    record
}
