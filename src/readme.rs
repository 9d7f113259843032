//! README regeneration.
//!
//! The README is rendered from a template holding `{{name}}` placeholders.
//! Every value derives from the files in the archive, so re-rendering an
//! unchanged archive produces an identical README and `--check` stays
//! quiet in CI.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::ReadmeConfig;
use crate::coverage::Coverage;
use crate::error::{Error, Result};

const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, PartialEq)]
pub struct Rendered {
    pub text: String,
    /// Placeholders in the template with no known value, left untouched.
    pub unknown: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Unchanged,
    Stale,
}

pub fn values(coverage: &Coverage) -> BTreeMap<&'static str, String> {
    let day = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    BTreeMap::from([
        ("snapshot_count", coverage.snapshot_count.to_string()),
        ("archived_days", coverage.archived_days.to_string()),
        ("missing_days", coverage.missing_days.to_string()),
        ("gap_count", coverage.gaps.len().to_string()),
        ("first_day", day(coverage.first_day)),
        ("last_day", day(coverage.last_day)),
        (
            "updated_at",
            coverage
                .last_request
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
    ])
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn render(template: &str, values: &BTreeMap<&str, String>) -> Rendered {
    let mut text = String::with_capacity(template.len());
    let mut unknown = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let close = open + 2 + close;
        let name = rest[open + 2..close].trim();

        text.push_str(&rest[..open]);
        match values.get(name) {
            Some(value) => text.push_str(value),
            None => {
                if is_placeholder_name(name) && !unknown.iter().any(|u| u == name) {
                    unknown.push(name.to_string());
                }
                text.push_str(&rest[open..close + 2]);
            }
        }
        rest = &rest[close + 2..];
    }
    text.push_str(rest);

    Rendered { text, unknown }
}

/// Renders the configured template. With `check` set nothing is written and
/// the outcome says whether the output file is current.
pub fn regenerate(config: &ReadmeConfig, coverage: &Coverage, check: bool) -> Result<Outcome> {
    let template = read(&config.template)?;
    let rendered = render(&template, &values(coverage));

    for name in &rendered.unknown {
        log::warn!("{}: unknown placeholder {{{{{name}}}}}", config.template.display());
    }

    let current = match fs::read_to_string(&config.output) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(&config.output, e)),
    };

    if current.as_deref() == Some(rendered.text.as_str()) {
        return Ok(Outcome::Unchanged);
    }
    if check {
        return Ok(Outcome::Stale);
    }

    fs::write(&config.output, &rendered.text).map_err(|e| Error::io(&config.output, e))?;
    log::info!("wrote {}", config.output.display());
    Ok(Outcome::Written)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
