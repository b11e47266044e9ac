//! Candidate-set suppliers.
//!
//! The batch driver only needs "give me new descriptions for this
//! category". Candidates come either from a second store document or from a
//! user-configured LM command that reads a prompt on stdin and prints JSON
//! on stdout.
use crate::error::{CurateError, Result};
use crate::store::{load_store, DescriptionStore};
use crate::types::DescriptionSet;
use crate::util::truncate_string;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// Maximum number of retry attempts after an unusable LM response.
const MAX_LM_RETRIES: usize = 2;
const PREVIOUS_RESPONSE_LIMIT: usize = 1000;

const GENERATE_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/generate_descriptions.md"
));
const GENERATE_RETRY_PROMPT: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/prompts/generate_descriptions_retry.md"
));

pub trait CandidateSupplier {
    /// Newly generated descriptions for `category`. `existing` is context
    /// only; suppliers must not assume it will be kept.
    fn candidates(&mut self, category: &str, existing: &[String]) -> Result<DescriptionSet>;
}

/// Candidates read from a store-shaped JSON document.
pub struct FileSupplier {
    path: PathBuf,
    store: DescriptionStore,
}

impl FileSupplier {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            store: load_store(path)?,
        })
    }
}

impl CandidateSupplier for FileSupplier {
    fn candidates(&mut self, category: &str, _existing: &[String]) -> Result<DescriptionSet> {
        self.store
            .get(category)
            .cloned()
            .ok_or_else(|| CurateError::Generation {
                category: category.to_string(),
                message: format!("no candidates in {}", self.path.display()),
            })
    }
}

/// Candidates produced by an external LM command.
#[derive(Debug, Clone)]
pub struct CommandSupplier {
    argv: Vec<String>,
}

impl CommandSupplier {
    /// Parse a shell-style command line and check the program exists.
    pub fn new(command: &str) -> anyhow::Result<Self> {
        let argv =
            shell_words::split(command).with_context(|| format!("parse LM command: {command}"))?;
        let Some(program) = argv.first() else {
            return Err(anyhow!("LM command is empty"));
        };
        which::which(program).with_context(|| format!("LM command not found: {program}"))?;
        Ok(Self { argv })
    }

    fn invoke(&self, prompt: &str) -> anyhow::Result<String> {
        let start = Instant::now();
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn LM command: {}", self.argv[0]))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .context("write prompt to LM stdin")?;
        }

        let output = child.wait_with_output().context("wait for LM command")?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = prompt.len(),
            response_bytes = output.stdout.len(),
            "lm invoke complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "LM command failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        String::from_utf8(output.stdout).context("decode LM stdout as UTF-8")
    }

    fn generate(&self, category: &str, existing: &[String]) -> anyhow::Result<DescriptionSet> {
        let mut last_error: Option<String> = None;
        let mut last_response: Option<String> = None;

        for attempt in 0..=MAX_LM_RETRIES {
            let prompt = match &last_error {
                Some(error) => {
                    tracing::warn!(category, attempt, max = MAX_LM_RETRIES, "LM retry");
                    build_retry_prompt(category, error, last_response.as_deref())
                }
                None => build_prompt(category, existing),
            };

            // Spawn and exit failures are configuration problems; no retry.
            let response = self.invoke(&prompt)?;
            match parse_response(&response) {
                Ok(descriptions) => return Ok(descriptions),
                Err(err) => {
                    last_error = Some(format!("{err:#}"));
                    last_response = Some(response);
                }
            }
        }

        Err(anyhow!(
            "LM failed after {} attempts. Last error: {}",
            MAX_LM_RETRIES + 1,
            last_error.unwrap_or_else(|| "unknown".to_string())
        ))
    }
}

impl CandidateSupplier for CommandSupplier {
    fn candidates(&mut self, category: &str, existing: &[String]) -> Result<DescriptionSet> {
        self.generate(category, existing)
            .map_err(|err| CurateError::Generation {
                category: category.to_string(),
                message: format!("{err:#}"),
            })
    }
}

fn build_prompt(category: &str, existing: &[String]) -> String {
    let existing_section = if existing.is_empty() {
        "None yet.".to_string()
    } else {
        existing
            .iter()
            .map(|d| format!("- {}", d.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    };
    render_template(
        GENERATE_PROMPT,
        &[("category", category), ("existing", &existing_section)],
    )
}

fn build_retry_prompt(category: &str, error: &str, previous: Option<&str>) -> String {
    let previous = previous
        .map(|text| truncate_string(text, PREVIOUS_RESPONSE_LIMIT))
        .unwrap_or_default();
    render_template(
        GENERATE_RETRY_PROMPT,
        &[("category", category), ("error", error), ("previous", &previous)],
    )
}

/// Substitute `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, and braces that do not name a
/// known placeholder are copied through.
fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateResponse {
    List(Vec<String>),
    Single(String),
    Wrapped { descriptions: Vec<String> },
}

/// Parse an LM response into trimmed, non-empty descriptions.
fn parse_response(text: &str) -> anyhow::Result<DescriptionSet> {
    let json_text = extract_json(text);
    let response: CandidateResponse =
        serde_json::from_str(json_text).context("parse LM response JSON")?;
    let raw = match response {
        CandidateResponse::List(items) => items,
        CandidateResponse::Single(item) => vec![item],
        CandidateResponse::Wrapped { descriptions } => descriptions,
    };
    let descriptions: DescriptionSet = raw
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    if descriptions.is_empty() {
        return Err(anyhow!("LM response contained no descriptions"));
    }
    Ok(descriptions)
}

/// Strip markdown code fences around a JSON payload, if present.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let start = start + 7;
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let start = start + 3;
        // Skip language identifier if present
        let start = text[start..]
            .find('\n')
            .map(|i| start + i + 1)
            .unwrap_or(start);
        if let Some(end) = text[start..].find("```") {
            return text[start..start + end].trim();
        }
    }

    text
}

/// Fixed candidates keyed by category.
#[cfg(test)]
pub(crate) struct StaticSupplier {
    pub(crate) sets: std::collections::BTreeMap<String, DescriptionSet>,
    pub(crate) calls: Vec<String>,
}

#[cfg(test)]
impl StaticSupplier {
    pub(crate) fn new(sets: &[(&str, &[&str])]) -> Self {
        Self {
            sets: sets
                .iter()
                .map(|(category, items)| {
                    (
                        category.to_string(),
                        items.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
            calls: Vec::new(),
        }
    }
}

#[cfg(test)]
impl CandidateSupplier for StaticSupplier {
    fn candidates(&mut self, category: &str, _existing: &[String]) -> Result<DescriptionSet> {
        self.calls.push(category.to_string());
        self.sets
            .get(category)
            .cloned()
            .ok_or_else(|| CurateError::Generation {
                category: category.to_string(),
                message: "no static candidates".to_string(),
            })
    }
}
