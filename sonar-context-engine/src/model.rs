//! Data model shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single static-analysis finding as returned by `issues/search`.
///
/// The upstream object is kept verbatim so every field reaches the caller
/// untouched; only the handful of fields the pipeline needs get accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Issue {
    fields: Map<String, Value>,
}

impl Issue {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn key(&self) -> Option<&str> {
        self.str_field("key")
    }

    /// Project key and file path encoded together, e.g. `proj:src/app.py`.
    pub fn component(&self) -> Option<&str> {
        self.str_field("component").filter(|c| !c.is_empty())
    }

    /// PR association; Sonar reports it as a string, some deployments as a number.
    pub fn pull_request(&self) -> Option<String> {
        match self.fields.get("pullRequest")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Branch association, present on issues raised outside pull requests.
    pub fn branch(&self) -> Option<&str> {
        self.str_field("branch").filter(|b| !b.trim().is_empty())
    }

    pub fn line(&self) -> Option<i64> {
        self.fields.get("line").and_then(as_line_number)
    }

    pub fn text_range_start(&self) -> Option<i64> {
        self.text_range_field("startLine")
    }

    fn text_range_field(&self, name: &str) -> Option<i64> {
        self.fields
            .get("textRange")
            .and_then(|r| r.get(name))
            .and_then(as_line_number)
    }
}

/// Line numbers occasionally arrive as strings from older deployments.
fn as_line_number(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// How the PR identifier for a request was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    Explicit,
    LatestOpen,
    InferredFromIssue,
}

/// The pull request a request operates on. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrReference {
    pub project_key: String,
    pub identifier: String,
    pub resolution_method: ResolutionMethod,
}

/// One numbered line of source text (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: u32,
    pub text: String,
}

impl SourceLine {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Lines around an issue, already clamped to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceWindow {
    pub component: String,
    pub from_line: u32,
    pub to_line: u32,
    pub lines: Vec<SourceLine>,
}

/// Outcome of enriching a single issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionStatus {
    Ok,
    NoLineInfo,
    SourceUnavailable,
    FetchTimeout,
}

/// An issue together with its source context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedIssue {
    #[serde(flatten)]
    pub issue: Map<String, Value>,
    pub source_code: String,
    pub resolution_status: ResolutionStatus,
}

/// Response body for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub project: String,
    pub pr: String,
    /// Reported only when the PR was discovered rather than given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_resolution: Option<ResolutionMethod>,
    pub issues: Vec<EnrichedIssue>,
}
