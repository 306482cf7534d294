//! Wire models for organizations, projects, members and issues.
//!
//! Every field defaults when absent; the API adds fields freely and omits
//! empty ones.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Org {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// `GET /orgs` envelope.
#[derive(Debug, Default, Deserialize)]
pub struct OrgsEnvelope {
    #[serde(default)]
    pub orgs: Vec<Org>,
}

/// Multi-valued project classification; only the first value is shown or written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default)]
    pub criticality: Vec<String>,
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub lifecycle: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attributes: Attributes,
    /// Ordered; the same key may appear more than once.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Projects list envelope, for both the plain and the filtered fetch.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectsEnvelope {
    #[serde(default)]
    pub org: Org,
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub exploit_maturity: String,
    #[serde(default, rename = "CVSSv3")]
    pub cvss_v3: Option<String>,
    #[serde(default)]
    pub cvss_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pkg_name: String,
    #[serde(default)]
    pub pkg_versions: Vec<String>,
    #[serde(default)]
    pub issue_data: IssueData,
    #[serde(default)]
    pub is_ignored: bool,
    #[serde(default)]
    pub issue_type: String,
    /// `name@version ` tokens appended by the report, one per dependency path.
    #[serde(skip)]
    pub introduced_through: String,
}

impl Issue {
    /// Append the top-level hop of every path. Never resets what is already there.
    pub fn append_introduced_through(&mut self, paths: &IssuePathsResult) {
        for hop in paths.paths.iter().filter_map(|path| path.first()) {
            self.introduced_through.push_str(&hop.name);
            self.introduced_through.push('@');
            self.introduced_through.push_str(&hop.version);
            self.introduced_through.push(' ');
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectIssuesResult {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePath {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePathsResult {
    #[serde(default)]
    pub snapshot_id: String,
    #[serde(default)]
    pub paths: Vec<Vec<IssuePath>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Severity {
    #[serde(default)]
    pub critical: u64,
    #[serde(default)]
    pub high: u64,
    #[serde(default)]
    pub medium: u64,
    #[serde(default)]
    pub low: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIssueCount {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub severity: Severity,
}

/// One day of per-project counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssueCountResult {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub results: Vec<ProjectIssueCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssueCountResults {
    #[serde(default)]
    pub results: Vec<IssueCountResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreContent {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub reason_type: String,
    #[serde(default)]
    pub ignored_by: User,
}

/// Ignore rules are keyed by path pattern; `*` covers every path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IgnoreStar {
    #[serde(rename = "*", default)]
    pub star: IgnoreContent,
}

/// Issue id to the ignore rules recorded for it.
pub type IgnoreResult = BTreeMap<String, Vec<IgnoreStar>>;
