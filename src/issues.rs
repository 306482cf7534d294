//! Issue queries: per-project issue lists, dependency paths and org-wide
//! severity counts.

use crate::error::ApiError;
use crate::output::{OutputFormat, render_template};
use crate::transport::Transport;
use crate::types::{Issue, IssueCountResults, IssuePathsResult, ProjectIssuesResult};
use serde::Serialize;
use serde_json::json;
use tera::Context;
use tracing::debug;

const ISSUE_COUNT_PATH: &str = "/reporting/counts/issues/latest?groupBy=project,severity";

pub const ISSUE_TYPES: [&str; 2] = ["vuln", "license"];

const COUNT_HTML: &str = "<table><tr><td>Total</td><td>Critical</td><td>High</td><td>Medium</td><td>Low</td></tr>\
<tr><td>{{ count }}</td><td>{{ critical }}</td><td>{{ high }}</td><td>{{ medium }}</td><td>{{ low }}</td></tr></table>";

fn issues_path(org_id: &str, project_id: &str) -> String {
    format!("/org/{}/project/{}/aggregated-issues", org_id, project_id)
}

fn issue_paths_path(org_id: &str, project_id: &str, issue_id: &str) -> String {
    format!(
        "/org/{}/project/{}/issue/{}/paths",
        org_id, project_id, issue_id
    )
}

/// Accept `""`, `vuln` or `license`.
pub fn check_issue_type(issue_type: &str) -> Result<(), ApiError> {
    if issue_type.is_empty() || ISSUE_TYPES.contains(&issue_type) {
        Ok(())
    } else {
        Err(ApiError::InvalidIssueType(issue_type.to_string()))
    }
}

/// `{"filters":{"types":[..]}}`. Anything other than `vuln` or `license`,
/// including values [`check_issue_type`] rejects, selects both types.
pub fn build_issue_type_filter(issue_type: &str) -> String {
    let types: &[&str] = match issue_type {
        "vuln" => &["vuln"],
        "license" => &["license"],
        _ => &ISSUE_TYPES,
    };
    json!({ "filters": { "types": types } }).to_string()
}

pub struct IssueQuery<'a, T: Transport> {
    transport: &'a T,
}

impl<'a, T: Transport> IssueQuery<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Aggregated issues of one project, optionally narrowed to one issue type.
    pub async fn get_issues(
        &self,
        org_id: &str,
        project_id: &str,
        issue_type: &str,
    ) -> Result<ProjectIssuesResult, ApiError> {
        check_issue_type(issue_type)?;
        let body = build_issue_type_filter(issue_type);
        let result: ProjectIssuesResult = self
            .transport
            .post(&issues_path(org_id, project_id), body.into_bytes())
            .await?
            .expect_status(200, "getIssues")?
            .decode()?;
        debug!(org_id, project_id, count = result.issues.len(), "fetched issues");
        Ok(result)
    }

    pub async fn get_issue_paths(
        &self,
        org_id: &str,
        project_id: &str,
        issue_id: &str,
    ) -> Result<IssuePathsResult, ApiError> {
        self.transport
            .get(&issue_paths_path(org_id, project_id, issue_id))
            .await?
            .expect_status(200, "getIssuePaths")?
            .decode()
    }

    /// Latest issue counts for an org, grouped by project and severity.
    pub async fn get_issue_count(&self, org_id: &str) -> Result<IssueCountResults, ApiError> {
        let body = json!({ "filters": { "orgs": [org_id] } }).to_string();
        self.transport
            .post(ISSUE_COUNT_PATH, body.into_bytes())
            .await?
            .expect_status(200, "issueCount")?
            .decode()
    }
}

/// Issue counts summed over every day and project of a counts result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueCountTotals {
    pub count: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl IssueCountTotals {
    pub fn sum(results: &IssueCountResults) -> Self {
        results
            .results
            .iter()
            .flat_map(|day| day.results.iter())
            .fold(Self::default(), |acc, project| Self {
                count: acc.count + project.count,
                critical: acc.critical + project.severity.critical,
                high: acc.high + project.severity.high,
                medium: acc.medium + project.severity.medium,
                low: acc.low + project.severity.low,
            })
    }
}

pub fn format_issue_count(
    results: &IssueCountResults,
    format: OutputFormat,
) -> Result<String, ApiError> {
    let t = IssueCountTotals::sum(results);
    match format {
        OutputFormat::Text => Ok(format!(
            "COUNT: {}\nCRITICAL: {}\nHIGH: {}\nMEDIUM: {}\nLOW: {}\n",
            t.count, t.critical, t.high, t.medium, t.low
        )),
        OutputFormat::Csv => Ok(format!(
            "Total,Critical,High,Medium,Low\n{},{},{},{},{}\n",
            t.count, t.critical, t.high, t.medium, t.low
        )),
        OutputFormat::Html => {
            let context = Context::from_serialize(t).map_err(|e| ApiError::Render {
                format: "html",
                detail: e.to_string(),
            })?;
            render_template("count.html", COUNT_HTML, &context)
        }
    }
}

/// One fixed-width row per issue: id, package, severity, type, ignored.
/// With `project_id`, each row is prefixed by it.
pub fn format_project_issues(issues: &[Issue], project_id: Option<&str>) -> String {
    let mut out = String::new();
    for issue in issues {
        if let Some(project_id) = project_id {
            out.push_str(&format!("{:<38}", project_id));
        }
        out.push_str(&format!(
            "{:<38}{:<30}{:<15}{:<10}{}\n",
            issue.id, issue.pkg_name, issue.issue_data.severity, issue.issue_type, issue.is_ignored
        ));
    }
    out
}
