//! Cross-project vulnerability report for one org.
//!
//! A report moves through three stages: the org name is resolved, the
//! project list is loaded, then every project's issues are loaded together
//! with the top-level dependency each issue was introduced through.
//! Renderers fold over the tree in project order, then issue order.

use crate::error::ApiError;
use crate::issues::{self, IssueQuery};
use crate::orgs::OrgRegistry;
use crate::output::{OutputFormat, render_template};
use crate::projects::ProjectRegistry;
use crate::transport::Transport;
use crate::types::Issue;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::pin::pin;
use tera::Context;
use tracing::debug;

pub const CSV_HEADER: [&str; 6] = [
    "Org Name",
    "Prj Name",
    "Issue Id",
    "Severity",
    "IsIgnored",
    "Introduced",
];

const REPORT_HTML: &str = "<table><tr><td>Org name</td><td>Prj Name</td><td>Issue Id</td><td>Severity</td><td>IsIgnored</td><td>Introduced Through</td></tr>\
{% for row in rows %}<tr><td>{{ org }}</td><td>{{ row.project }}</td><td>{{ row.issue_id }}</td><td>{{ row.severity }}</td><td>{{ row.ignored }}</td><td>{{ row.introduced }}</td></tr>{% endfor %}</table>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    Initialized,
    ProjectsLoaded,
    IssuesLoaded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportProject {
    pub id: String,
    pub name: String,
    pub issues: Vec<Issue>,
}

/// One flattened report line, as written to CSV and HTML.
#[derive(Debug, Serialize)]
struct ReportRow<'r> {
    project: &'r str,
    issue_id: &'r str,
    severity: &'r str,
    ignored: &'static str,
    introduced: &'r str,
}

pub struct ReportAggregator<'a, T: Transport> {
    transport: &'a T,
    pub id: String,
    pub name: String,
    pub projects: Vec<ReportProject>,
    stage: ReportStage,
}

impl<'a, T: Transport> ReportAggregator<'a, T> {
    /// Resolve the org name and load its project list.
    pub async fn new(transport: &'a T, org_id: &str) -> Result<Self, ApiError> {
        let name = OrgRegistry::new(transport).resolve_name(org_id).await?;
        let mut report = Self {
            transport,
            id: org_id.to_string(),
            name,
            projects: Vec::new(),
            stage: ReportStage::Initialized,
        };

        let mut registry = ProjectRegistry::new(transport, org_id);
        report.projects = registry
            .fetch()
            .await?
            .iter()
            .map(|p| ReportProject {
                id: p.id.clone(),
                name: p.name.clone(),
                issues: Vec::new(),
            })
            .collect();
        report.stage = ReportStage::ProjectsLoaded;
        debug!(org_id, projects = report.projects.len(), "report projects loaded");
        Ok(report)
    }

    pub fn stage(&self) -> ReportStage {
        self.stage
    }

    /// Load issues and introduction paths for every project.
    ///
    /// Up to `worker_size` projects are fetched at once; results are applied
    /// in project order. The first failure stops the load and cancels the
    /// projects still in flight; projects already applied keep their issues.
    pub async fn load_issues(&mut self, issue_type: &str, worker_size: usize) -> Result<(), ApiError> {
        issues::check_issue_type(issue_type)?;

        let transport = self.transport;
        let org_id = self.id.as_str();
        let project_ids: Vec<String> = self.projects.iter().map(|p| p.id.clone()).collect();

        let mut results = pin!(
            stream::iter(project_ids)
                .map(|project_id| async move {
                    project_issues(transport, org_id, &project_id, issue_type).await
                })
                .buffered(worker_size.max(1))
        );

        for project in self.projects.iter_mut() {
            match results.try_next().await? {
                Some(issues) => project.issues = issues,
                None => break,
            }
        }

        self.stage = ReportStage::IssuesLoaded;
        Ok(())
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, ApiError> {
        match format {
            OutputFormat::Text => Ok(self.to_text()),
            OutputFormat::Csv => self.to_csv(),
            OutputFormat::Html => self.to_html(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("ORG: {}\nPRJS:\n", self.name);
        for project in &self.projects {
            out.push_str(&format!("---- {}\n--------ISSUES:\n", project.name));
            for issue in &project.issues {
                out.push_str(&format!(
                    "======== {}\n======== INTRODUCED {}\n",
                    issue.id, issue.introduced_through
                ));
            }
        }
        out
    }

    fn rows(&self) -> impl Iterator<Item = ReportRow<'_>> {
        self.projects.iter().flat_map(|project| {
            project.issues.iter().map(move |issue| ReportRow {
                project: &project.name,
                issue_id: &issue.id,
                severity: &issue.issue_data.severity,
                ignored: if issue.is_ignored { "true" } else { "false" },
                introduced: &issue.introduced_through,
            })
        })
    }

    pub fn to_csv(&self) -> Result<String, ApiError> {
        let csv_error = |e: &dyn std::fmt::Display| ApiError::Render {
            format: "csv",
            detail: e.to_string(),
        };

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(CSV_HEADER).map_err(|e| csv_error(&e))?;
        for row in self.rows() {
            writer
                .write_record([
                    self.name.as_str(),
                    row.project,
                    row.issue_id,
                    row.severity,
                    row.ignored,
                    row.introduced,
                ])
                .map_err(|e| csv_error(&e))?;
        }

        let bytes = writer.into_inner().map_err(|e| csv_error(&e))?;
        String::from_utf8(bytes).map_err(|e| csv_error(&e))
    }

    pub fn to_html(&self) -> Result<String, ApiError> {
        let rows: Vec<ReportRow<'_>> = self.rows().collect();
        let mut context = Context::new();
        context.insert("org", &self.name);
        context.insert("rows", &rows);
        render_template("report.html", REPORT_HTML, &context)
    }
}

/// One project's issues, each with its introduction paths appended in API order.
async fn project_issues<T: Transport>(
    transport: &T,
    org_id: &str,
    project_id: &str,
    issue_type: &str,
) -> Result<Vec<Issue>, ApiError> {
    let query = IssueQuery::new(transport);
    let mut issues = query.get_issues(org_id, project_id, issue_type).await?.issues;
    for issue in issues.iter_mut() {
        let paths = query.get_issue_paths(org_id, project_id, &issue.id).await?;
        issue.append_introduced_through(&paths);
    }
    debug!(project_id, issues = issues.len(), "project issues loaded");
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ApiResponse, Method, MockTransport};

    const ORGS: &str = r#"{"orgs":[{"id":"o1","name":"Acme"}]}"#;
    const PATH_PV: &str = r#"{"snapshotId":"s","paths":[[{"name":"p","version":"v"}]]}"#;

    fn base() -> MockTransport {
        MockTransport::new()
            .on(Method::Get, "/orgs", ApiResponse::ok(ORGS))
            .on(
                Method::Get,
                "/org/o1/projects",
                ApiResponse::ok(
                    r#"{"org":{"id":"o1"},"projects":[{"id":"p1","name":"api"},{"id":"p2","name":"web"}]}"#,
                ),
            )
    }

    fn issues_route(transport: MockTransport, project: &str, body: &str) -> MockTransport {
        transport.on(
            Method::Post,
            &format!("/org/o1/project/{}/aggregated-issues", project),
            ApiResponse::ok(body.to_string()),
        )
    }

    fn paths_route(transport: MockTransport, project: &str, issue: &str, body: &str) -> MockTransport {
        transport.on(
            Method::Get,
            &format!("/org/o1/project/{}/issue/{}/paths", project, issue),
            ApiResponse::ok(body.to_string()),
        )
    }

    fn loaded_transport() -> MockTransport {
        let t = base();
        let t = issues_route(
            t,
            "p1",
            r#"{"issues":[
                {"id":"I1","isIgnored":true,"issueData":{"severity":"high"}},
                {"id":"I2","isIgnored":false,"issueData":{"severity":"low"}}
            ]}"#,
        );
        let t = issues_route(t, "p2", r#"{"issues":[]}"#);
        let t = paths_route(t, "p1", "I1", PATH_PV);
        paths_route(t, "p1", "I2", PATH_PV)
    }

    #[tokio::test]
    async fn test_new_resolves_name_and_projects() {
        let transport = base();
        let report = ReportAggregator::new(&transport, "o1").await.unwrap();
        assert_eq!(report.name, "Acme");
        assert_eq!(report.stage(), ReportStage::ProjectsLoaded);
        let names: Vec<_> = report.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["api", "web"]);
        assert!(report.projects.iter().all(|p| p.issues.is_empty()));
    }

    #[tokio::test]
    async fn test_new_fails_on_unknown_org() {
        let transport = base();
        let result = ReportAggregator::new(&transport, "nope").await;
        assert!(matches!(result, Err(ApiError::OrgNotFound(_))));
    }

    #[tokio::test]
    async fn test_load_issues_appends_introduced_through() {
        let transport = loaded_transport();
        let mut report = ReportAggregator::new(&transport, "o1").await.unwrap();
        report.load_issues("", 4).await.unwrap();

        assert_eq!(report.stage(), ReportStage::IssuesLoaded);
        let issues = &report.projects[0].issues;
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.introduced_through == "p@v "));
        assert!(report.projects[1].issues.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_paths_concatenate_in_order() {
        let t = base();
        let t = issues_route(t, "p1", r#"{"issues":[{"id":"I1"}]}"#);
        let t = issues_route(t, "p2", r#"{"issues":[]}"#);
        let transport = paths_route(
            t,
            "p1",
            "I1",
            r#"{"paths":[[{"name":"a","version":"1"},{"name":"z","version":"0"}],[{"name":"b","version":"2"}],[{"name":"a","version":"1"}]]}"#,
        );
        let mut report = ReportAggregator::new(&transport, "o1").await.unwrap();
        report.load_issues("vuln", 1).await.unwrap();
        assert_eq!(report.projects[0].issues[0].introduced_through, "a@1 b@2 a@1 ");
    }

    #[tokio::test]
    async fn test_load_issues_fails_fast() {
        let t = base();
        let t = issues_route(t, "p1", r#"{"issues":[{"id":"I1"}]}"#);
        let t = paths_route(t, "p1", "I1", PATH_PV);
        let transport = t.on(
            Method::Post,
            "/org/o1/project/p2/aggregated-issues",
            ApiResponse::new(500, "500 Internal Server Error", ""),
        );
        let mut report = ReportAggregator::new(&transport, "o1").await.unwrap();

        let err = report.load_issues("", 1).await.unwrap_err();
        assert_eq!(err.to_string(), "getIssues failed: 500 Internal Server Error");
        assert_eq!(report.stage(), ReportStage::ProjectsLoaded);
        assert_eq!(report.projects[0].issues.len(), 1);
    }

    #[tokio::test]
    async fn test_load_issues_rejects_type_before_request() {
        let transport = loaded_transport();
        let mut report = ReportAggregator::new(&transport, "o1").await.unwrap();
        let before = transport.requests().len();
        assert!(report.load_issues("xxx", 2).await.is_err());
        assert_eq!(transport.requests().len(), before);
    }

    #[tokio::test]
    async fn test_renderers() {
        let transport = loaded_transport();
        let mut report = ReportAggregator::new(&transport, "o1").await.unwrap();
        report.load_issues("", 0).await.unwrap();

        assert_eq!(
            report.to_text(),
            "ORG: Acme\nPRJS:\n---- api\n--------ISSUES:\n======== I1\n======== INTRODUCED p@v \n\
             ======== I2\n======== INTRODUCED p@v \n---- web\n--------ISSUES:\n"
        );

        let csv = report.render(OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Org Name,Prj Name,Issue Id,Severity,IsIgnored,Introduced",
                "Acme,api,I1,high,true,p@v ",
                "Acme,api,I2,low,false,p@v ",
            ]
        );

        let html = report.render(OutputFormat::Html).unwrap();
        assert!(html.starts_with("<table><tr><td>Org name</td>"));
        assert!(html.ends_with("</table>"));
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains(
            "<tr><td>Acme</td><td>api</td><td>I1</td><td>high</td><td>true</td><td>p@v </td></tr>"
        ));
    }

    #[test]
    fn test_csv_quotes_embedded_commas() {
        let report = ReportAggregator {
            transport: &MockTransport::new(),
            id: "o1".to_string(),
            name: "Acme, Inc".to_string(),
            projects: vec![ReportProject {
                id: "p1".to_string(),
                name: "api".to_string(),
                issues: vec![Issue {
                    id: "I1".to_string(),
                    introduced_through: "a@1 ".to_string(),
                    ..Issue::default()
                }],
            }],
            stage: ReportStage::IssuesLoaded,
        };
        let csv = report.to_csv().unwrap();
        assert!(csv.ends_with("\"Acme, Inc\",api,I1,,false,a@1 \n"));
    }

    #[test]
    fn test_html_escapes_names() {
        let report = ReportAggregator {
            transport: &MockTransport::new(),
            id: "o1".to_string(),
            name: "<script>".to_string(),
            projects: vec![],
            stage: ReportStage::IssuesLoaded,
        };
        let html = report.to_html().unwrap();
        assert!(!html.contains("<script>"));
    }
}
