//! Historical ignore rules recorded on a project.

use crate::error::ApiError;
use crate::transport::Transport;
use crate::types::IgnoreResult;

fn ignores_path(org_id: &str, project_id: &str) -> String {
    format!("/org/{}/project/{}/ignores", org_id, project_id)
}

pub async fn get_project_ignores<T: Transport>(
    transport: &T,
    org_id: &str,
    project_id: &str,
) -> Result<IgnoreResult, ApiError> {
    transport
        .get(&ignores_path(org_id, project_id))
        .await?
        .expect_status(200, "getProjectIgnores")?
        .decode()
}

/// One line per ignore entry, issue ids in sorted order:
/// `issue-id created ignored-by-email reason`, optionally prefixed by the project id.
pub fn format_ignores(ignores: &IgnoreResult, project_id: Option<&str>) -> String {
    let mut out = String::new();
    for (issue_id, entries) in ignores {
        for entry in entries {
            let content = &entry.star;
            if let Some(project_id) = project_id {
                out.push_str(&format!("{:<38}", project_id));
            }
            out.push_str(&format!(
                "{:<30}{:<30}{:<30}{}\n",
                issue_id, content.created, content.ignored_by.email, content.reason
            ));
        }
    }
    out
}
