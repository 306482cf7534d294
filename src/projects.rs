//! Project registry for one organization.
//!
//! Holds the projects fetched for an org. Attribute and tag writes go
//! straight to the API and are not reflected in the local list; deletions
//! remove the project locally as well.

use crate::error::ApiError;
use crate::filter::{self, AttributeSelection};
use crate::output::ListMode;
use crate::transport::{Body, Transport};
use crate::types::{Org, Project, ProjectsEnvelope};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, info};

fn projects_path(org_id: &str) -> String {
    format!("/org/{}/projects", org_id)
}

fn project_path(org_id: &str, project_id: &str) -> String {
    format!("/org/{}/project/{}", org_id, project_id)
}

fn tags_path(org_id: &str, project_id: &str) -> String {
    format!("/org/{}/project/{}/tags", org_id, project_id)
}

fn attributes_path(org_id: &str, project_id: &str) -> String {
    format!("/org/{}/project/{}/attributes", org_id, project_id)
}

pub struct ProjectRegistry<'a, T: Transport> {
    transport: &'a T,
    org: Org,
    projects: Vec<Project>,
}

impl<'a, T: Transport> ProjectRegistry<'a, T> {
    pub fn new(transport: &'a T, org_id: &str) -> Self {
        Self {
            transport,
            org: Org {
                id: org_id.to_string(),
                name: String::new(),
            },
            projects: Vec::new(),
        }
    }

    pub fn org(&self) -> &Org {
        &self.org
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    async fn request_list(&self) -> Result<Body, ApiError> {
        self.transport
            .get(&projects_path(&self.org.id))
            .await?
            .expect_status(200, "GetProjects")
    }

    /// POST the filter body, or fall back to the plain list when nothing is constrained.
    async fn request_filtered(
        &self,
        selection: &AttributeSelection,
        tags: &BTreeMap<String, String>,
    ) -> Result<Body, ApiError> {
        selection.validate()?;
        match filter::build_filter_body(selection, tags) {
            Some(body) => self
                .transport
                .post(&projects_path(&self.org.id), body.into_bytes())
                .await?
                .expect_status(200, "Get filtered projects list"),
            None => self.request_list().await,
        }
    }

    fn load(&mut self, body: Body) -> Result<&[Project], ApiError> {
        let envelope: ProjectsEnvelope = body.decode()?;
        // The envelope's org is authoritative over the id we asked for.
        if !envelope.org.id.is_empty() {
            self.org.id = envelope.org.id;
        }
        if !envelope.org.name.is_empty() {
            self.org.name = envelope.org.name;
        }
        debug!(org_id = %self.org.id, count = envelope.projects.len(), "fetched projects");
        self.projects = envelope.projects;
        Ok(self.projects.as_slice())
    }

    pub async fn fetch(&mut self) -> Result<&[Project], ApiError> {
        let body = self.request_list().await?;
        self.load(body)
    }

    /// Fetch only the projects matching the attribute and tag predicates.
    pub async fn fetch_filtered(
        &mut self,
        selection: &AttributeSelection,
        tags: &BTreeMap<String, String>,
    ) -> Result<&[Project], ApiError> {
        let body = self.request_filtered(selection, tags).await?;
        self.load(body)
    }

    pub async fn fetch_raw(&self) -> Result<String, ApiError> {
        Ok(self.request_list().await?.into_text())
    }

    pub async fn fetch_filtered_raw(
        &self,
        selection: &AttributeSelection,
        tags: &BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        Ok(self.request_filtered(selection, tags).await?.into_text())
    }

    /// A single project's full JSON document.
    pub async fn get_project_raw(&self, project_id: &str) -> Result<String, ApiError> {
        Ok(self
            .transport
            .get(&project_path(&self.org.id, project_id))
            .await?
            .expect_status(200, "GetProjects")?
            .into_text())
    }

    /// Set project attributes. Values are validated before anything is sent;
    /// an empty selection sends nothing.
    pub async fn add_attributes(
        &self,
        project_id: &str,
        selection: &AttributeSelection,
    ) -> Result<(), ApiError> {
        selection.validate()?;
        let Some(body) = filter::build_attributes_body(selection) else {
            debug!(project_id, "no attributes given, nothing to update");
            return Ok(());
        };
        self.transport
            .post(&attributes_path(&self.org.id, project_id), body.into_bytes())
            .await?
            .expect_status(200, "addAttributes")?;
        Ok(())
    }

    /// Add one `key=value` tag to a project.
    pub async fn add_tag(&self, project_id: &str, raw_tag: &str) -> Result<(), ApiError> {
        let tag = filter::parse_tag(raw_tag)?;
        let body = json!({ "key": tag.key, "value": tag.value }).to_string();
        self.transport
            .post(&tags_path(&self.org.id, project_id), body.into_bytes())
            .await?
            .expect_status(200, "addTag")?;
        Ok(())
    }

    pub async fn delete_project(&mut self, project_id: &str) -> Result<(), ApiError> {
        self.transport
            .delete(&project_path(&self.org.id, project_id))
            .await?
            .expect_status(200, "deleteProject")?;
        info!(org_id = %self.org.id, project_id, "project deleted");
        self.projects.retain(|p| p.id != project_id);
        Ok(())
    }

    /// Delete every loaded project, in order.
    ///
    /// Stops at the first failure. Projects deleted before it stay deleted,
    /// but no progress lines are returned with the error.
    pub async fn delete_all(&mut self) -> Result<String, ApiError> {
        let ids: Vec<String> = self.projects.iter().map(|p| p.id.clone()).collect();
        let mut out = String::new();
        for id in ids {
            self.delete_project(&id).await?;
            out.push_str(&format!("{:<38}DELETED\n", id));
        }
        Ok(out)
    }
}

/// First criticality, environment and lifecycle values plus `[k=v,...]`,
/// comma-joined; absent parts are left out.
pub fn verbose_attributes(project: &Project) -> String {
    let attrs = &project.attributes;
    let mut parts: Vec<String> = [&attrs.criticality, &attrs.environment, &attrs.lifecycle]
        .into_iter()
        .filter_map(|values| values.first().cloned())
        .collect();
    if !project.tags.is_empty() {
        let tags: Vec<String> = project
            .tags
            .iter()
            .map(|t| format!("{}={}", t.key, t.value))
            .collect();
        parts.push(format!("[{}]", tags.join(",")));
    }
    parts.join(",")
}

pub fn render(projects: &[Project], mode: ListMode) -> String {
    let mut out = String::new();
    for project in projects {
        let line = match mode {
            ListMode::Ids => project.id.clone(),
            ListMode::Names => project.name.clone(),
            ListMode::Full => format!("{:<38} {}", project.id, project.name),
            ListMode::Verbose => format!(
                "{:<38} {:<50}{}",
                project.id,
                project.name,
                verbose_attributes(project)
            ),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}
