//! Organization registry.
//!
//! The org list is fetched at most once per registry; name lookups and
//! searches reuse it.

use crate::error::ApiError;
use crate::output::ListMode;
use crate::transport::{Body, Transport};
use crate::types::{Org, OrgsEnvelope};
use serde_json::json;
use tracing::{debug, info};

const ORGS_PATH: &str = "/orgs";
const ORG_PATH: &str = "/org";

fn org_path(org_id: &str) -> String {
    format!("/org/{}", org_id)
}

fn settings_path(org_id: &str) -> String {
    format!("/org/{}/settings", org_id)
}

pub struct OrgRegistry<'a, T: Transport> {
    transport: &'a T,
    orgs: Option<Vec<Org>>,
}

impl<'a, T: Transport> OrgRegistry<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            orgs: None,
        }
    }

    async fn request_list(&self) -> Result<Body, ApiError> {
        self.transport
            .get(ORGS_PATH)
            .await?
            .expect_status(200, "GetOrgs")
    }

    /// All orgs visible to the token, in API order. Cached after the first call.
    pub async fn fetch(&mut self) -> Result<&[Org], ApiError> {
        if self.orgs.is_none() {
            let envelope: OrgsEnvelope = self.request_list().await?.decode()?;
            debug!(count = envelope.orgs.len(), "fetched orgs");
            self.orgs = Some(envelope.orgs);
        }
        Ok(self.orgs.as_deref().unwrap_or_default())
    }

    /// The orgs list body, undecoded.
    pub async fn fetch_raw(&self) -> Result<String, ApiError> {
        Ok(self.request_list().await?.into_text())
    }

    pub async fn resolve_name(&mut self, org_id: &str) -> Result<String, ApiError> {
        self.fetch()
            .await?
            .iter()
            .find(|org| org.id == org_id)
            .map(|org| org.name.clone())
            .ok_or_else(|| ApiError::OrgNotFound(org_id.to_string()))
    }

    /// Orgs whose name contains `term`, ignoring case.
    pub async fn search(&mut self, term: &str) -> Result<Vec<Org>, ApiError> {
        let needle = term.to_lowercase();
        Ok(self
            .fetch()
            .await?
            .iter()
            .filter(|org| org.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    /// Create an org inside `group_id`.
    pub async fn create(&self, name: &str, group_id: &str) -> Result<(), ApiError> {
        let body = json!({ "name": name, "groupId": group_id }).to_string();
        self.transport
            .post(ORG_PATH, body.into_bytes())
            .await?
            .expect_status(201, "addOrg")?;
        info!(name, "org created");
        Ok(())
    }

    pub async fn delete(&self, org_id: &str) -> Result<(), ApiError> {
        self.transport
            .delete(&org_path(org_id))
            .await?
            .expect_status(204, "deleteOrg")?;
        info!(org_id, "org deleted");
        Ok(())
    }

    pub async fn settings_raw(&self, org_id: &str) -> Result<String, ApiError> {
        Ok(self
            .transport
            .get(&settings_path(org_id))
            .await?
            .expect_status(200, "GetOrgSettings")?
            .into_text())
    }
}

/// One line per org in fetch order.
pub fn render(orgs: &[Org], mode: ListMode) -> String {
    let mut out = String::new();
    for org in orgs {
        match mode {
            ListMode::Ids => out.push_str(&org.id),
            ListMode::Names => out.push_str(&org.name),
            ListMode::Full | ListMode::Verbose => {
                out.push_str(&format!("{:<38} {}", org.id, org.name))
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ApiResponse, Method, MockTransport};

    const ORGS: &str = r#"{"orgs":[
        {"id":"o1","name":"Payments Team","slug":"payments"},
        {"id":"o2","name":"Platform"},
        {"id":"o3","name":"Mobile Payments"}
    ]}"#;

    fn mock() -> MockTransport {
        MockTransport::new().on(Method::Get, "/orgs", ApiResponse::ok(ORGS))
    }

    #[tokio::test]
    async fn test_fetch_is_cached() {
        let transport = mock();
        let mut registry = OrgRegistry::new(&transport);

        assert_eq!(registry.fetch().await.unwrap().len(), 3);
        assert_eq!(registry.resolve_name("o2").await.unwrap(), "Platform");
        assert_eq!(transport.paths(Method::Get).len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_name_not_found_is_distinct() {
        let transport = mock();
        let mut registry = OrgRegistry::new(&transport);
        let err = registry.resolve_name("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::OrgNotFound(ref id) if id == "missing"));
        assert_eq!(err.to_string(), "org not found: missing");
    }

    #[tokio::test]
    async fn test_fetch_http_error_carries_status_text() {
        let transport = MockTransport::always(ApiResponse::new(401, "401 Unauthorized", ""));
        let mut registry = OrgRegistry::new(&transport);
        let err = registry.resolve_name("o1").await.unwrap_err();
        assert_eq!(err.to_string(), "GetOrgs failed: 401 Unauthorized");
    }

    #[tokio::test]
    async fn test_fetch_raw_is_verbatim() {
        let transport = mock();
        let registry = OrgRegistry::new(&transport);
        assert_eq!(registry.fetch_raw().await.unwrap(), ORGS);
    }

    #[tokio::test]
    async fn test_search_ignores_case_and_keeps_order() {
        let transport = mock();
        let mut registry = OrgRegistry::new(&transport);
        let found = registry.search("PAYMENTS").await.unwrap();
        let ids: Vec<_> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o1", "o3"]);
    }

    #[tokio::test]
    async fn test_create_expects_created() {
        let transport = MockTransport::new().on(
            Method::Post,
            "/org",
            ApiResponse::new(201, "201 Created", "{}"),
        );
        let registry = OrgRegistry::new(&transport);
        registry.create("New \"Org\"", "grp-1").await.unwrap();

        let body = transport.requests()[0].body.clone().unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "New \"Org\"", "groupId": "grp-1"})
        );

        let transport = MockTransport::always(ApiResponse::ok("{}"));
        let err = OrgRegistry::new(&transport)
            .create("x", "grp-1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "addOrg failed: 200 OK");
    }

    #[tokio::test]
    async fn test_delete_expects_no_content() {
        let transport = MockTransport::new().on(
            Method::Delete,
            "/org/o1",
            ApiResponse::new(204, "204 No Content", ""),
        );
        OrgRegistry::new(&transport).delete("o1").await.unwrap();

        let transport = MockTransport::always(ApiResponse::ok(""));
        let err = OrgRegistry::new(&transport).delete("o1").await.unwrap_err();
        assert_eq!(err.to_string(), "deleteOrg failed: 200 OK");
    }

    #[tokio::test]
    async fn test_settings_raw() {
        let transport = MockTransport::new().on(
            Method::Get,
            "/org/o1/settings",
            ApiResponse::ok(r#"{"requestAccess":{"enabled":true}}"#),
        );
        let settings = OrgRegistry::new(&transport).settings_raw("o1").await.unwrap();
        assert!(settings.contains("requestAccess"));
    }

    #[test]
    fn test_render_modes() {
        let orgs = vec![
            Org {
                id: "o1".to_string(),
                name: "First".to_string(),
            },
            Org {
                id: "o2".to_string(),
                name: "Second".to_string(),
            },
        ];
        assert_eq!(render(&orgs, ListMode::Ids), "o1\no2\n");
        assert_eq!(render(&orgs, ListMode::Names), "First\nSecond\n");
        assert_eq!(
            render(&orgs, ListMode::Full),
            format!("{:<38} First\n{:<38} Second\n", "o1", "o2")
        );
        assert_eq!(render(&[], ListMode::Full), "");
    }
}
