//! Org and group membership.

use crate::error::ApiError;
use crate::orgs::OrgRegistry;
use crate::output::ListMode;
use crate::transport::{Body, Transport};
use crate::types::User;
use serde_json::json;
use tracing::{debug, info};

/// Placeholder for the side of a comparison that lacks a member.
pub const MISSING: &str = "--- MISSING ---";

/// Role given to members copied into another org.
pub const COPY_ROLE: &str = "collaborator";

fn members_path(org_id: &str) -> String {
    format!("/org/{}/members", org_id)
}

fn group_members_path(group_id: &str) -> String {
    format!("/group/{}/members", group_id)
}

fn add_member_path(group_id: &str, org_id: &str) -> String {
    format!("/group/{}/org/{}/members", group_id, org_id)
}

fn member_path(org_id: &str, user_id: &str) -> String {
    format!("/org/{}/members/{}", org_id, user_id)
}

/// Membership operations. `group_id` is the configured group, needed to add members.
pub struct UserRegistry<'a, T: Transport> {
    transport: &'a T,
    group_id: String,
}

impl<'a, T: Transport> UserRegistry<'a, T> {
    pub fn new(transport: &'a T, group_id: &str) -> Self {
        Self {
            transport,
            group_id: group_id.to_string(),
        }
    }

    async fn request(&self, path: &str) -> Result<Body, ApiError> {
        self.transport.get(path).await?.expect_status(200, "GetUsers")
    }

    pub async fn fetch(&self, org_id: &str) -> Result<Vec<User>, ApiError> {
        let users: Vec<User> = self.request(&members_path(org_id)).await?.decode()?;
        debug!(org_id, count = users.len(), "fetched org members");
        Ok(users)
    }

    pub async fn fetch_raw(&self, org_id: &str) -> Result<String, ApiError> {
        Ok(self.request(&members_path(org_id)).await?.into_text())
    }

    pub async fn fetch_group(&self, group_id: &str) -> Result<Vec<User>, ApiError> {
        self.request(&group_members_path(group_id)).await?.decode()
    }

    pub async fn fetch_group_raw(&self, group_id: &str) -> Result<String, ApiError> {
        Ok(self.request(&group_members_path(group_id)).await?.into_text())
    }

    pub async fn add_user(&self, org_id: &str, user_id: &str, role: &str) -> Result<(), ApiError> {
        let body = json!({ "userId": user_id, "role": role }).to_string();
        self.transport
            .post(&add_member_path(&self.group_id, org_id), body.into_bytes())
            .await?
            .expect_status(200, "addUser")?;
        info!(org_id, user_id, role, "user added");
        Ok(())
    }

    pub async fn delete_user(&self, org_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.transport
            .delete(&member_path(org_id, user_id))
            .await?
            .expect_status(200, "deleteUser")?;
        info!(org_id, user_id, "user removed");
        Ok(())
    }

    /// Add every member of `from_org` to `to_org` as a collaborator.
    ///
    /// Stops at the first failure; members already added stay added.
    pub async fn copy_users(&self, from_org: &str, to_org: &str) -> Result<(), ApiError> {
        for user in self.fetch(from_org).await? {
            self.add_user(to_org, &user.id, COPY_ROLE).await?;
        }
        Ok(())
    }

    /// Side-by-side membership of two orgs, headed by their names.
    pub async fn compare_users(&self, org1: &str, org2: &str) -> Result<String, ApiError> {
        let mut orgs = OrgRegistry::new(self.transport);
        let name1 = orgs.resolve_name(org1).await?;
        let users1 = self.fetch(org1).await?;
        let name2 = orgs.resolve_name(org2).await?;
        let users2 = self.fetch(org2).await?;
        Ok(compare(&name1, &name2, &users1, &users2))
    }
}

fn contains(users: &[User], user: &User) -> bool {
    users.iter().any(|u| u.id == user.id)
}

/// `users1` in order, then the members of `users2` that `users1` lacks, by id.
fn merge<'u>(users1: &'u [User], users2: &'u [User]) -> Vec<&'u User> {
    users1
        .iter()
        .chain(users2.iter().filter(|u| !contains(users1, u)))
        .collect()
}

/// Two-column membership diff: a header, an `=` underline, then one row per
/// distinct member with [`MISSING`] on the side that lacks them.
pub fn compare(name1: &str, name2: &str, users1: &[User], users2: &[User]) -> String {
    let mut out = format!("{:<40}{}\n", name1, name2);
    out.push_str(&format!(
        "{:<40}{}\n",
        "=".repeat(name1.len()),
        "=".repeat(name2.len())
    ));

    for user in merge(users1, users2) {
        let (left, right) = match (contains(users1, user), contains(users2, user)) {
            (true, true) => (user.name.as_str(), user.name.as_str()),
            (true, false) => (user.name.as_str(), MISSING),
            _ => (MISSING, user.name.as_str()),
        };
        out.push_str(&format!("{:<40}{}\n", left, right));
    }
    out
}

pub fn render(users: &[User], mode: ListMode) -> String {
    let mut out = String::new();
    for user in users {
        match mode {
            ListMode::Ids => out.push_str(&user.id),
            ListMode::Names => out.push_str(&user.name),
            ListMode::Full | ListMode::Verbose => {
                out.push_str(&format!("{:<38} {:<14}{}", user.id, user.role, user.name))
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

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            role: "admin".to_string(),
            email: format!("{}@example.com", id),
        }
    }

    #[test]
    fn test_compare_union_rows() {
        let a = user("a", "Alice");
        let b = user("b", "Bob");
        let c = user("c", "Carol");

        let out = compare("o1", "o2", &[a.clone(), b], &[a, c]);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], format!("{:<40}{}", "o1", "o2"));
        assert_eq!(lines[1], format!("{:<40}{}", "==", "=="));
        assert_eq!(lines[2], format!("{:<40}{}", "Alice", "Alice"));
        assert_eq!(lines[3], format!("{:<40}{}", "Bob", MISSING));
        assert_eq!(lines[4], format!("{:<40}{}", MISSING, "Carol"));
    }

    #[test]
    fn test_compare_matches_by_id_only() {
        let left = user("u1", "Same Person");
        let mut right = user("u1", "Renamed");
        right.role = "collaborator".to_string();

        let out = compare("left", "right", &[left], &[right]);
        assert_eq!(out.lines().count(), 3);
        assert!(out.ends_with(&format!("{:<40}{}\n", "Same Person", "Same Person")));
    }

    #[test]
    fn test_compare_empty_sides() {
        let out = compare("x", "y", &[], &[user("u", "Una")]);
        assert!(out.ends_with(&format!("{:<40}{}\n", MISSING, "Una")));
        assert_eq!(compare("x", "y", &[], &[]).lines().count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_decodes_bare_array() {
        let transport = MockTransport::new()
            .on(
                Method::Get,
                "/org/o1/members",
                ApiResponse::ok(r#"[{"id":"u1","name":"Una","role":"admin","email":"u@x"}]"#),
            )
            .on(
                Method::Get,
                "/group/g1/members",
                ApiResponse::ok(r#"[{"id":"u2","name":"Dos"}]"#),
            );
        let registry = UserRegistry::new(&transport, "g1");

        let users = registry.fetch("o1").await.unwrap();
        assert_eq!(users[0].role, "admin");
        let group = registry.fetch_group("g1").await.unwrap();
        assert_eq!(group[0].name, "Dos");
        assert_eq!(
            registry.fetch_group_raw("g1").await.unwrap(),
            r#"[{"id":"u2","name":"Dos"}]"#
        );
    }

    #[tokio::test]
    async fn test_add_user_uses_group_path() {
        let transport = MockTransport::always(ApiResponse::ok("{}"));
        let registry = UserRegistry::new(&transport, "g1");
        registry.add_user("o2", "u1", "admin").await.unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.path, "/group/g1/org/o2/members");
        let value: serde_json::Value =
            serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(value, json!({ "userId": "u1", "role": "admin" }));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let transport = MockTransport::new().on(
            Method::Delete,
            "/org/o1/members/u1",
            ApiResponse::ok(""),
        );
        let registry = UserRegistry::new(&transport, "g1");
        registry.delete_user("o1", "u1").await.unwrap();

        let transport = MockTransport::always(ApiResponse::new(204, "204 No Content", ""));
        let err = UserRegistry::new(&transport, "g1")
            .delete_user("o1", "u1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "deleteUser failed: 204 No Content");
    }

    #[tokio::test]
    async fn test_copy_users_stops_at_first_failure() {
        let transport = MockTransport::new()
            .on(
                Method::Get,
                "/org/src/members",
                ApiResponse::ok(r#"[{"id":"u1"},{"id":"u2"},{"id":"u3"}]"#),
            )
            .on(
                Method::Post,
                "/group/g1/org/dst/members",
                ApiResponse::new(409, "409 Conflict", ""),
            );
        let registry = UserRegistry::new(&transport, "g1");

        let err = registry.copy_users("src", "dst").await.unwrap_err();
        assert_eq!(err.to_string(), "addUser failed: 409 Conflict");
        assert_eq!(transport.paths(Method::Post).len(), 1);
    }

    #[tokio::test]
    async fn test_copy_users_as_collaborators() {
        let transport = MockTransport::new()
            .on(
                Method::Get,
                "/org/src/members",
                ApiResponse::ok(r#"[{"id":"u1","role":"admin"},{"id":"u2"}]"#),
            )
            .on(
                Method::Post,
                "/group/g1/org/dst/members",
                ApiResponse::ok("{}"),
            );
        let registry = UserRegistry::new(&transport, "g1");
        registry.copy_users("src", "dst").await.unwrap();

        let bodies: Vec<serde_json::Value> = transport
            .requests()
            .iter()
            .filter_map(|r| r.body.as_deref())
            .map(|b| serde_json::from_str(b).unwrap())
            .collect();
        assert_eq!(
            bodies,
            vec![
                json!({ "userId": "u1", "role": "collaborator" }),
                json!({ "userId": "u2", "role": "collaborator" }),
            ]
        );
    }

    #[tokio::test]
    async fn test_compare_users_resolves_names() {
        let transport = MockTransport::new()
            .on(
                Method::Get,
                "/orgs",
                ApiResponse::ok(r#"{"orgs":[{"id":"o1","name":"One"},{"id":"o2","name":"Two"}]}"#),
            )
            .on(
                Method::Get,
                "/org/o1/members",
                ApiResponse::ok(r#"[{"id":"a","name":"Alice"}]"#),
            )
            .on(Method::Get, "/org/o2/members", ApiResponse::ok("[]"));
        let registry = UserRegistry::new(&transport, "g1");

        let out = registry.compare_users("o1", "o2").await.unwrap();
        assert!(out.starts_with(&format!("{:<40}{}\n", "One", "Two")));
        assert!(out.contains(&format!("{:<40}{}\n", "Alice", MISSING)));
        assert_eq!(transport.paths(Method::Get).iter().filter(|p| *p == "/orgs").count(), 1);
    }

    #[test]
    fn test_render_full_row() {
        let out = render(&[user("u1", "Una")], ListMode::Full);
        assert_eq!(out, format!("{:<38} {:<14}{}\n", "u1", "admin", "Una"));
        assert_eq!(render(&[user("u1", "Una")], ListMode::Ids), "u1\n");
    }
}
