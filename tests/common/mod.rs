//! Shared fixtures for the connector integration tests.
//!
//! The user fixture mirrors a small directory: 22 users with ids `user-01` to
//! `user-22`, a custom `number` attribute equal to their position, the first 12
//! active, and the first 5 last modified a month before the rest.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use scim_connector::{ConnectorConfig, InMemoryStore, ScimEndpoints, ScimGroup, ScimUser};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const USER_COUNT: usize = 22;

pub type UserStore = InMemoryStore<ScimUser>;
pub type GroupStore = InMemoryStore<ScimGroup>;
pub type Endpoints = ScimEndpoints<UserStore, GroupStore>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn modified(month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, month, 1, 12, 0, 0).unwrap()
}

pub fn fixture_user(n: usize) -> ScimUser {
    let month = if n <= 5 { 5 } else { 6 };
    ScimUser::new(format!("user{n:02}@example.com"))
        .with_id(format!("user-{n:02}"))
        .with_name(format!("Given{n}"), format!("Family{n}"))
        .with_email(format!("user{n:02}@example.com"))
        .with_active(n <= 12)
        .with_last_modified(modified(month))
        .with_custom_attribute("number", json!(n))
}

pub fn fixture_users() -> Vec<ScimUser> {
    (1..=USER_COUNT).map(fixture_user).collect()
}

pub fn fixture_groups() -> Vec<ScimGroup> {
    vec![
        ScimGroup::new("Engineering")
            .with_id("group-01")
            .with_member("user-01")
            .with_member("user-02"),
        ScimGroup::new("Sales").with_id("group-02").with_member("user-13"),
        ScimGroup::new("Everyone").with_id("group-03"),
    ]
}

/// Connector over the fixture stores, caching under a fresh temporary directory.
pub struct TestConnector {
    pub endpoints: Arc<Endpoints>,
    pub users: UserStore,
    pub groups: GroupStore,
    pub dir: TempDir,
}

impl TestConnector {
    pub async fn new() -> Self {
        Self::with_config(ConnectorConfig::default()).await
    }

    pub async fn with_config(config: ConnectorConfig) -> Self {
        init_logging();
        let dir = TempDir::new().unwrap();
        let config = config.with_cache_dir(dir.path()).with_production(true);
        let users = InMemoryStore::from_records(fixture_users());
        let groups = InMemoryStore::from_records(fixture_groups());

        let endpoints = ScimEndpoints::open(
            Arc::new(config),
            Arc::new(users.clone()),
            Arc::new(groups.clone()),
        )
        .await
        .unwrap();

        Self {
            endpoints: Arc::new(endpoints),
            users,
            groups,
            dir,
        }
    }

    pub fn cache_path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    pub fn lock_path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(format!("{name}.lock"))
    }

    pub fn cache_files(&self) -> Vec<String> {
        list_files(self.dir.path())
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Ids of the resources in a ListResponse body.
pub fn resource_ids(body: &serde_json::Value) -> Vec<String> {
    body["Resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}
