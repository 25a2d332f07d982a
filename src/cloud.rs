//! Best-effort cloud sync against a PostgREST-style backend.
//!
//! Local state is the source of truth; this client is an advisory cache.
//! Every call degrades silently — network errors, HTTP errors and missing
//! backend tables all come back as empty results or no-ops, logged at debug
//! level only. A client with no base URL configured is disabled entirely.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use zeroize::Zeroize;

use crate::config::CloudConfig;
use crate::migrate;
use crate::types::{Message, Post, User};

const DEFAULT_POST_LIMIT: usize = 50;

pub struct CloudSyncClient {
    client: Client,
    base_url: String,
    api_key: String,
    enabled: bool,
}

impl Drop for CloudSyncClient {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

/// "Table not found" is an expected setup state (fresh backend, schema not
/// created yet), not a bug. Keep the log to one quiet line.
fn is_missing_schema(status: u16, body: &str) -> bool {
    status == 404 || body.contains("PGRST205") || body.contains("Could not find the table")
}

impl CloudSyncClient {
    pub fn new(config: &CloudConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            enabled: config.enabled(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// POST one row, upserting on conflict. Fire-and-forget.
    async fn upsert(&self, table: &str, row: Value) {
        if !self.enabled {
            return;
        }
        let result = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                if is_missing_schema(status, &body) {
                    debug!(table, "Cloud table missing; staying local-only");
                } else {
                    debug!(table, status, "Cloud upsert failed; staying local-only");
                }
            }
            Err(e) => debug!(table, error = %e, "Cloud unreachable; staying local-only"),
        }
    }

    /// GET rows from a table; empty on any failure.
    async fn fetch(&self, table: &str, query: &[(&str, String)]) -> Vec<Value> {
        if !self.enabled {
            return Vec::new();
        }
        let result = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(query)
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<Vec<Value>>().await.unwrap_or_default()
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                if is_missing_schema(status, &body) {
                    debug!(table, "Cloud table missing; staying local-only");
                } else {
                    debug!(table, status, "Cloud fetch failed; staying local-only");
                }
                Vec::new()
            }
            Err(e) => {
                debug!(table, error = %e, "Cloud unreachable; staying local-only");
                Vec::new()
            }
        }
    }

    pub async fn upsert_profile(&self, user: &User) {
        if let Ok(row) = serde_json::to_value(user) {
            self.upsert("profiles", row).await;
        }
    }

    /// All known profiles, normalized through the schema migrator (cloud
    /// rows may predate the current shape just like local ones).
    pub async fn fetch_all_profiles(&self) -> Vec<User> {
        let now = chrono::Utc::now();
        self.fetch("profiles", &[("select", "*".to_string())])
            .await
            .iter()
            .map(|v| migrate::normalize(v, now))
            .collect()
    }

    pub async fn fetch_global_posts(&self, limit: Option<usize>) -> Vec<Post> {
        let limit = limit.unwrap_or(DEFAULT_POST_LIMIT);
        self.fetch(
            "posts",
            &[
                ("select", "*".to_string()),
                ("visibility", "eq.global".to_string()),
                ("order", "timestamp.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
    }

    pub async fn insert_post(&self, post: &Post) {
        if let Ok(row) = serde_json::to_value(post) {
            self.upsert("posts", row).await;
        }
    }

    pub async fn insert_message(&self, message: &Message) {
        if let Ok(row) = serde_json::to_value(message) {
            self.upsert("messages", row).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn disabled_client() -> CloudSyncClient {
        CloudSyncClient::new(&CloudConfig::default())
    }

    #[test]
    fn missing_schema_is_detected_from_status_and_body() {
        assert!(is_missing_schema(404, ""));
        assert!(is_missing_schema(400, r#"{"code":"PGRST205"}"#));
        assert!(is_missing_schema(400, "Could not find the table 'public.profiles'"));
        assert!(!is_missing_schema(500, "internal error"));
    }

    #[tokio::test]
    async fn disabled_client_noops_everything() {
        let client = disabled_client();
        assert!(!client.enabled());

        let now: DateTime<Utc> = "2026-08-01T12:00:00Z".parse().unwrap();
        let user = User::new("ana", "Ana", "ana@example.com", now);
        client.upsert_profile(&user).await;
        assert!(client.fetch_all_profiles().await.is_empty());
        assert!(client.fetch_global_posts(None).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_empty() {
        // Port 1 on loopback: refused immediately, no real service.
        let client = CloudSyncClient::new(&CloudConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "k".to_string(),
        });
        assert!(client.fetch_global_posts(Some(5)).await.is_empty());
    }
}
