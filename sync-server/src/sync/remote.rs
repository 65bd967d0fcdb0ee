//! Storefront admin API client
//!
//! One client per tenant, credentialed with the tenant's access token. A
//! missing optional resource (template, asset, menu) is `Ok(None)`; network
//! and non-404 status failures surface as `RemoteFetch` so the orchestrator
//! can abort without touching the persisted theme.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use crate::core::{AppError, AppResult};
use crate::db::models::Tenant;

const ACCESS_TOKEN_HEADER: &str = "X-Storefront-Access-Token";

#[derive(Debug, Clone)]
pub struct StorefrontClient {
    client: Client,
    base_url: String,
    access_token: String,
    fetch_timeout: Duration,
}

impl StorefrontClient {
    pub fn new(client: Client, tenant: &Tenant, fetch_timeout: Duration) -> Self {
        // A registered domain may carry an explicit scheme (local and
        // staging storefronts); bare domains default to https
        let base_url = if tenant.source_domain.starts_with("http://")
            || tenant.source_domain.starts_with("https://")
        {
            tenant.source_domain.clone()
        } else {
            format!("https://{}", tenant.source_domain)
        };
        Self {
            client,
            base_url,
            access_token: tenant.access_token.clone(),
            fetch_timeout,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<Option<T>> {
        let url = format!("{}/admin/api/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .timeout(self.fetch_timeout)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .send()
            .await
            .map_err(|e| AppError::remote_fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::remote_fetch(format!("{url}: status {status}")));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| AppError::remote_fetch(format!("{url}: {e}")))
    }

    async fn get_required<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.get(path)
            .await?
            .ok_or_else(|| AppError::remote_fetch(format!("{path}: not found")))
    }

    // ========== Theme ==========

    /// Currently published theme: `{ "id": ..., "name": ... }`
    pub async fn active_theme(&self) -> AppResult<Value> {
        self.get_required("themes/active").await
    }

    /// Theme metadata by id (explicitly triggered syncs name their theme)
    pub async fn theme(&self, theme_id: &str) -> AppResult<Value> {
        self.get_required(&format!("themes/{theme_id}")).await
    }

    /// Global settings document for a theme
    pub async fn settings(&self, theme_id: &str) -> AppResult<Value> {
        self.get_required(&format!("themes/{theme_id}/settings")).await
    }

    /// Page template section document; absent templates are `None`
    pub async fn template(&self, theme_id: &str, name: &str) -> AppResult<Option<Value>> {
        self.get(&format!("themes/{theme_id}/templates/{name}")).await
    }

    /// Arbitrary theme asset by key (e.g. `sections/header-group.json`)
    pub async fn asset(&self, theme_id: &str, key: &str) -> AppResult<Option<Value>> {
        self.get(&format!("themes/{theme_id}/assets?key={key}")).await
    }

    // ========== Navigation ==========

    pub async fn menu(&self, handle: &str) -> AppResult<Option<Value>> {
        self.get(&format!("menus/{handle}")).await
    }

    // ========== Catalog and content ==========

    pub async fn products(&self) -> AppResult<Vec<Value>> {
        self.list("products").await
    }

    pub async fn collections(&self) -> AppResult<Vec<Value>> {
        self.list("collections").await
    }

    pub async fn blog_posts(&self) -> AppResult<Vec<Value>> {
        self.list("blog_posts").await
    }

    pub async fn pages(&self) -> AppResult<Vec<Value>> {
        self.list("pages").await
    }

    /// List endpoints wrap their items as `{ "<resource>": [...] }` or a
    /// bare array; accept both
    async fn list(&self, resource: &str) -> AppResult<Vec<Value>> {
        let body: Value = self.get_required(resource).await?;
        match body {
            Value::Array(items) => Ok(items),
            Value::Object(mut map) => match map.remove(resource) {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(AppError::remote_fetch(format!(
                    "{resource}: unexpected list shape"
                ))),
            },
            _ => Err(AppError::remote_fetch(format!(
                "{resource}: unexpected list shape"
            ))),
        }
    }
}
