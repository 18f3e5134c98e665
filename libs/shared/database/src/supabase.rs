use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.service_role_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_role_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }

        headers
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let headers = self.get_headers();

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Fetch rows from a PostgREST table endpoint. `filters` is the raw query
    /// string after the table name, e.g. `status=in.(scheduled,confirmed)`.
    pub async fn select<T>(&self, table: &str, filters: &str) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = if filters.is_empty() {
            format!("/rest/v1/{}", table)
        } else {
            format!("/rest/v1/{}?{}", table, filters)
        };

        self.request(Method::GET, &path, None).await
    }

    /// Existence probe: asks PostgREST for at most one matching row id and
    /// reports whether anything came back.
    pub async fn exists(&self, table: &str, filters: &str) -> Result<bool> {
        let path = format!("/rest/v1/{}?{}&select=id&limit=1", table, filters);
        let rows: Vec<Value> = self.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    /// Invoke a server-side SQL function through the PostgREST RPC endpoint.
    /// PostgREST executes the whole function in a single database transaction,
    /// which is what the reconciliation write phase relies on.
    pub async fn rpc<T>(&self, function: &str, args: Value) -> Result<T>
    where T: DeserializeOwned {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, Some(args)).await
    }
}
