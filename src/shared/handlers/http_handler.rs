//! `TrackerApi` over HTTP against a live tracker server

use crate::admin::types::{CommandLogPage, CommandLogQuery, ManagedUser, ManagedUsersResponse, RoleChange};
use crate::resource::types::{Resource, ResourceId, ResourcePayload, Timestamp};
use crate::shared::error::{Error, Result};
use crate::shared::types::account::MePayload;
use crate::shared::types::app::{ErrorResponse, ResourceLogBody, WriteResponse};
use crate::shared::util::config::ServerConfig;
use crate::shared::util::handler::TrackerApi;
use crate::taxonomy::types::TaxonomyNode;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, ORIGIN};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone)]
pub struct HttpHandler {
    client: Client,
    base_url: String,
    origin: String
}

#[derive(Serialize)]
struct RetireRequest<'a> {
    id: ResourceId,
    server_id: &'a str
}

impl HttpHandler {
    pub fn new(config: &ServerConfig) -> Result<HttpHandler> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| Error::Config(format!("Invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(HttpHandler {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            origin: config.origin().to_string()
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        decode(status, &text)
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<WriteResponse> {
        let response = self.client.post(self.url(path))
            .header(ORIGIN, self.origin.as_str())
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let result: WriteResponse = decode(status, &text)?;
        if !result.success {
            return Err(Error::Rejected(result.error.unwrap_or_else(|| "Unknown error".to_string())));
        }
        Ok(result)
    }
}

/// Maps a response onto the client error kinds
pub fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    if status == StatusCode::FORBIDDEN {
        return Err(Error::AccessDenied);
    }
    if !status.is_success() {
        return match serde_json::from_str::<ErrorResponse>(body) {
            Ok(err) => Err(Error::Rejected(err.error)),
            Err(_) => Err(Error::Network(format!("status {}", status)))
        };
    }
    serde_json::from_str(body).map_err(|e| Error::Network(format!("invalid response: {}", e)))
}

#[async_trait]
impl TrackerApi for HttpHandler {
    async fn fetch_taxonomy(&self) -> Result<Vec<TaxonomyNode>> {
        self.get(self.client.get(self.url("/api/taxonomy"))).await
    }

    async fn fetch_resources(&self, server_id: &str, since: Timestamp) -> Result<Vec<Resource>> {
        let request = self.client.get(self.url("/api/resource_log"))
            .query(&[("server", server_id.to_string()), ("since", since.to_string())]);
        let log: ResourceLogBody = self.get(request).await?;
        Ok(log.into_resources())
    }

    async fn fetch_session(&self) -> Result<MePayload> {
        self.get(self.client.get(self.url("/api/me"))).await
    }

    async fn add_resource(&self, payload: &ResourcePayload) -> Result<WriteResponse> {
        self.post("/api/add-resource", payload).await
    }

    async fn update_resource(&self, payload: &ResourcePayload) -> Result<WriteResponse> {
        self.post("/api/update-resource", payload).await
    }

    async fn retire_resource(&self, server_id: &str, id: ResourceId) -> Result<WriteResponse> {
        self.post("/api/retire-resource", &RetireRequest { id, server_id }).await
    }

    async fn set_role(&self, change: &RoleChange) -> Result<WriteResponse> {
        self.post("/api/set-role", change).await
    }

    async fn fetch_managed_users(&self, server_id: &str) -> Result<Vec<ManagedUser>> {
        let request = self.client.get(self.url("/api/admin/users")).query(&[("server", server_id)]);
        let users: ManagedUsersResponse = self.get(request).await?;
        Ok(users.users)
    }

    async fn fetch_command_log(&self, server_id: &str, query: &CommandLogQuery) -> Result<CommandLogPage> {
        let request = self.client.get(self.url("/api/admin/command-log")).query(&[
            ("server", server_id.to_string()),
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
            ("search", query.search.clone())
        ]);
        self.get(request).await
    }

    async fn reload_cache(&self) -> Result<WriteResponse> {
        self.post("/api/admin/reload-cache", &serde_json::json!({})).await
    }
}
