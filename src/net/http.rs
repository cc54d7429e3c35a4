//! HTTP network backed by ureq
//!
//! ureq is blocking, so each fetch runs on tokio's blocking pool. Non-2xx
//! statuses are returned as responses; only transport failures are errors.

use super::Network;
use crate::error::{SwError, SwResult};
use crate::http::{Headers, Method, Request, Response, ResponseType};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::{Agent, RequestBuilder, ResponseExt};
use url::Url;

/// Network that performs real HTTP requests
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    agent: Agent,
    scope: Url,
    user_agent: String,
}

impl HttpNetwork {
    /// Create a network for a controller scope
    ///
    /// `scope` decides which responses are classified as same-origin.
    pub fn new(scope: Url, timeout: Duration, user_agent: impl Into<String>) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build();

        Self {
            agent: Agent::new_with_config(config),
            scope,
            user_agent: user_agent.into(),
        }
    }

    fn fetch_blocking(
        agent: &Agent,
        scope: &Url,
        user_agent: &str,
        request: &Request,
    ) -> SwResult<Response> {
        let url = request.url.as_str();
        let transport = |e: ureq::Error| SwError::network(url, e.to_string());

        let mut headers = request.headers.clone();
        if headers.get("user-agent").is_none() {
            headers.set("User-Agent", user_agent);
        }

        let result = match request.method {
            Method::Get => with_headers(agent.get(url), &headers).call(),
            Method::Head => with_headers(agent.head(url), &headers).call(),
            Method::Delete => with_headers(agent.delete(url), &headers).call(),
            Method::Options => with_headers(agent.options(url), &headers).call(),
            Method::Post => with_headers(agent.post(url), &headers).send_empty(),
            Method::Put => with_headers(agent.put(url), &headers).send_empty(),
            Method::Patch => with_headers(agent.patch(url), &headers).send_empty(),
        };
        let mut response = result.map_err(transport)?;

        let status = response.status().as_u16();
        let final_url = Url::parse(&response.get_uri().to_string())
            .unwrap_or_else(|_| request.url.clone());
        let response_headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_vec().map_err(transport)?;

        debug!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());

        Ok(Response {
            status,
            headers: response_headers,
            kind: ResponseType::classify(&final_url, scope),
            url: final_url,
            body: body.into(),
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &Headers) -> RequestBuilder<B> {
    for (name, value) in headers.iter() {
        builder = builder.header(name, value);
    }
    builder
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> SwResult<Response> {
        let agent = self.agent.clone();
        let scope = self.scope.clone();
        let user_agent = self.user_agent.clone();
        let request = request.clone();

        tokio::task::spawn_blocking(move || {
            Self::fetch_blocking(&agent, &scope, &user_agent, &request)
        })
        .await
        .map_err(|e| SwError::Internal(format!("Fetch task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
