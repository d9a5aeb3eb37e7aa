//! Transport backed by `reqwest`.
//!
//! # Responsibilities
//! - Map an `HttpCall` onto a reqwest request builder
//! - Keep one client per redirect limit (reqwest sets redirect policy per client)
//! - Read multipart attachments from disk
//! - Turn 4xx/5xx answers into status errors

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::TransportConfig;
use crate::error::ResponseError;
use crate::request::{Attachment, CallBody, HttpCall};
use crate::response::Response;
use crate::transport::Transport;

/// Redirect limits above this share the client built for it, which keeps the
/// client cache at no more than `MAX_REDIRECT_LIMIT + 1` entries.
pub const MAX_REDIRECT_LIMIT: u32 = 20;

/// Production transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    config: TransportConfig,
    /// Client with reqwest's default redirect policy.
    default_client: Client,
    /// Clients keyed by redirect limit, built on first use. Bounded by
    /// [`MAX_REDIRECT_LIMIT`].
    limited: Arc<DashMap<u32, Client>>,
}

impl ReqwestTransport {
    /// Create a transport with the given connection settings.
    pub fn new(config: TransportConfig) -> Result<Self, reqwest::Error> {
        let default_client = client_builder(&config).build()?;
        Ok(Self {
            config,
            default_client,
            limited: Arc::new(DashMap::new()),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn client_for(&self, redirects: Option<u32>) -> Result<Client, reqwest::Error> {
        let Some(requested) = redirects else {
            return Ok(self.default_client.clone());
        };
        let limit = requested.min(MAX_REDIRECT_LIMIT);
        if requested > limit {
            tracing::debug!(requested, limit, "Redirect limit capped");
        }
        if let Some(client) = self.limited.get(&limit) {
            return Ok(client.clone());
        }

        let policy = if limit == 0 {
            Policy::none()
        } else {
            Policy::limited(limit as usize)
        };
        let client = client_builder(&self.config).redirect(policy).build()?;
        tracing::debug!(redirect_limit = limit, "Built HTTP client for redirect limit");
        Ok(self.limited.entry(limit).or_insert(client).clone())
    }

    async fn send(&self, call: HttpCall) -> Result<Response, ResponseError> {
        let client = self.client_for(call.redirects)?;

        tracing::debug!(method = %call.method, url = %call.url, "Sending request");

        let mut request = client.request(call.method.clone(), call.url.clone());
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(content_type) = &call.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(accept) = &call.accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(auth) = &call.auth {
            request = request.basic_auth(&auth.user, Some(&auth.password));
        }
        for (key, value) in &call.headers {
            request = request.header(key, value);
        }
        if call.with_credentials {
            tracing::trace!(url = %call.url, "withCredentials has no effect outside a browser");
        }

        request = match call.body {
            None => request,
            Some(CallBody::Json(value)) => request.json(&value),
            Some(CallBody::Form(pairs)) => request.form(&pairs),
            Some(CallBody::Text(text)) => request.body(text),
            Some(CallBody::Multipart { fields, attachments }) => {
                request.multipart(multipart_form(fields, attachments).await?)
            }
        };

        let res = request.send().await?;
        let status = res.status();
        let headers = res.headers().clone();
        let text = res.text().await?;
        let response = Response::from_parts(status.as_u16(), headers, text);

        if status.is_client_error() || status.is_server_error() {
            return Err(ResponseError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
                response,
            });
        }
        Ok(response)
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, call: HttpCall) -> BoxFuture<'static, Result<Response, ResponseError>> {
        let this = self.clone();
        async move { this.send(call).await }.boxed()
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .field("redirect_clients", &self.limited.len())
            .finish()
    }
}

fn client_builder(config: &TransportConfig) -> reqwest::ClientBuilder {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(config.user_agent.clone());
    if config.request_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
    }
    if config.no_proxy {
        builder = builder.no_proxy();
    }
    builder
}

async fn multipart_form(
    fields: Vec<(String, String)>,
    attachments: Vec<Attachment>,
) -> Result<Form, ResponseError> {
    let mut form = Form::new();
    for (key, value) in fields {
        form = form.text(key, value);
    }
    for attachment in attachments {
        let bytes = tokio::fs::read(&attachment.path)
            .await
            .map_err(|e| ResponseError::Attachment {
                path: attachment.path.clone(),
                reason: e.to_string(),
            })?;
        let filename = attachment.filename.clone().or_else(|| {
            Path::new(&attachment.path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });
        let mut part = Part::bytes(bytes);
        if let Some(filename) = filename {
            part = part.file_name(filename);
        }
        form = form.part(attachment.name, part);
    }
    Ok(form)
}
