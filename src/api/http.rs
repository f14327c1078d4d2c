// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use log::debug;
use secrecy::ExposeSecret as _;
use url::Url;

use crate::{error::Result, metadata};

use super::{Reply, Request, Transport};

/// The real wire, relative to a base API URL.
pub(crate) struct Http {
    client: reqwest::Client,
    base: Url,
}

impl Http {
    pub(crate) fn new(base: Url) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(metadata::USER_AGENT.as_str())
                .build()?,
            base,
        })
    }

    // Url::join would discard any path prefix on the base (e.g. `/api`).
    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))?)
    }
}

#[async_trait]
impl Transport for Http {
    async fn send(&self, req: Request) -> Result<Reply> {
        let mut builder = self
            .client
            .request(req.method, self.endpoint(&req.path)?)
            .query(&req.query);
        if let Some(token) = req.bearer.as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = req.body.as_ref() {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        let body = if bytes.is_empty() {
            None
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| debug!("Discarding non-JSON response body: {}", e))
                .ok()
        };

        Ok(Reply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() -> Result<()> {
        let http = Http::new(Url::parse("http://localhost:8080/api/")?)?;
        assert_eq!(
            http.endpoint("/admin/navigation/3")?.as_str(),
            "http://localhost:8080/api/admin/navigation/3"
        );
        Ok(())
    }
}
