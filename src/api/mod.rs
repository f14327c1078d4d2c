// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Outbound requests to the PAPSNET backend.
//!
//! Every response comes wrapped in a `{success, data, error|message}`
//! envelope. [`Api`] attaches the stored access token, unwraps the envelope and
//! turns HTTP status codes into [`error::Api`] variants so callers never look
//! at raw statuses.
//!
//! A 401 on any request means the stored credentials are no good. [`Api`]
//! clears them on the spot and bumps its revocation counter, which the session
//! store watches.

mod http;
#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::lock::Mutex;
use log::{debug, info, warn};
use secrecy::SecretString;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    error::{self, Result},
    storage::{self, Key},
};

pub(crate) use http::Http;
pub(crate) use reqwest::Method;

#[derive(Debug)]
pub(crate) struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(&'static str, String)>,
    pub(crate) bearer: Option<SecretString>,
    pub(crate) body: Option<Value>,
}

#[derive(Debug)]
pub(crate) struct Reply {
    pub(crate) status: u16,
    pub(crate) body: Option<Value>,
}

#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn send(&self, req: Request) -> Result<Reply>;
}

/// A request that has not been sent yet.
#[derive(Debug)]
pub(crate) struct Call {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl Call {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: vec![],
            body: None,
        }
    }

    pub(crate) fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub(crate) fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub(crate) fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub(crate) fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub(crate) fn with_query(mut self, name: &'static str, value: impl ToString) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    pub(crate) fn with_query_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_query(name, v),
            None => self,
        }
    }

    pub(crate) fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

#[derive(Deserialize)]
struct Envelope {
    success: bool,
    data: Option<Value>,
    error: Option<String>,
    message: Option<String>,
}

fn message_of(body: Option<&Value>) -> Option<String> {
    let body = body?;
    ["error", "message"]
        .into_iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::to_owned)
}

fn classify(reply: Reply) -> Result<Option<Value>> {
    let Reply { status, body } = reply;
    match status {
        200..=299 => {
            let Some(body) = body else {
                return Ok(None);
            };
            let envelope: Envelope =
                serde_json::from_value(body).map_err(|_| error::Api::MissingPayload)?;
            if envelope.success {
                Ok(envelope.data)
            } else {
                Err(error::Api::Failed(
                    envelope
                        .error
                        .or(envelope.message)
                        .unwrap_or_else(|| "the server did not say why".to_owned()),
                )
                .into())
            }
        }
        401 => Err(error::Api::Unauthorized(message_of(body.as_ref())).into()),
        403 => Err(error::Api::Forbidden(
            message_of(body.as_ref()).unwrap_or_else(|| "insufficient permissions".to_owned()),
        )
        .into()),
        404 => Err(error::Api::NotFound(
            message_of(body.as_ref()).unwrap_or_else(|| "no such resource".to_owned()),
        )
        .into()),
        500..=599 => Err(error::Api::Server {
            status,
            message: message_of(body.as_ref()).unwrap_or_else(|| "internal error".to_owned()),
        }
        .into()),
        _ => Err(error::Api::Rejected {
            status,
            message: message_of(body.as_ref()).unwrap_or_else(|| "bad request".to_owned()),
        }
        .into()),
    }
}

pub(crate) struct Api<S, T> {
    transport: T,
    storage: Arc<Mutex<S>>,
    revoked: watch::Sender<u64>,
}

impl<S: storage::Storage, T: Transport> Api<S, T> {
    pub(crate) fn new(transport: T, storage: Arc<Mutex<S>>) -> Self {
        let (revoked, _) = watch::channel(0);
        Self {
            transport,
            storage,
            revoked,
        }
    }

    pub(crate) fn storage(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.storage)
    }

    /// Ticks every time the backend rejects the stored credentials.
    pub(crate) fn revocations(&self) -> watch::Receiver<u64> {
        self.revoked.subscribe()
    }

    async fn revoke(&self) {
        info!("Stored credentials were rejected; discarding them");
        let mut storage = self.storage.lock().await;
        for key in Key::ALL {
            if let Err(err) = storage.clear(key).await {
                warn!("Could not clear stored {}: {}", key, err);
            }
        }
        self.revoked.send_modify(|count| *count += 1);
    }

    /// Sends a call and returns the envelope's `data`, if it had any.
    pub(crate) async fn execute(&self, call: Call) -> Result<Option<Value>> {
        let bearer = self
            .storage
            .lock()
            .await
            .get(Key::AccessToken)
            .await?
            .map(SecretString::new);

        debug!(
            "{} {} (authenticated: {})",
            call.method,
            call.path,
            bearer.is_some()
        );
        let reply = self
            .transport
            .send(Request {
                method: call.method,
                path: call.path,
                query: call.query,
                bearer,
                body: call.body,
            })
            .await?;
        debug!("Received status {}", reply.status);

        let result = classify(reply);
        if result.as_ref().is_err_and(error::Error::is_unauthorized) {
            self.revoke().await;
        }
        result
    }

    /// Sends a call whose envelope must carry a `data` payload of type `R`.
    pub(crate) async fn fetch<R: DeserializeOwned>(&self, call: Call) -> Result<R> {
        let data = self
            .execute(call)
            .await?
            .filter(|v| !v.is_null())
            .ok_or(error::Api::MissingPayload)?;
        Ok(serde_json::from_value(data)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{mock::Mock, *};
    use crate::{
        error::Error,
        storage::{Memory, Storage as _},
    };

    fn api(mock: &Mock, storage: &Memory) -> Api<Memory, Mock> {
        Api::new(mock.clone(), Arc::new(Mutex::new(storage.clone())))
    }

    #[tokio::test]
    async fn attaches_stored_token() -> Result<()> {
        let mock = Mock::new(|_| mock::ok(json!({"pong": true})));
        let mut storage = Memory::new();
        let api = api(&mock, &storage);

        let _: Value = api.fetch(Call::get("/ping")).await?;
        storage.update(Key::AccessToken, "abc").await?;
        let _: Value = api.fetch(Call::get("/ping").with_query("page", 2)).await?;

        let calls = mock.calls();
        assert_eq!(calls[0].bearer, None);
        assert_eq!(calls[1].bearer.as_deref(), Some("abc"));
        assert_eq!(calls[1].query, vec![("page", "2".to_owned())]);
        Ok(())
    }

    #[tokio::test]
    async fn classifies_statuses() {
        let mock = Mock::new(|req| match req.path.as_str() {
            "/401" => mock::status(401, "expired"),
            "/403" => mock::status(403, "admins only"),
            "/404" => mock::status(404, "gone"),
            "/503" => mock::status(503, "maintenance"),
            "/422" => mock::status(422, "bad href"),
            "/refused" => mock::failure("sorry"),
            "/bare" => Ok(Reply {
                status: 200,
                body: Some(json!([1, 2, 3])),
            }),
            _ => mock::offline(),
        });
        let api = api(&mock, &Memory::new());

        let outcome = |path: &'static str| api.execute(Call::get(path));
        assert!(matches!(
            outcome("/401").await,
            Err(Error::Api(error::Api::Unauthorized(Some(ref m)))) if m == "expired"
        ));
        assert!(outcome("/401").await.err().is_some_and(|e| e.is_unauthorized()));
        assert!(matches!(
            outcome("/403").await,
            Err(Error::Api(error::Api::Forbidden(_)))
        ));
        assert!(matches!(
            outcome("/404").await,
            Err(Error::Api(error::Api::NotFound(_)))
        ));
        assert!(matches!(
            outcome("/503").await,
            Err(Error::Api(error::Api::Server { status: 503, .. }))
        ));
        assert!(matches!(
            outcome("/422").await,
            Err(Error::Api(error::Api::Rejected { status: 422, .. }))
        ));
        assert!(matches!(
            outcome("/refused").await,
            Err(Error::Api(error::Api::Failed(ref m))) if m == "sorry"
        ));
        assert!(matches!(
            outcome("/bare").await,
            Err(Error::Api(error::Api::MissingPayload))
        ));
        assert!(matches!(outcome("/down").await, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn unauthorized_reply_clears_credentials() -> Result<()> {
        let mock = Mock::new(|req| match req.path.as_str() {
            "/auth/me" => mock::status(401, "token revoked"),
            _ => mock::status(403, "admins only"),
        });
        let mut storage = Memory::new();
        for key in Key::ALL {
            storage.update(key, "stored").await?;
        }
        let api = api(&mock, &storage);
        let revocations = api.revocations();

        assert!(api.execute(Call::get("/admin/users")).await.is_err());
        assert_eq!(storage.get(Key::AccessToken).await?.as_deref(), Some("stored"));
        assert!(!revocations.has_changed().unwrap_or_default());

        assert!(api.execute(Call::get("/auth/me")).await.is_err());
        for key in Key::ALL {
            assert_eq!(storage.get(key).await?, None, "{key}");
        }
        assert_eq!(*revocations.borrow(), 1);

        // The token is gone, so the next request goes out anonymously.
        assert!(api.execute(Call::get("/admin/users")).await.is_err());
        assert_eq!(mock.calls()[2].bearer, None);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_requires_payload() {
        let mock = Mock::new(|_| mock::ok(Value::Null));
        let api = api(&mock, &Memory::new());

        let result: Result<Value> = api.fetch(Call::post("/auth/me")).await;
        assert!(matches!(
            result,
            Err(Error::Api(error::Api::MissingPayload))
        ));
    }
}
