// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::ExposeSecret as _;
use serde_json::{json, Value};

use crate::error::{Error, Result};

use super::{Method, Reply, Request, Transport};

#[derive(Clone, Debug)]
pub(crate) struct Recorded {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(&'static str, String)>,
    pub(crate) bearer: Option<String>,
    pub(crate) body: Option<Value>,
}

impl Recorded {
    pub(crate) fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

type Handler = dyn Fn(&Recorded) -> Result<Reply> + Send + Sync;

/// An in-process backend that answers from a closure and remembers every
/// request it saw.
#[derive(Clone)]
pub(crate) struct Mock {
    handler: Arc<Handler>,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl Mock {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&Recorded) -> Result<Reply> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            calls: Arc::new(Mutex::new(vec![])),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Recorded> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn count(&self, method: &Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == *method && c.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for Mock {
    async fn send(&self, req: Request) -> Result<Reply> {
        let recorded = Recorded {
            method: req.method,
            path: req.path,
            query: req.query,
            bearer: req.bearer.map(|b| b.expose_secret().clone()),
            body: req.body,
        };
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(recorded.clone());
        (self.handler)(&recorded)
    }
}

pub(crate) fn ok(data: Value) -> Result<Reply> {
    Ok(Reply {
        status: 200,
        body: Some(json!({"success": true, "data": data})),
    })
}

pub(crate) fn failure(message: &str) -> Result<Reply> {
    Ok(Reply {
        status: 200,
        body: Some(json!({"success": false, "error": message})),
    })
}

pub(crate) fn status(status: u16, message: &str) -> Result<Reply> {
    Ok(Reply {
        status,
        body: Some(json!({"success": false, "message": message})),
    })
}

pub(crate) fn offline() -> Result<Reply> {
    Err(Error::Network("connection refused".into()))
}
