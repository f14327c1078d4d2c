// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{error, io, result};

use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("network error: {0}")]
    Network(Box<dyn error::Error + Send + Sync>),
    #[error("API error: {0}")]
    Api(#[from] Api),
    #[error("session error: {0}")]
    Session(#[from] Session),
    #[error("resource error: {0}")]
    Resource(#[from] Resource),
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("command execution failed")]
    Command,
}

impl Error {
    /// Whether the backend rejected our credentials, meaning anything we hold
    /// locally is no longer worth keeping.
    pub(crate) const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(Api::Unauthorized(_)))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Api(Api::MissingPayload)
        } else {
            Self::Network(Box::new(value))
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Api {
    #[error("authentication required{}", .0.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unauthorized(Option<String>),
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server failure ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("request failed: {0}")]
    Failed(String),
    #[error("response did not carry the expected payload")]
    MissingPayload,
}

#[derive(Error, Debug)]
pub(crate) enum Session {
    #[error("secondary verification is required to complete this login")]
    VerificationRequired,
    #[error("an identifier and a secret are both required")]
    EmptyCredentials,
}

#[derive(Error, Debug)]
pub(crate) enum Resource {
    #[error("reordering requires a {0} filter to be selected")]
    ReorderScope(&'static str),
    #[error("reordering requires at least one item")]
    EmptyOrder,
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[cfg_attr(not(feature = "keychain"), allow(dead_code))]
    #[error("could not determine the project data directory")]
    NoProjectDirs,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
}
