// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Who is logged in, and the lifecycle of the credentials that prove it.
//!
//! The session store writes the persisted credential entries (see
//! [`storage::Key`]); the only other party that touches them is [`Api`], which
//! clears them when the backend answers 401. The store notices that through
//! [`Api::revocations`] and drops back to the anonymous state the next time it
//! is asked whether it is authenticated.

use std::sync::Arc;

use futures_util::lock::Mutex;
use log::{debug, info, warn};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;
use tokio::sync::watch;

use crate::{
    api::{Api, Call, Transport},
    error::{self, Error, Result},
    storage::{self, Key},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub(crate) struct User {
    #[tabled(rename = "ID")]
    pub(crate) id: i64,
    #[tabled(rename = "Email")]
    pub(crate) email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Name", display_with = "display_opt")]
    pub(crate) display_name: Option<String>,
    #[tabled(rename = "Role")]
    pub(crate) role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Active", display_with = "display_opt")]
    pub(crate) is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tabled(rename = "Last Login", display_with = "display_opt")]
    pub(crate) last_login: Option<String>,
}

pub(crate) fn display_opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct State {
    pub(crate) user: Option<User>,
    pub(crate) is_authenticated: bool,
    pub(crate) is_loading: bool,
    pub(crate) error: Option<String>,
}

impl State {
    fn authenticated(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            error: None,
        }
    }

    fn failed(err: &Error) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::default()
        }
    }
}

/// How [`Session::initialize`] settled.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// No access token was stored.
    Anonymous,
    /// The cached user snapshot was adopted without asking the backend.
    Restored,
    /// The backend confirmed who the stored token belongs to.
    Refreshed,
    /// Recovery failed and the stored session was discarded.
    Recovered(Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    user: Option<User>,
    #[serde(default)]
    requires_two_factor: bool,
}

pub(crate) struct Session<S, T> {
    api: Arc<Api<S, T>>,
    storage: Arc<Mutex<S>>,
    state: watch::Sender<State>,
    revoked: watch::Receiver<u64>,
}

impl<S: storage::Storage, T: Transport> Session<S, T> {
    pub(crate) fn new(api: Arc<Api<S, T>>) -> Self {
        let storage = api.storage();
        let revoked = api.revocations();
        let (state, _) = watch::channel(State::default());
        Self {
            api,
            storage,
            state,
            revoked,
        }
    }

    pub(crate) fn state(&self) -> State {
        self.observe_revocation();
        self.state.borrow().clone()
    }

    #[cfg(test)]
    pub(crate) fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.observe_revocation();
        self.state.borrow().is_authenticated
    }

    /// Credentials rejected since our last operation have already been cleared
    /// from storage; forget the user they belonged to.
    fn observe_revocation(&self) {
        let authenticated = self.state.borrow().is_authenticated;
        if authenticated && self.revoked.has_changed().unwrap_or_default() {
            info!("The backend rejected the stored session");
            self.set_state(State::default());
        }
    }

    /// Starts an operation that decides the session from scratch, so earlier
    /// revocations no longer apply to it.
    fn acknowledge_revocations(&mut self) {
        let _ = self.revoked.borrow_and_update();
    }

    fn set_state(&self, state: State) {
        debug!(
            "Session state: authenticated={}, loading={}, error={:?}",
            state.is_authenticated, state.is_loading, state.error
        );
        self.state.send_modify(|current| *current = state);
    }

    fn start_operation(&mut self) {
        self.acknowledge_revocations();
        self.state.send_modify(|current| {
            current.is_loading = true;
            current.error = None;
        });
    }

    pub(crate) fn clear_error(&self) {
        self.state.send_modify(|current| current.error = None);
    }

    pub(crate) async fn login(&mut self, identifier: &str, secret: &SecretString) -> Result<User> {
        if identifier.trim().is_empty() || secret.expose_secret().is_empty() {
            let err = error::Session::EmptyCredentials.into();
            self.set_state(State::failed(&err));
            return Err(err);
        }

        self.start_operation();
        match self.authenticate(identifier, secret).await {
            Ok(user) => {
                info!("Logged in as {}", user.email);
                self.set_state(State::authenticated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                self.set_state(State::failed(&err));
                Err(err)
            }
        }
    }

    async fn authenticate(&self, identifier: &str, secret: &SecretString) -> Result<User> {
        let data: LoginData = self
            .api
            .fetch(Call::post("/auth/login").with_json(&json!({
                "identifier": identifier,
                "secret": secret.expose_secret(),
            }))?)
            .await?;

        // Nothing consumes the second step yet; the caller decides what to
        // present instead.
        if data.requires_two_factor {
            return Err(error::Session::VerificationRequired.into());
        }

        let (Some(access_token), Some(refresh_token), Some(user)) =
            (data.access_token, data.refresh_token, data.user)
        else {
            return Err(error::Api::MissingPayload.into());
        };

        if let Err(err) = self.persist(&access_token, &refresh_token, &user).await {
            if let Err(wipe_err) = self.wipe().await {
                warn!("Could not roll back a partially stored session: {}", wipe_err);
            }
            return Err(err);
        }
        Ok(user)
    }

    async fn persist(
        &self,
        access_token: &SecretString,
        refresh_token: &SecretString,
        user: &User,
    ) -> Result<()> {
        let snapshot = serde_json::to_string(user)?;
        let mut storage = self.storage.lock().await;
        storage
            .update(Key::AccessToken, access_token.expose_secret())
            .await?;
        storage
            .update(Key::RefreshToken, refresh_token.expose_secret())
            .await?;
        storage.update(Key::User, &snapshot).await
    }

    /// Removes every persisted entry, attempting all of them even if one
    /// fails.
    async fn wipe(&self) -> Result<()> {
        let mut storage = self.storage.lock().await;
        let mut result = Ok(());
        for key in Key::ALL {
            if let Err(err) = storage.clear(key).await {
                warn!("Could not clear stored {}: {}", key, err);
                result = Err(err);
            }
        }
        result
    }

    pub(crate) async fn logout(&mut self) -> Result<()> {
        if let Err(err) = self.api.execute(Call::post("/auth/logout")).await {
            warn!("Server-side logout failed, clearing the local session anyway: {}", err);
        }

        self.acknowledge_revocations();
        let cleared = self.wipe().await;
        self.set_state(State::default());
        info!("Logged out");
        cleared
    }

    /// Recovers a session persisted by an earlier run. Never fails: anything
    /// that goes wrong leaves the store unauthenticated with storage cleared,
    /// and the returned [`Outcome`] says what happened.
    ///
    /// A cached user snapshot is trusted without a round trip. A token revoked
    /// on the server therefore keeps looking authenticated until the next real
    /// request comes back 401.
    pub(crate) async fn initialize(&mut self) -> Outcome {
        self.start_operation();
        match self.recover().await {
            Ok(Some((user, outcome))) => {
                debug!("Recovered session for {} ({:?})", user.email, outcome);
                self.set_state(State::authenticated(user));
                outcome
            }
            Ok(None) => {
                if let Err(err) = self.wipe().await {
                    warn!("Could not clear leftover session entries: {}", err);
                }
                self.set_state(State::default());
                Outcome::Anonymous
            }
            Err(err) => {
                warn!("Could not recover the stored session: {}", err);
                if let Err(err) = self.wipe().await {
                    warn!("Could not clear the stored session: {}", err);
                }
                self.set_state(State::default());
                Outcome::Recovered(err)
            }
        }
    }

    async fn recover(&self) -> Result<Option<(User, Outcome)>> {
        let (token, snapshot) = {
            let mut storage = self.storage.lock().await;
            (
                storage.get(Key::AccessToken).await?,
                storage.get(Key::User).await?,
            )
        };

        if token.is_none() {
            return Ok(None);
        }

        let cached = snapshot.and_then(|json| {
            serde_json::from_str::<User>(&json)
                .map_err(|err| warn!("Ignoring unreadable user snapshot: {}", err))
                .ok()
        });
        if let Some(user) = cached {
            return Ok(Some((user, Outcome::Restored)));
        }

        let user: User = self.api.fetch(Call::get("/auth/me")).await?;
        self.storage
            .lock()
            .await
            .update(Key::User, &serde_json::to_string(&user)?)
            .await?;
        Ok(Some((user, Outcome::Refreshed)))
    }

    /// Adopts a user verified by some other path.
    pub(crate) async fn set_user(&mut self, user: User) -> Result<()> {
        self.acknowledge_revocations();
        let has_token = {
            let mut storage = self.storage.lock().await;
            storage
                .update(Key::User, &serde_json::to_string(&user)?)
                .await?;
            storage.get(Key::AccessToken).await?.is_some()
        };

        self.set_state(State {
            user: Some(user),
            is_authenticated: has_token,
            is_loading: false,
            error: None,
        });
        Ok(())
    }
}
