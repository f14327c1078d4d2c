// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::debug;

use crate::{
    api::Transport,
    metadata,
    session::Session,
    storage,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Checking,
    Authorized,
    Unauthorized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Decision {
    Loading,
    Render,
    Redirect(String),
}

/// Lets whoever owns the guard's view report that it went away.
#[derive(Clone)]
pub(crate) struct Lifeline(Arc<AtomicBool>);

impl Lifeline {
    pub(crate) fn unmount(&self) {
        self.0.store(false, Ordering::Release);
    }

    fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Where to send someone who asked for `from` without being logged in.
pub(crate) fn login_redirect(from: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(from.as_bytes()).collect();
    format!("{}?redirect={}", metadata::LOGIN_PATH, encoded)
}

pub(crate) struct Guard {
    requested: String,
    state: State,
    lifeline: Lifeline,
}

impl Guard {
    pub(crate) fn new(requested: impl Into<String>) -> Self {
        Self {
            requested: requested.into(),
            state: State::Checking,
            lifeline: Lifeline(Arc::new(AtomicBool::new(true))),
        }
    }

    pub(crate) fn lifeline(&self) -> Lifeline {
        self.lifeline.clone()
    }

    pub(crate) const fn state(&self) -> State {
        self.state
    }

    /// Settles the guard once. Later calls return the settled state without
    /// touching the session.
    pub(crate) async fn check<S: storage::Storage, T: Transport>(
        &mut self,
        session: &mut Session<S, T>,
    ) -> State {
        if self.state != State::Checking {
            return self.state;
        }

        if !session.is_authenticated() {
            let outcome = session.initialize().await;
            debug!("Session initialization for {} settled: {:?}", self.requested, outcome);

            if !self.lifeline.is_alive() {
                debug!("Guard for {} went away before the session settled", self.requested);
                return self.state;
            }
        }

        self.state = if session.is_authenticated() {
            State::Authorized
        } else {
            State::Unauthorized
        };
        self.state
    }

    pub(crate) fn decision(&self) -> Decision {
        match self.state {
            State::Checking => Decision::Loading,
            State::Authorized => Decision::Render,
            State::Unauthorized => Decision::Redirect(login_redirect(&self.requested)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use futures_util::lock::Mutex;
    use serde_json::json;

    use super::*;
    use crate::{
        api::{
            mock::{self, Mock},
            Api,
        },
        error::Result,
        storage::{Key, Memory, Storage as _},
    };

    fn user() -> serde_json::Value {
        json!({"id": 9, "email": "editor@x.com", "role": "EDITOR"})
    }

    fn session(mock: &Mock, storage: &Memory) -> Session<Memory, Mock> {
        Session::new(Arc::new(Api::new(
            mock.clone(),
            Arc::new(Mutex::new(storage.clone())),
        )))
    }

    #[tokio::test]
    async fn anonymous_visitors_are_redirected() {
        let mock = Mock::new(|_| mock::offline());
        let mut session = session(&mock, &Memory::new());
        let mut guard = Guard::new("/admin/navigation?type=MAIN");
        assert_eq!(guard.decision(), Decision::Loading);

        assert_eq!(guard.check(&mut session).await, State::Unauthorized);
        assert_eq!(
            guard.decision(),
            Decision::Redirect("/admin/login?redirect=%2Fadmin%2Fnavigation%3Ftype%3DMAIN".to_owned())
        );
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn stored_session_is_authorized_once() -> Result<()> {
        let mock = Mock::new(|_| mock::ok(user()));
        let mut storage = Memory::new();
        storage.update(Key::AccessToken, "access").await?;
        let mut session = session(&mock, &storage);
        let mut guard = Guard::new("/admin");

        assert_eq!(guard.check(&mut session).await, State::Authorized);
        assert_eq!(guard.check(&mut session).await, State::Authorized);
        assert_eq!(guard.decision(), Decision::Render);
        assert_eq!(mock.calls().len(), 1);

        let mut second = Guard::new("/admin/users");
        assert_eq!(second.check(&mut session).await, State::Authorized);
        assert_eq!(mock.calls().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unmounted_guard_ignores_late_result() -> Result<()> {
        let lifeline: Arc<OnceLock<Lifeline>> = Arc::new(OnceLock::new());
        let mock = {
            let lifeline = Arc::clone(&lifeline);
            Mock::new(move |_| {
                if let Some(l) = lifeline.get() {
                    l.unmount();
                }
                mock::ok(user())
            })
        };
        let mut storage = Memory::new();
        storage.update(Key::AccessToken, "access").await?;
        let mut session = session(&mock, &storage);
        let mut guard = Guard::new("/admin");
        let _ = lifeline.set(guard.lifeline());

        assert_eq!(guard.check(&mut session).await, State::Checking);
        assert_eq!(guard.state(), State::Checking);
        assert!(session.is_authenticated());
        Ok(())
    }
}
