// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use tokio::signal;

use crate::{
    api::{Api, Http},
    error::{self, Result},
    guard::{Decision, Guard},
    password,
    session::Session,
    storage,
};

pub(crate) mod check;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod navigation;
pub(crate) mod whoami;

pub(crate) type Storage = Box<dyn storage::Storage>;

pub(crate) struct Context {
    pub(crate) api: Arc<Api<Storage, Http>>,
    pub(crate) session: Session<Storage, Http>,
    pub(crate) prompt: Box<dyn password::Prompt>,
}

impl Context {
    /// Settles `guard` against the session. An interrupt while the session is
    /// still being recovered leaves the guard undecided.
    pub(crate) async fn settle(&mut self, guard: &mut Guard) {
        let lifeline = guard.lifeline();
        let interrupt = tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Interrupted; abandoning the session check");
                lifeline.unmount();
            }
        });
        let _ = guard.check(&mut self.session).await;
        interrupt.abort();
    }

    /// Runs the route guard for `path`, failing unless it would render.
    pub(crate) async fn authorize(&mut self, path: &str) -> Result<()> {
        let mut guard = Guard::new(path);
        self.settle(&mut guard).await;
        match guard.decision() {
            Decision::Render => Ok(()),
            Decision::Redirect(to) => {
                error!("You need to log in first (the site would send you to {})", to);
                Err(error::Error::Command)
            }
            Decision::Loading => Err(error::Error::Command),
        }
    }
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: &mut Context) -> Result<()>;
}
