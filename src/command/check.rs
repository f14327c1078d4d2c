// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::debug;

use crate::{
    error::Result,
    guard::{Decision, Guard},
};

use super::Context;

/// Report whether a protected admin path would render for the stored session.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The path that was requested, e.g. /admin/navigation.
    #[clap()]
    path: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let mut guard = Guard::new(self.path);
        ctx.settle(&mut guard).await;
        debug!("Guard settled in {:?}", guard.state());
        match guard.decision() {
            Decision::Render => println!("render"),
            Decision::Redirect(to) => println!("redirect {to}"),
            Decision::Loading => println!("loading"),
        }
        Ok(())
    }
}
