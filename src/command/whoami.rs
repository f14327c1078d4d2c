// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::info;
use tabled::{settings::Style, Table};

use crate::{
    api::Call,
    error::{Error, Result},
    session::{Outcome, User},
};

use super::Context;

/// Show the user the stored session belongs to.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Ask the backend instead of trusting the cached profile.
    #[arg(long)]
    refresh: bool,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        match ctx.session.initialize().await {
            Outcome::Restored => info!("Using the cached profile; it may be out of date"),
            Outcome::Recovered(err) => info!("The stored session was discarded: {}", err),
            Outcome::Anonymous | Outcome::Refreshed => {}
        }

        if self.refresh && ctx.session.is_authenticated() {
            let user: User = ctx.api.fetch(Call::get("/auth/me")).await?;
            ctx.session.set_user(user).await?;
        }

        match ctx.session.state().user {
            Some(user) if ctx.session.is_authenticated() => {
                println!("{}", Table::new([user]).with(Style::rounded()));
                Ok(())
            }
            Some(_) | None => {
                eprintln!("Not logged in");
                Err(Error::Command)
            }
        }
    }
}
