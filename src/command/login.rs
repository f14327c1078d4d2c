// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::{error, warn};
use tabled::{settings::Style, Table};

use crate::{
    error::{self, Error, Result},
    password::{self, Prompt as _},
};

use super::Context;

const MAX_ATTEMPTS: usize = 3;

/// Log in and remember the session for later commands.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The account identifier, usually an email address.
    #[clap()]
    identifier: String,
}

fn worth_retrying(err: &Error) -> bool {
    matches!(
        err,
        Error::Api(
            error::Api::Unauthorized(_) | error::Api::Failed(_) | error::Api::Rejected { .. }
        ) | Error::Session(error::Session::EmptyCredentials)
    )
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        let mut req = password::RequestBuilder::new(&self.identifier).into_request();

        for attempt in 1..=MAX_ATTEMPTS {
            let secret = ctx
                .prompt
                .prompt(req)
                .await?
                .ok_or(error::Password::NoPrompt)?;

            match ctx.session.login(&self.identifier, &secret).await {
                Ok(user) => {
                    println!("{}", Table::new([user]).with(Style::rounded()));
                    return Ok(());
                }
                Err(Error::Session(error::Session::VerificationRequired)) => {
                    error!("This account needs secondary verification, which this client cannot complete");
                    return Err(Error::Command);
                }
                Err(err) if worth_retrying(&err) && attempt < MAX_ATTEMPTS => {
                    warn!("Login attempt {} failed: {}", attempt, err);
                    req = password::RequestBuilder::new(&self.identifier)
                        .with_error(&err.to_string())
                        .into_request();
                    ctx.session.clear_error();
                }
                Err(err) => return Err(err),
            }
        }

        Err(Error::Command)
    }
}
