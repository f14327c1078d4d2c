// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod command;
mod error;
mod guard;
mod metadata;
mod password;
mod resource;
mod session;
mod storage;

use std::{process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use futures_util::lock::Mutex;
use log::{error, info, warn};
use secrecy::SecretString;
use url::Url;

use crate::storage::IsPersistent as _;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Logout(command::logout::Command),
    Whoami(command::whoami::Command),
    Check(command::check::Command),
    Nav(command::navigation::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: &mut command::Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Whoami(cmd) => cmd.execute(ctx).await,
            Self::Check(cmd) => cmd.execute(ctx).await,
            Self::Nav(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the PAPSNET backend API.
    #[arg(long, env = "PAPSNET_API_URL", default_value = metadata::DEFAULT_API_URL, value_parser = Url::parse)]
    api_url: Url,

    /// Keep the session in memory only, so it ends with this process.
    #[arg(long)]
    no_persist_session: bool,

    /// The password to log in with. Prompted for when absent or rejected.
    #[arg(long, env = "PAPSNET_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> command::Storage {
    if !args.no_persist_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.api_url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.api_url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        if let Some(file_storage) = storage::File::new("session") {
            return Box::new(file_storage);
        }

        warn!("No data directory is available; the session will not outlive this process");
    }

    Box::new(storage::Memory::new())
}

async fn run(args: Args) -> Result<()> {
    let session_storage = get_session_storage(&args).await;
    if !session_storage.is_persistent() {
        info!("Session storage is not persistent");
    }

    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(password::PresetPrompt::new(
            args.password.map(SecretString::new),
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let api = Arc::new(api::Api::new(
        api::Http::new(args.api_url)?,
        Arc::new(Mutex::new(session_storage)),
    ));
    let mut ctx = command::Context {
        session: session::Session::new(Arc::clone(&api)),
        api,
        prompt: Box::new(prompt),
    };

    command::Command::execute(args.command, &mut ctx).await
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("PAPSNET_LOG", "warn")
        .write_style("PAPSNET_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
