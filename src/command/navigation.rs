// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use log::{debug, error};
use tabled::{settings::Style, Table};

use crate::{
    api::Http,
    error::{self, Result},
    resource::{
        navigation::{self, Navigation, NavigationFilters, NavigationPayload, NavigationType},
        Resource as _, ResourceStore,
    },
};

use super::{Context, Storage};

type Store = ResourceStore<Navigation, Storage, Http>;

#[derive(Debug, Args)]
struct FilterArgs {
    /// Only show entries of this menu.
    #[arg(long = "type", short, value_enum)]
    type_: Option<NavigationType>,

    /// Only show entries for this locale, e.g. ko or en.
    #[arg(long, short)]
    lang: Option<String>,

    /// Only show published (or, with false, unpublished) entries.
    #[arg(long)]
    published: Option<bool>,
}

impl From<FilterArgs> for NavigationFilters {
    fn from(value: FilterArgs) -> Self {
        Self {
            navigation_type: value.type_,
            language_code: value.lang,
            is_published: value.published,
        }
    }
}

#[derive(Debug, Args)]
struct PayloadArgs {
    /// The label shown in the menu.
    #[arg(long)]
    text: String,

    /// Where the entry links to.
    #[arg(long)]
    href: String,

    /// The menu the entry belongs to.
    #[arg(long = "type", short, value_enum)]
    type_: NavigationType,

    /// The locale of the entry.
    #[arg(long, short)]
    lang: String,

    /// Position within the menu. Left to the server when omitted.
    #[arg(long)]
    order: Option<i32>,

    /// Publish the entry right away.
    #[arg(long)]
    published: bool,

    #[arg(long)]
    description: Option<String>,

    /// Short badge text such as NEW.
    #[arg(long)]
    badge: Option<String>,

    #[arg(long)]
    icon: Option<String>,
}

impl From<PayloadArgs> for NavigationPayload {
    fn from(value: PayloadArgs) -> Self {
        Self {
            text: value.text,
            href: value.href,
            navigation_type: value.type_,
            language_code: value.lang,
            display_order: value.order,
            is_published: value.published,
            description: value.description,
            badge_text: value.badge,
            icon_class: value.icon,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Action {
    /// List entries.
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Zero-based page to show.
        #[arg(long, default_value_t = 0)]
        page: u32,

        #[arg(long)]
        size: Option<u32>,
    },
    /// Create an entry.
    Create {
        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Replace an entry.
    Update {
        id: i64,

        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Delete an entry.
    Delete { id: i64 },
    /// Flip whether an entry is published.
    TogglePublish { id: i64 },
    /// Set the order of every entry in one menu.
    Reorder {
        #[command(flatten)]
        filters: FilterArgs,

        /// Entry IDs, first to last.
        ids: Vec<i64>,
    },
    /// Show what the public site renders for one menu.
    Public {
        #[arg(long = "type", short, value_enum)]
        type_: NavigationType,

        #[arg(long, short, default_value = "ko")]
        lang: String,
    },
}

/// Manage navigation menu entries.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    #[command(subcommand)]
    action: Action,
}

fn print(store: &Store) {
    let pagination = store.pagination();
    debug!("Showing entries matching {:?}", store.filters());
    println!("{}", Table::new(store.items()).with(Style::rounded()));
    println!(
        "Page {} of {} ({} entries)",
        pagination.page + 1,
        pagination.total_pages.max(1),
        pagination.total_elements
    );
}

/// The list is reloaded after every write; a failed reload is worth a
/// mention but does not undo the write.
fn report(store: &mut Store) {
    if let Some(err) = store.error() {
        error!("Could not reload entries: {}", err);
        store.clear_error();
    }
    print(store);
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &mut Context) -> Result<()> {
        if let Action::Public { type_, lang } = &self.action {
            let items = navigation::published(ctx.api.as_ref(), *type_, lang).await?;
            println!("{}", Table::new(items).with(Style::rounded()));
            return Ok(());
        }

        ctx.authorize(Navigation::PATH).await?;
        let api = Arc::clone(&ctx.api);

        match self.action {
            Action::List {
                filters,
                page,
                size,
            } => {
                let mut store = Store::new(api, NavigationFilters::default());
                store.set_filters(|f| *f = filters.into()).await;
                if let Some(size) = size {
                    store.set_page_size(size).await;
                }
                if page != 0 {
                    store.set_page(page).await;
                }
                if let Some(err) = store.error() {
                    error!("Could not load entries: {}", err);
                    return Err(error::Error::Command);
                }
                print(&store);
            }
            Action::Create { payload } => {
                let mut store = Store::new(api, NavigationFilters::default());
                store.create_item(&payload.into()).await?;
                report(&mut store);
            }
            Action::Update { id, payload } => {
                let mut store = Store::new(api, NavigationFilters::default());
                store.update_item(&id, &payload.into()).await?;
                report(&mut store);
            }
            Action::Delete { id } => {
                let mut store = Store::new(api, NavigationFilters::default());
                store.delete_item(&id).await?;
                report(&mut store);
            }
            Action::TogglePublish { id } => {
                let mut store = Store::new(api, NavigationFilters::default());
                store.toggle_publish(&id).await?;
                report(&mut store);
            }
            Action::Reorder { filters, ids } => {
                let mut store = Store::new(api, filters.into());
                store.reorder(&ids).await?;
                report(&mut store);
            }
            Action::Public { .. } => {}
        }
        Ok(())
    }
}
