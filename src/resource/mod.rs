// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! Admin-managed list resources.
//!
//! A [`ResourceStore`] never patches its items in place. Every successful
//! mutation is followed by a full reload, so `items` is always the result of
//! the last successful load for the current filters and page.

pub(crate) mod navigation;

use std::{fmt, sync::Arc};

use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    api::{Api, Call, Transport},
    error::{self, Result},
    storage,
};

pub(crate) const DEFAULT_PAGE_SIZE: u32 = 20;

pub(crate) trait Resource {
    type Id: fmt::Display + Serialize + Send + Sync;
    type Item: DeserializeOwned + Send;
    type Payload: Serialize + Send + Sync;
    type Filters: Clone + fmt::Debug + Default + Send + Sync;

    /// Collection path on the admin API.
    const PATH: &'static str;
    /// The filter (and reorder body field) that scopes a reorder.
    const REORDER_SCOPE: &'static str;

    fn apply_filters(filters: &Self::Filters, call: Call) -> Call;

    /// The scope a reorder applies to, if the filters select one.
    fn reorder_scope(filters: &Self::Filters) -> Option<String>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Pagination {
    pub(crate) page: u32,
    pub(crate) size: u32,
    pub(crate) total_elements: u64,
    pub(crate) total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            total_elements: 0,
            total_pages: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    content: Vec<T>,
    number: u32,
    size: u32,
    total_elements: u64,
    total_pages: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Paged(Page<T>),
}

pub(crate) struct ResourceStore<R: Resource, S, T> {
    api: Arc<Api<S, T>>,
    items: Vec<R::Item>,
    filters: R::Filters,
    pagination: Pagination,
    error: Option<String>,
}

impl<R: Resource, S: storage::Storage, T: Transport> ResourceStore<R, S, T> {
    pub(crate) fn new(api: Arc<Api<S, T>>, filters: R::Filters) -> Self {
        Self {
            api,
            items: vec![],
            filters,
            pagination: Pagination::default(),
            error: None,
        }
    }

    pub(crate) fn items(&self) -> &[R::Item] {
        &self.items
    }

    pub(crate) const fn filters(&self) -> &R::Filters {
        &self.filters
    }

    pub(crate) const fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub(crate) fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    fn item_path(id: &R::Id) -> String {
        format!("{}/{}", R::PATH, id)
    }

    /// Loads the current page. Failures are recorded in [`Self::error`] and
    /// leave the previous items in place.
    pub(crate) async fn load_list(&mut self) {
        self.error = None;
        let call = R::apply_filters(&self.filters, Call::get(R::PATH))
            .with_query("page", self.pagination.page)
            .with_query("size", self.pagination.size);

        match self.api.fetch::<Listing<R::Item>>(call).await {
            Ok(Listing::Bare(items)) => {
                self.pagination = Pagination {
                    page: 0,
                    size: self.pagination.size,
                    total_elements: items.len() as u64,
                    total_pages: u32::from(!items.is_empty()),
                };
                self.items = items;
            }
            Ok(Listing::Paged(page)) => {
                self.pagination = Pagination {
                    page: page.number,
                    size: page.size,
                    total_elements: page.total_elements,
                    total_pages: page.total_pages,
                };
                self.items = page.content;
            }
            Err(err) => {
                warn!("Could not load {}: {}", R::PATH, err);
                self.error = Some(err.to_string());
                return;
            }
        }
        debug!(
            "Loaded {} item(s) from {} ({:?})",
            self.items.len(),
            R::PATH,
            self.pagination
        );
    }

    async fn mutate(&mut self, call: Result<Call>) -> Result<()> {
        self.error = None;
        let result = match call {
            Ok(call) => self.api.execute(call).await.map(drop),
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.load_list().await;
        Ok(())
    }

    fn reject(&mut self, err: error::Error) -> Result<()> {
        self.error = Some(err.to_string());
        Err(err)
    }

    pub(crate) async fn create_item(&mut self, payload: &R::Payload) -> Result<()> {
        self.mutate(Call::post(R::PATH).with_json(payload)).await
    }

    pub(crate) async fn update_item(&mut self, id: &R::Id, payload: &R::Payload) -> Result<()> {
        self.mutate(Call::put(Self::item_path(id)).with_json(payload))
            .await
    }

    pub(crate) async fn delete_item(&mut self, id: &R::Id) -> Result<()> {
        self.mutate(Ok(Call::delete(Self::item_path(id)))).await
    }

    pub(crate) async fn toggle_publish(&mut self, id: &R::Id) -> Result<()> {
        self.mutate(Ok(Call::post(format!(
            "{}/publish-toggle",
            Self::item_path(id)
        ))))
        .await
    }

    /// Replaces the order of everything in the current scope with
    /// `ordered_ids`.
    pub(crate) async fn reorder(&mut self, ordered_ids: &[R::Id]) -> Result<()> {
        let Some(scope) = R::reorder_scope(&self.filters) else {
            return self.reject(error::Resource::ReorderScope(R::REORDER_SCOPE).into());
        };
        if ordered_ids.is_empty() {
            return self.reject(error::Resource::EmptyOrder.into());
        }

        let body = serde_json::to_value(ordered_ids).map(|ids| {
            Map::from_iter([
                (R::REORDER_SCOPE.to_owned(), Value::String(scope)),
                ("orderedIds".to_owned(), ids),
            ])
        });
        let call = match body {
            Ok(body) => Call::post(format!("{}/reorder", R::PATH)).with_json(&body),
            Err(err) => Err(err.into()),
        };
        self.mutate(call).await
    }

    pub(crate) async fn set_filters<F: FnOnce(&mut R::Filters)>(&mut self, update: F) {
        update(&mut self.filters);
        self.pagination.page = 0;
        self.load_list().await;
    }

    pub(crate) async fn set_page(&mut self, page: u32) {
        self.pagination.page = page;
        self.load_list().await;
    }

    pub(crate) async fn set_page_size(&mut self, size: u32) {
        self.pagination.size = size.max(1);
        self.pagination.page = 0;
        self.load_list().await;
    }
}
