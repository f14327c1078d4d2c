// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretVec};

use crate::{
    error::{self, Result},
    metadata,
};

use super::{IsPersistent, Key, Storage};

pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    url: String,
}

impl SecretService {
    fn attributes(&self, key: Key) -> HashMap<&str, &str> {
        HashMap::from([
            ("papsnet.kind", "session"),
            ("papsnet.url", self.url.as_str()),
            ("papsnet.key", key.as_str()),
        ])
    }

    async fn item(&self, key: Key) -> Result<Option<oo7::Item>> {
        Ok(self
            .keyring
            .search_items(self.attributes(key))
            .await
            .map_err(error::Storage::from)?
            .into_iter()
            .next())
    }

    pub(crate) async fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            keyring: oo7::Keyring::new().await.map_err(error::Storage::from)?,
            url: url.as_str().to_owned(),
        })
    }
}

impl IsPersistent for SecretService {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for SecretService {
    async fn get(&mut self, key: Key) -> Result<Option<String>> {
        let data = match self.item(key).await? {
            Some(item) => {
                let secret = item.secret().await.map_err(error::Storage::from)?;
                Some(serde_json::from_slice(&secret)?)
            }
            None => None,
        };
        Ok(data)
    }

    async fn update(&mut self, key: Key, value: &str) -> Result<()> {
        let label = format!("{} {}", *metadata::CLIENT_DISPLAY_NAME, key);
        self.keyring
            .create_item(
                &label,
                self.attributes(key),
                SecretVec::new(serde_json::to_vec(value)?).expose_secret(),
                true,
            )
            .await
            .map_err(error::Storage::from)?;
        Ok(())
    }

    async fn clear(&mut self, key: Key) -> Result<()> {
        if let Some(item) = self.item(key).await? {
            item.delete().await.map_err(error::Storage::from)?;
        }
        Ok(())
    }
}
