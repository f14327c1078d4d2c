// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

use super::{IsPersistent, Key, Storage};

/// Process-local storage. Clones share the same entries, which lets tests keep
/// a handle on what the session store wrote.
#[derive(Clone, Default)]
pub(crate) struct Memory {
    data: Arc<RwLock<HashMap<Key, String>>>,
}

impl Memory {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl IsPersistent for Memory {
    fn is_persistent(&self) -> bool {
        false
    }
}

#[async_trait]
impl Storage for Memory {
    async fn get(&mut self, key: Key) -> Result<Option<String>> {
        let data = Arc::clone(&self.data);
        let guard = data.read().await;
        Ok(guard.get(&key).cloned())
    }

    async fn update(&mut self, key: Key, value: &str) -> Result<()> {
        let target_data = Arc::clone(&self.data);
        let mut guard = target_data.write_owned().await;
        let _ = guard.insert(key, value.to_owned());
        Ok(())
    }

    async fn clear(&mut self, key: Key) -> Result<()> {
        let target_data = Arc::clone(&self.data);
        let mut guard = target_data.write_owned().await;
        let _ = guard.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_entries() -> Result<()> {
        let mut a = Memory::new();
        let mut b = a.clone();

        a.update(Key::AccessToken, "token").await?;
        assert_eq!(b.get(Key::AccessToken).await?.as_deref(), Some("token"));

        b.clear(Key::AccessToken).await?;
        assert_eq!(a.get(Key::AccessToken).await?, None);
        Ok(())
    }
}
