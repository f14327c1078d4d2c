// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod file;
#[cfg(feature = "keychain")]
mod keychain;
mod memory;
#[cfg(feature = "secret-service")]
mod secret_service;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;

pub(crate) use file::File;
#[cfg(feature = "keychain")]
pub(crate) use keychain::Keychain;
pub(crate) use memory::Memory;
#[cfg(feature = "secret-service")]
pub(crate) use secret_service::SecretService;

/// The entries that make up a persisted session. Nothing outside the session
/// store writes these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Key {
    AccessToken,
    RefreshToken,
    User,
}

impl Key {
    pub(crate) const ALL: [Self; 3] = [Self::AccessToken, Self::RefreshToken, Self::User];

    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access-token",
            Self::RefreshToken => "refresh-token",
            Self::User => "auth-user-json",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) trait IsPersistent {
    fn is_persistent(&self) -> bool;
}

impl<T: IsPersistent + ?Sized> IsPersistent for Box<T> {
    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}

#[async_trait]
pub(crate) trait Storage: Send + Sync + IsPersistent {
    async fn get(&mut self, key: Key) -> Result<Option<String>>;
    async fn update(&mut self, key: Key, value: &str) -> Result<()>;
    async fn clear(&mut self, key: Key) -> Result<()>;
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Box<T> {
    async fn get(&mut self, key: Key) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn update(&mut self, key: Key, value: &str) -> Result<()> {
        (**self).update(key, value).await
    }

    async fn clear(&mut self, key: Key) -> Result<()> {
        (**self).clear(key).await
    }
}
