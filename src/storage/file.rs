// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;

use crate::{error::Result, metadata};

use super::{IsPersistent, Key, Storage};

/// One JSON-encoded string per key, kept under a directory.
pub(crate) struct File {
    dir: PathBuf,
}

impl File {
    pub(crate) fn new<P: AsRef<Path>>(dir: P) -> Option<Self> {
        metadata::PROJECT_DIRS.as_ref().map(|dirs| Self {
            dir: dirs.data_dir().to_owned().join(dir),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: Key) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl IsPersistent for File {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage for File {
    async fn get(&mut self, key: Key) -> Result<Option<String>> {
        match fs::File::open(self.path(key)) {
            Ok(fp) => Ok(Some(serde_json::from_reader::<fs::File, String>(fp)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&mut self, key: Key, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let file = fs::File::create(self.path(key))?;
        serde_json::to_writer(file, value)?;
        Ok(())
    }

    async fn clear(&mut self, key: Key) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{env, process};

    use super::*;

    #[tokio::test]
    async fn entries_survive_reopen_and_clear_is_idempotent() -> Result<()> {
        let dir = env::temp_dir().join(format!("papsnet-admin-file-{}", process::id()));
        let mut storage = File::with_dir(&dir);

        assert_eq!(storage.get(Key::RefreshToken).await?, None);
        storage.update(Key::RefreshToken, "refresh").await?;

        let mut reopened = File::with_dir(&dir);
        assert_eq!(
            reopened.get(Key::RefreshToken).await?.as_deref(),
            Some("refresh")
        );

        reopened.clear(Key::RefreshToken).await?;
        reopened.clear(Key::RefreshToken).await?;
        assert_eq!(storage.get(Key::RefreshToken).await?, None);

        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
