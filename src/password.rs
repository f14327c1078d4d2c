// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::task;

use crate::error::Result;

#[derive(Debug, Default, Clone)]
pub(crate) struct Request {
    identifier: String,
    error: Option<String>,
}

pub(crate) struct RequestBuilder {
    identifier: String,
    error: Option<String>,
}

impl RequestBuilder {
    pub(crate) fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_owned(),
            error: None,
        }
    }

    pub(crate) fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_owned());
        self
    }

    pub(crate) fn into_request(self) -> Request {
        Request {
            identifier: self.identifier,
            error: self.error,
        }
    }
}

#[async_trait]
pub(crate) trait Prompt: Send + Sync {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>>;
}

#[async_trait]
impl<T: Prompt + ?Sized> Prompt for Box<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        (**self).prompt(req).await
    }
}

#[async_trait]
impl<T: Prompt> Prompt for Vec<T> {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        for candidate in self {
            if let r @ (Ok(Some(_)) | Err(_)) = candidate.prompt(req.clone()).await {
                return r;
            }
        }

        Ok(None)
    }
}

/// A secret supplied up front (e.g. through the environment). It only answers
/// the first request; once it has been rejected, later prompts get a say.
pub(crate) struct PresetPrompt {
    secret: Option<SecretString>,
}

impl PresetPrompt {
    pub(crate) const fn new(secret: Option<SecretString>) -> Self {
        Self { secret }
    }
}

#[async_trait]
impl Prompt for PresetPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        Ok(match req.error {
            Some(_) => None,
            None => self.secret.clone(),
        })
    }
}

pub(crate) struct RpasswordPrompt;

#[async_trait]
impl Prompt for RpasswordPrompt {
    async fn prompt(&self, req: Request) -> Result<Option<SecretString>> {
        if let Some(error) = req.error {
            eprintln!("Error: {error}");
        }

        let prompt = format!("Password for {}: ", req.identifier);
        Ok(Some(
            task::spawn_blocking(move || rpassword::prompt_password(prompt).map(SecretString::new))
                .await??,
        ))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret as _;

    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl Prompt for Fixed {
        async fn prompt(&self, _: Request) -> Result<Option<SecretString>> {
            Ok(Some(SecretString::new(self.0.to_owned())))
        }
    }

    #[tokio::test]
    async fn preset_defers_after_rejection() -> Result<()> {
        let chain: Vec<Box<dyn Prompt>> = vec![
            Box::new(PresetPrompt::new(Some(SecretString::new("env".to_owned())))),
            Box::new(Fixed("typed")),
        ];

        let first = chain
            .prompt(RequestBuilder::new("admin@x.com").into_request())
            .await?;
        assert_eq!(first.as_ref().map(|s| s.expose_secret().as_str()), Some("env"));

        let retry = chain
            .prompt(
                RequestBuilder::new("admin@x.com")
                    .with_error("bad credentials")
                    .into_request(),
            )
            .await?;
        assert_eq!(retry.as_ref().map(|s| s.expose_secret().as_str()), Some("typed"));
        Ok(())
    }
}
