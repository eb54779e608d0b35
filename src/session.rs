// State shared by every command for one invocation.

use crate::api::{ApiClient, Envelope};
use crate::config::Config;
use crate::error::CliError;
use crate::render::Renderer;
use crate::ui::Prompt;
use anyhow::Result;
use std::io::Write;

pub struct Session<W: Write> {
    pub config: Config,
    pub api: ApiClient,
    pub out: Renderer<W>,
    pub prompt: Box<dyn Prompt>,
}

impl<W: Write> Session<W> {
    /// Builds the client against `server` (already resolved) with the stored
    /// token attached.
    pub fn new(config: Config, server: &str, out: Renderer<W>, prompt: Box<dyn Prompt>) -> Result<Self> {
        let mut api = ApiClient::new(server)?;
        api.set_token(config.token.clone());
        Ok(Session {
            config,
            api,
            out,
            prompt,
        })
    }

    pub fn require_login(&self) -> Result<(), CliError> {
        if self.api.has_token() {
            Ok(())
        } else {
            Err(CliError::NotLoggedIn)
        }
    }

    /// Persists the token and uses it for the rest of the run.
    pub fn store_token(&mut self, token: Option<String>) -> Result<()> {
        self.config.set_token(token.clone())?;
        self.api.set_token(token);
        Ok(())
    }

    /// Passes successful envelopes through; prints the explanation for any
    /// other code and turns it into `CliError::Rejected`.
    pub fn check(&mut self, envelope: Envelope) -> Result<Envelope> {
        self.out.envelope(&envelope)?;
        if envelope.is_success() {
            return Ok(envelope);
        }
        self.out.failure(&envelope)?;
        Err(CliError::Rejected {
            code: envelope.code,
        }
        .into())
    }
}
