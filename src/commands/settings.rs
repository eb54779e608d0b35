//! `config` commands.

use crate::error::CliError;
use crate::session::Session;
use anyhow::Result;
use std::io::Write;

pub fn show<W: Write>(s: &mut Session<W>) -> Result<()> {
    let token = if s.api.has_token() {
        "stored"
    } else {
        "not stored"
    };
    let rows = [
        ("Config file", s.config.path().display().to_string()),
        ("Server", s.api.base_url().to_string()),
        ("Token", token.to_string()),
    ];
    s.out.fields(&rows)?;
    Ok(())
}

/// Persists a new server URL for later runs.
pub fn set_server<W: Write>(s: &mut Session<W>, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(CliError::invalid(format!(
            "`{url}` is not a server URL, it should start with http:// or https://"
        ))
        .into());
    }
    s.config.set_server(url)?;
    let saved = s.config.server.clone();
    s.out.success(format!("Server set to {saved}"))?;
    Ok(())
}
