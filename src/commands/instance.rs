//! Instance commands: deploy from git or local files, list, query, delete.

use crate::api::{
    DeployData, DeploySettings, Envelope, InstanceDetail, InstanceSummary, MeData, RateLimiter,
    UploadData,
};
use crate::codes::{self, instance_state, instance_status};
use crate::error::CliError;
use crate::package::{is_zip, requirements_for, Archive};
use crate::session::Session;
use crate::validate::is_git_url;
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

const DEFAULT_ENTRY: &str = "main.py";

/// Deploy parameters as given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployOptions {
    pub name: String,
    /// Entry file; defaults to `main.py`, or the script name for single files.
    pub file: Option<String>,
    pub no_frontend: bool,
    pub transform: bool,
    pub app_secret: Option<String>,
    pub rate_limiters: Vec<RateLimiter>,
    pub envs: BTreeMap<String, String>,
}

impl DeployOptions {
    fn settings(&self, default_entry: &str) -> DeploySettings {
        DeploySettings {
            name: self.name.clone(),
            entry_point: self
                .file
                .clone()
                .unwrap_or_else(|| default_entry.to_string()),
            with_no_frontend: self.no_frontend,
            with_transform: self.transform,
            app_secret: self.app_secret.clone().filter(|s| !s.is_empty()),
            rate_limiters: self.rate_limiters.clone(),
            envs: self.envs.clone(),
        }
    }
}

/// Parses `--rate-limiters`, a JSON list such as
/// `[{"max_calls": 10, "period": 60, "source": "browser"}]`.
pub fn parse_rate_limiters(raw: &str) -> Result<Vec<RateLimiter>, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid rate limiters: {e}"))
}

/// Parses one `--env KEY=VALUE` pair.
pub fn parse_env(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

/// Deploys a git URL or a local path, whichever `target` looks like.
pub fn deploy<W: Write>(s: &mut Session<W>, target: &str, opts: &DeployOptions) -> Result<()> {
    if is_git_url(target) {
        git(s, target, opts)
    } else if Path::new(target).exists() {
        local(s, Path::new(target), opts)
    } else {
        Err(CliError::invalid(format!(
            "Unexpected `{target}`, expected a git URL or a local path."
        ))
        .into())
    }
}

pub fn git<W: Write>(s: &mut Session<W>, repo_link: &str, opts: &DeployOptions) -> Result<()> {
    s.require_login()?;
    let envelope = s.api.deploy_git(repo_link, &opts.settings(DEFAULT_ENTRY))?;
    report_deploy(s, envelope)
}

/// Deploys a folder, a zip archive, or a single python file with the
/// `requirements.txt` beside it.
pub fn local<W: Write>(s: &mut Session<W>, path: &Path, opts: &DeployOptions) -> Result<()> {
    s.require_login()?;
    if !path.exists() {
        return Err(CliError::invalid(format!("`{}` does not exist.", path.display())).into());
    }

    let (file_id, settings) = if path.is_file() && is_zip(path)? {
        (upload(s, path)?, opts.settings(DEFAULT_ENTRY))
    } else if path.is_file() && path.extension().is_some_and(|ext| ext == "py") {
        let requirements = requirements_for(path);
        if !requirements.exists() {
            return Err(CliError::invalid(format!(
                "`{}` was not found. A `requirements.txt` is required for deployment.",
                requirements.display()
            ))
            .into());
        }
        let script = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_ENTRY.to_string());
        let spinner = s.out.spinner("Compressing deployment zip...");
        let archive = Archive::from_script(path);
        spinner.finish_and_clear();
        let archive = archive?;
        (upload(s, archive.path())?, opts.settings(&script))
    } else if path.is_dir() {
        let spinner = s.out.spinner("Compressing deployment zip...");
        let archive = Archive::from_folder(path);
        spinner.finish_and_clear();
        let archive = archive?;
        if archive.entries.is_empty() {
            return Err(CliError::invalid(format!(
                "`{}` has no files to deploy.",
                path.display()
            ))
            .into());
        }
        log::info!("packed {} files from {}", archive.entries.len(), path.display());
        (upload(s, archive.path())?, opts.settings(DEFAULT_ENTRY))
    } else {
        return Err(CliError::invalid(format!(
            "`{}` is not a zip archive, a python file or a folder.",
            path.display()
        ))
        .into());
    };

    let envelope = s.api.deploy_upload(&file_id, &settings)?;
    report_deploy(s, envelope)
}

/// Uploads an archive and returns the server's file id.
fn upload<W: Write>(s: &mut Session<W>, archive: &Path) -> Result<Value> {
    let spinner = s.out.spinner("Uploading deployment zip...");
    let envelope = s.api.upload(archive);
    spinner.finish_and_clear();
    let envelope = envelope?;
    if !envelope.is_success() {
        s.out.warn("Failed to upload deploy code!")?;
    }
    let UploadData { file_id } = s.check(envelope)?.data_as::<UploadData>()?;
    Ok(file_id)
}

fn report_deploy<W: Write>(s: &mut Session<W>, envelope: Envelope) -> Result<()> {
    if !envelope.is_success() {
        s.out.warn("Failed to deploy!")?;
    }
    let DeployData {
        application_name,
        instance_id,
    } = s.check(envelope)?.data_as::<DeployData>()?;
    s.out.success("Successfully created deployment task!")?;
    s.out.fields(&[
        ("App name", application_name),
        ("Instance id", instance_id.to_string()),
    ])?;
    Ok(())
}

/// Renders a server timestamp in local time. Timestamps without an offset
/// are taken as UTC; anything unparsable is shown as received.
pub fn local_time(raw: &str) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return at.with_timezone(&Local).format(FORMAT).to_string();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        let at: DateTime<Utc> = naive.and_utc();
        return at.with_timezone(&Local).format(FORMAT).to_string();
    }
    raw.to_string()
}

fn opt_time(raw: Option<&str>, missing: &str) -> String {
    match raw.filter(|t| !t.is_empty()) {
        Some(t) => local_time(t),
        None => missing.to_string(),
    }
}

pub fn list<W: Write>(s: &mut Session<W>) -> Result<()> {
    s.require_login()?;
    let envelope = s.api.list_instances()?;
    let instances: Vec<InstanceSummary> = s.check(envelope)?.data_as()?;
    if instances.is_empty() {
        s.out.line("You have no instances yet.")?;
        return Ok(());
    }
    let rows = instances
        .iter()
        .map(|i| {
            vec![
                i.id.to_string(),
                i.name.clone(),
                opt_time(i.start_time.as_deref(), "-"),
                instance_state(i.state),
            ]
        })
        .collect();
    s.out.table(
        "Instances Dashboard",
        &["ID", "Name", "Deploy Time", "State"],
        rows,
    )?;
    Ok(())
}

pub fn query<W: Write>(s: &mut Session<W>, id: i64) -> Result<()> {
    s.require_login()?;
    let envelope = s.api.query_instance(id)?;
    let detail: InstanceDetail = s.check(envelope)?.data_as()?;
    let envelope = s.api.me()?;
    let me: MeData = s.check(envelope)?.data_as()?;

    let subdomain = format!("{}-{}.funix.io", detail.name, me.username);
    let path = format!("funix.io/{}/{}", me.username, detail.name);
    let status = detail.status.unwrap_or(codes::ErrorCode::Success.code());
    s.out.fields(&[
        ("Name", detail.name.clone()),
        ("ID", detail.id.to_string()),
        ("Domain", format!("{subdomain} or {path}")),
        ("State", instance_state(detail.state)),
        ("Created", opt_time(detail.start_time.as_deref(), "-")),
        ("Finished", opt_time(detail.done_time.as_deref(), "Not finished")),
        (
            "Deploy Message",
            detail.message.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Status", format!("{} ({status})", instance_status(status))),
    ])?;
    if status != codes::ErrorCode::Success.code() {
        s.out.warn(codes::describe(status))?;
    }
    Ok(())
}

pub fn delete<W: Write>(s: &mut Session<W>, id: i64) -> Result<()> {
    s.require_login()?;
    let envelope = s.api.remove_instance(id)?;
    s.check(envelope)?;
    s.out
        .success(format!("Successfully removed instance `{id}`!"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::LimiterSource;

    #[test]
    fn env_pairs() {
        assert_eq!(parse_env("KEY=a=b").unwrap(), ("KEY".into(), "a=b".into()));
        assert_eq!(parse_env("EMPTY=").unwrap(), ("EMPTY".into(), String::new()));
        assert!(parse_env("novalue").is_err());
        assert!(parse_env("=x").is_err());
    }

    #[test]
    fn rate_limiter_json() {
        let parsed =
            parse_rate_limiters(r#"[{"max_calls": 10, "period": 60, "source": "browser"}]"#)
                .unwrap();
        assert_eq!(
            parsed,
            vec![RateLimiter {
                max_calls: 10,
                period: 60,
                source: LimiterSource::Browser
            }]
        );
        assert!(parse_rate_limiters(r#"[{"max_calls": 10}]"#).is_err());
    }

    #[test]
    fn entry_point_defaults() {
        let opts = DeployOptions {
            name: "demo".into(),
            app_secret: Some(String::new()),
            ..Default::default()
        };
        let settings = opts.settings("hello.py");
        assert_eq!(settings.entry_point, "hello.py");
        assert_eq!(settings.app_secret, None);

        let opts = DeployOptions {
            file: Some("app.py".into()),
            ..opts
        };
        assert_eq!(opts.settings("hello.py").entry_point, "app.py");
    }

    #[test]
    fn unparsable_time_is_kept() {
        assert_eq!(local_time("yesterday"), "yesterday");
        assert_ne!(local_time("2024-05-01T10:00:00Z"), "2024-05-01T10:00:00Z");
        assert_ne!(local_time("2024-05-01T10:00:00.123"), "2024-05-01T10:00:00.123");
    }
}
