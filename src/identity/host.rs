use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::{HostContext, HostPlatform};

/// Host for the terminal client. The viewer context comes from, in order:
/// an explicit `--fid`, a `--context` JSON file, the `GITCAST_CONTEXT` env
/// var. None of them set means "no context".
#[derive(Clone, Debug, Default)]
pub struct CliHost {
    pub fid: Option<u64>,
    pub context_path: Option<PathBuf>,
}

impl CliHost {
    pub fn new(fid: Option<u64>, context_path: Option<PathBuf>) -> Self {
        Self { fid, context_path }
    }
}

pub(crate) fn parse_context(raw: &str) -> Result<HostContext> {
    serde_json::from_str(raw).context("parse host context JSON")
}

#[async_trait]
impl HostPlatform for CliHost {
    async fn context(&self) -> Result<Option<HostContext>> {
        if let Some(fid) = self.fid {
            return Ok(Some(HostContext::for_user(fid)));
        }
        if let Some(path) = &self.context_path {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read host context {}", path.display()))?;
            return parse_context(&raw).map(Some);
        }
        match std::env::var("GITCAST_CONTEXT") {
            Ok(raw) if !raw.trim().is_empty() => parse_context(&raw).map(Some),
            _ => Ok(None),
        }
    }

    fn ready(&self) {
        debug!("host ready");
    }

    fn open_url(&self, url: &str) -> Result<()> {
        let mut cmd = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            Command::new("xdg-open")
        };
        cmd.arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("open {url}"))?;
        Ok(())
    }
}
