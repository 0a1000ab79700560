//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{GatewaySettings, Settings};
use crate::error::{ChainlabError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Model calls need a usable gateway configuration.
    Gateway,
    /// Video commands additionally need yt-dlp.
    Video,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_gateway(&settings.gateway)?;
    if let Operation::Video = operation {
        check_tool(&settings.youtube.ytdlp_path)?;
    }
    Ok(())
}

/// Check that the gateway URL parses and credentials are complete.
pub fn check_gateway(settings: &GatewaySettings) -> Result<()> {
    let base = url::Url::parse(&settings.base_url).map_err(|e| {
        ChainlabError::Config(format!(
            "gateway.base_url '{}' is not a valid URL ({}). Set it with: export AICORE_BASE_URL=...",
            settings.base_url, e
        ))
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ChainlabError::Config(format!(
            "gateway.base_url must be http or https, got '{}'",
            base.scheme()
        )));
    }

    let has_token = settings.token.as_deref().is_some_and(|t| !t.is_empty());
    let partial = [
        ("AICORE_AUTH_URL", settings.auth_url.is_some()),
        ("AICORE_CLIENT_ID", settings.client_id.is_some()),
        ("AICORE_CLIENT_SECRET", settings.client_secret.is_some()),
    ];
    let set = partial.iter().filter(|(_, present)| *present).count();
    if !has_token && set > 0 && set < partial.len() {
        let missing: Vec<&str> = partial
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        return Err(ChainlabError::Config(format!(
            "Incomplete gateway credentials, missing: {}",
            missing.join(", ")
        )));
    }

    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ChainlabError::ToolFailed(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ChainlabError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ChainlabError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
