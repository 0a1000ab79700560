//! Doctor command - verify gateway access, tools and configuration.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::gateway::{select_deployment, Deployment, DeploymentRegistry, Gateway};
use console::style;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("chainlab doctor");
    println!();
    println!("Checking gateway access, tools and configuration...\n");

    let mut checks = Vec::new();

    let tools = vec![check_tool(&settings.youtube.ytdlp_path, install_hint_ytdlp())];
    print_section("External Tools", &tools);
    checks.extend(tools);

    let gateway = check_gateway_settings(settings);
    print_section("Gateway", &gateway);
    let gateway_ok = gateway.iter().all(|c| c.status != CheckStatus::Error);
    checks.extend(gateway);

    if gateway_ok {
        let deployments = check_deployments(settings).await;
        print_section("Deployments", &deployments);
        checks.extend(deployments);
    }

    let config = vec![check_config_file(config_path), check_prompts_dir(settings)];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using chainlab.",
            errors
        ));
        anyhow::bail!("doctor found {} error(s)", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! chainlab is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(50)
                .collect::<String>();
            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn check_gateway_settings(settings: &Settings) -> Vec<CheckResult> {
    let gateway = &settings.gateway;
    let mut results = Vec::new();

    match preflight::check_gateway(gateway) {
        Ok(()) => results.push(CheckResult::ok("Base URL", &gateway.base_url)),
        Err(e) => {
            results.push(CheckResult::error(
                "Gateway settings",
                &e.to_string(),
                "Set AICORE_BASE_URL and credentials, or edit [gateway] with: chainlab config edit",
            ));
            return results;
        }
    }

    let credentials = if gateway.token.as_deref().is_some_and(|t| !t.is_empty()) {
        CheckResult::ok("Credentials", "static bearer token")
    } else if gateway.client_id.is_some() {
        CheckResult::ok(
            "Credentials",
            &format!("client credentials ({})", mask(gateway.client_id.as_deref().unwrap_or(""))),
        )
    } else {
        CheckResult::warning(
            "Credentials",
            "none (anonymous requests)",
            "Set AICORE_AUTH_URL, AICORE_CLIENT_ID and AICORE_CLIENT_SECRET",
        )
    };
    results.push(credentials);
    results.push(CheckResult::ok("Resource group", &gateway.resource_group));

    results
}

async fn check_deployments(settings: &Settings) -> Vec<CheckResult> {
    let gateway = match Gateway::new(&settings.gateway) {
        Ok(g) => Arc::new(g),
        Err(e) => {
            return vec![CheckResult::error(
                "Gateway client",
                &e.to_string(),
                "Check the [gateway] settings",
            )]
        }
    };

    let deployments = match DeploymentRegistry::new(gateway).list().await {
        Ok(d) => d,
        Err(e) => {
            return vec![CheckResult::error(
                "Registry",
                &e.to_string(),
                "Check the base URL, credentials and resource group",
            )]
        }
    };

    let mut results = vec![CheckResult::ok(
        "Registry",
        &format!(
            "{} deployment(s), {} running",
            deployments.len(),
            deployments.iter().filter(|d| d.is_running()).count()
        ),
    )];

    let models = [
        ("Chat model", settings.llm.model.as_str(), settings.llm.deployment_id.as_deref()),
        (
            "Embedding model",
            settings.embedding.model.as_str(),
            settings.embedding.deployment_id.as_deref(),
        ),
        ("Agent model", settings.agent_model(), None),
    ];
    for (label, model, pinned) in models {
        results.push(model_check(label, model, pinned, &deployments));
    }

    results
}

fn model_check(
    label: &str,
    model: &str,
    pinned: Option<&str>,
    deployments: &[Deployment],
) -> CheckResult {
    if let Some(id) = pinned {
        return CheckResult::ok(label, &format!("{} (pinned to {})", model, id));
    }
    match select_deployment(deployments, model) {
        Some(d) => CheckResult::ok(label, &format!("{} on {}", model, d.id)),
        None => CheckResult::error(
            label,
            &format!("no running deployment for {}", model),
            "Deploy the model or pick another one in the config",
        ),
    }
}

/// Check if config file exists.
fn check_config_file(path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::ok("Config file", &format!("{}", path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: chainlab config edit",
        )
    }
}

fn check_prompts_dir(settings: &Settings) -> CheckResult {
    match &settings.prompts.custom_dir {
        None => CheckResult::ok("Prompts", "built-in templates"),
        Some(dir) => {
            let path = Settings::expand_path(dir);
            if path.is_dir() {
                CheckResult::ok("Prompts", &format!("custom templates in {}", path.display()))
            } else {
                CheckResult::warning(
                    "Prompts",
                    &format!("{} does not exist", path.display()),
                    "Built-in templates will be used",
                )
            }
        }
    }
}

fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}
