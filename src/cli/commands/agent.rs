//! Agent command implementation.

use super::connect;
use crate::agent::Agent;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the agent command.
pub async fn run_agent(
    question: &str,
    max_iterations: Option<usize>,
    settings: Settings,
) -> Result<()> {
    let gateway = connect(&settings, Operation::Gateway)?;
    let mut agent = Agent::from_settings(&settings, gateway).await?;
    if let Some(max) = max_iterations {
        agent = agent.with_max_iterations(max);
    }

    let spinner = Output::spinner("Agent working...");

    match agent.run(question).await {
        Ok(response) => {
            spinner.finish_and_clear();

            println!("\n{}\n", response.content);

            if !response.tool_calls.is_empty() {
                Output::header(&format!("Tool calls ({})", response.tool_calls.len()));
                for call in &response.tool_calls {
                    Output::info(&format!("  {} {}", call.name, truncate(&call.arguments, 60)));
                }
                println!();
            }

            Output::info(&format!("Completed in {} iteration(s)", response.iterations));
            if response.stopped_early {
                Output::warning("Iteration limit reached before a final answer.");
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Agent failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 60), "short");
        assert_eq!(truncate("Leonardo DiCaprio girlfriend", 10), "Leonard...");
        assert_eq!(truncate("ångström ångström", 8), "ångst...");
    }
}
