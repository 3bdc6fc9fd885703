//! Refine command handler

use anyhow::{Context, Result};

use pvault_core::config::RefineConfig;
use pvault_core::{RefineOutcome, Refiner, Vault};

use crate::output::{Output, OutputFormat};

/// Refine a stored prompt, optionally saving the result
pub async fn record(
    vault: &mut Vault,
    refine: &RefineConfig,
    id: String,
    apply: bool,
    output: &Output,
) -> Result<()> {
    let mut record = vault.resolve(&id)?.clone();

    let RefineOutcome::Refined(text) = run(refine, &record.prompt, output).await else {
        return Ok(());
    };

    if apply {
        record.set_prompt(text);
        vault
            .update(record.clone())
            .await
            .context("Failed to save refined prompt")?;
        output.success(&format!("Updated prompt: {}", record.id));
    }

    Ok(())
}

/// Refine free text without touching storage
pub async fn text(refine: &RefineConfig, text: String, output: &Output) -> Result<()> {
    run(refine, &text, output).await;
    Ok(())
}

/// Refinement failures are reported but never fail the command
async fn run(refine: &RefineConfig, prompt: &str, output: &Output) -> RefineOutcome {
    let outcome = Refiner::new(refine.clone()).refine(prompt).await;

    match &outcome {
        RefineOutcome::Refined(text) => match output.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "refined", "original": prompt, "refined": text})
                );
            }
            OutputFormat::Human | OutputFormat::Quiet => println!("{}", text),
        },
        RefineOutcome::Unavailable(reason) => {
            if output.is_json() {
                println!(
                    "{}",
                    serde_json::json!({"status": "unavailable", "original": prompt, "reason": reason})
                );
            } else {
                output.warning(reason);
                output.message("The original prompt is unchanged.");
            }
        }
    }

    outcome
}
