//! Status command handler

use anyhow::Result;

use pvault_core::catalog::category_counts;
use pvault_core::store::human_bytes;
use pvault_core::{Config, Vault};

use crate::output::{Output, OutputFormat};

/// Show storage location, usage and per-category counts
pub async fn show(vault: &Vault, config: &Config, output: &Output) -> Result<()> {
    let counts = category_counts(vault.records());
    let usage = match vault.storage_usage().await {
        Ok(usage) => usage,
        Err(e) => {
            output.warning(&format!("Could not read storage usage: {}", e));
            None
        }
    };
    let refine_configured = config
        .refine
        .api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());

    match output.format {
        OutputFormat::Json => {
            let categories: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(category, count)| (category.as_str().to_string(), (*count).into()))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "database": config.sqlite_path(),
                    "available": !vault.is_degraded(),
                    "storage": usage,
                    "total": vault.records().len(),
                    "categories": categories,
                    "refine_configured": refine_configured
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", vault.records().len());
        }
        OutputFormat::Human => {
            println!("pvault Status");
            println!("=============");
            println!();
            println!("Storage:");
            println!("  Database: {}", config.sqlite_path().display());
            if vault.is_degraded() {
                println!("  State:    unavailable (read-only, empty)");
            }
            match usage {
                Some(usage) => println!("  Usage:    {}", usage.to_human()),
                None => println!("  Usage:    unknown"),
            }
            if let Some(quota) = config.storage_quota_bytes {
                println!("  Quota:    {}", human_bytes(quota));
            }
            println!();
            println!("Prompts: {}", vault.records().len());
            for (category, count) in &counts {
                println!("  {:<15} {}", category.label(), count);
            }
            println!();
            println!(
                "Refinement: {}",
                if refine_configured {
                    format!("enabled ({})", config.refine.model)
                } else {
                    "not configured".to_string()
                }
            );
        }
    }

    Ok(())
}
