//! Backup command handlers (export, import, reset)

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;

use pvault_core::catalog::backup_file_name;
use pvault_core::Vault;

use crate::editor::confirm;
use crate::output::Output;

/// Write the full collection as a JSON backup
///
/// Defaults to `PromptVault_Backup_<date>.json` in the current directory;
/// `-` writes to stdout.
pub async fn export(vault: &Vault, path: Option<PathBuf>, output: &Output) -> Result<()> {
    let backup = vault.export().await.context("Failed to export prompts")?;

    let path = path.unwrap_or_else(|| PathBuf::from(backup_file_name(Local::now().date_naive())));

    if path == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&backup.bytes)?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }

    std::fs::write(&path, &backup.bytes)
        .with_context(|| format!("Failed to write backup file: {:?}", path))?;

    output.success(&format!(
        "Exported {} prompt(s) to {}",
        backup.count,
        path.display()
    ));

    Ok(())
}

/// Import prompts from a JSON backup
pub async fn import(vault: &mut Vault, path: PathBuf, output: &Output) -> Result<()> {
    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read backup file: {:?}", path))?;

    let report = vault
        .import(&bytes)
        .await
        .with_context(|| format!("Failed to import {:?}", path))?;

    output.print_import_report(&report);
    Ok(())
}

/// Delete every prompt
///
/// Asks first in an interactive terminal; otherwise `--yes` is required.
pub async fn reset(vault: &mut Vault, yes: bool, output: &Output) -> Result<()> {
    let count = vault.records().len();

    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to delete all prompts without --yes");
        }
        println!("This permanently deletes all {} prompt(s).", count);
        println!("Consider `pvault export` first.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    vault.reset().await.context("Failed to clear prompts")?;

    output.success(&format!("Deleted {} prompt(s)", count));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use pvault_core::{Category, MemoryStore, PromptRecord};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    async fn seeded_vault() -> Vault {
        let mut vault = Vault::load(Arc::new(MemoryStore::new())).await.unwrap();
        for (id, title) in [("1700000000001", "First"), ("1700000000002", "Second")] {
            let mut record = PromptRecord::with_id(id, Category::General);
            record.set_title(title);
            record.set_prompt(format!("{} prompt", title));
            vault.create(record).await.unwrap();
        }
        vault
    }

    #[tokio::test]
    async fn test_export_then_import_into_empty_vault() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup.json");

        let source = seeded_vault().await;
        export(&source, Some(path.clone()), &quiet()).await.unwrap();

        let mut target = Vault::load(Arc::new(MemoryStore::new())).await.unwrap();
        import(&mut target, path, &quiet()).await.unwrap();

        assert_eq!(target.query(None, ""), source.query(None, ""));
    }

    #[tokio::test]
    async fn test_import_rejects_non_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        std::fs::write(&path, r#"{"prompts": []}"#).unwrap();

        let mut vault = Vault::load(Arc::new(MemoryStore::new())).await.unwrap();
        assert!(import(&mut vault, path, &quiet()).await.is_err());
        assert!(vault.records().is_empty());
    }

    #[tokio::test]
    async fn test_import_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut vault = Vault::load(Arc::new(MemoryStore::new())).await.unwrap();
        let result = import(&mut vault, temp_dir.path().join("missing.json"), &quiet()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reset_requires_yes_when_not_prompting() {
        let mut vault = seeded_vault().await;

        assert!(reset(&mut vault, false, &quiet()).await.is_err());
        assert_eq!(vault.records().len(), 2);

        reset(&mut vault, true, &quiet()).await.unwrap();
        assert!(vault.records().is_empty());
    }
}
