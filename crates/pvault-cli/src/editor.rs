//! Interactive editing support
//!
//! Opens $EDITOR for long prompt text and reads single-line answers for
//! field-by-field editing.

use anyhow::{bail, Context, Result};
use pvault_core::Category;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::Command;

/// Edit prompt text in the user's editor
///
/// The buffer holds `current` followed by a comment footer naming the
/// category. Returns `None` when only comments or whitespace are left.
pub fn edit_prompt(current: &str, category: Category) -> Result<Option<String>> {
    let editor = find_editor()?;

    let mut file = tempfile::Builder::new()
        .prefix("pvault_prompt_")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create temp file for the editor")?;
    file.write_all(prompt_buffer(current, category).as_bytes())?;
    file.flush()?;
    // Closed before the editor runs; removed when `path` drops
    let path = file.into_temp_path();

    let status = Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        bail!(
            "Editor '{}' exited with non-zero status. Check that your editor is configured correctly.",
            editor
        );
    }

    let edited = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read edited file: {:?}", path))?;

    let text = strip_comments(&edited);
    Ok((!text.is_empty()).then_some(text))
}

fn prompt_buffer(current: &str, category: Category) -> String {
    format!(
        "{}\n\n# {} prompt.\n# Lines starting with '#' are ignored. Leave empty to keep the prompt unchanged.\n",
        current.trim_end(),
        category.label()
    )
}

/// Drop `#` comment lines and surrounding whitespace from editor output
fn strip_comments(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Find the user's preferred editor
fn find_editor() -> Result<String> {
    if let Ok(editor) = env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    if let Ok(visual) = env::var("VISUAL") {
        if !visual.is_empty() {
            return Ok(visual);
        }
    }

    let common_editors = ["nano", "vim", "vi", "emacs", "code", "notepad"];

    for editor in common_editors {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!(
        "No editor found. Set $EDITOR environment variable or pass --prompt.\n\
         Example: export EDITOR=nano"
    )
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Whether stdin is an interactive terminal
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// Prompt with a default value, returns None if user keeps default
pub fn prompt_with_default(prompt: &str, default: &str) -> Result<Option<String>> {
    if default.is_empty() {
        print!("{}: ", prompt);
    } else {
        print!("{} [{}]: ", prompt, default);
    }
    io::stdout().flush()?;

    read_answer()
}

/// Prompt for optional value
pub fn prompt_optional(prompt: &str) -> Result<Option<String>> {
    print!("{}: ", prompt);
    io::stdout().flush()?;

    read_answer()
}

fn read_answer() -> Result<Option<String>> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(None)
    } else {
        Ok(Some(input.to_string()))
    }
}
