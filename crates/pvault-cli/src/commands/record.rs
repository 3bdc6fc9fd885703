//! Prompt command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use pvault_core::media::{decode_data_url, embed_file, extension_for_mime, looks_like_video};
use pvault_core::{Category, PromptRecord, Vault};

use crate::editor::{confirm, edit_prompt, is_interactive, prompt_optional, prompt_with_default};
use crate::output::{truncate_line, Output};

/// Field values shared by `add` and `edit`
#[derive(Args, Debug, Default)]
pub struct RecordFields {
    /// Title
    #[arg(short = 'T', long)]
    title: Option<String>,
    /// Prompt text (opens editor if not provided)
    #[arg(short, long)]
    prompt: Option<String>,
    /// Negative prompt
    #[arg(short, long)]
    negative: Option<String>,
    /// Category (text-to-image, image-to-image, image-to-video, text-to-video, general)
    #[arg(short, long)]
    category: Option<Category>,
    /// Output media URL
    #[arg(short, long, conflicts_with = "output_file")]
    output: Option<String>,
    /// Embed a local image or video as the output media
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Input (source) image URL
    #[arg(short, long, conflicts_with = "input_file")]
    input: Option<String>,
    /// Embed a local image as the input media
    #[arg(long)]
    input_file: Option<PathBuf>,
    /// Model that produced the output
    #[arg(short, long)]
    model: Option<String>,
    /// Tags to add
    #[arg(short = 't', long = "tag")]
    tags: Vec<String>,
    /// Mark the output media as a video
    #[arg(long)]
    video: bool,
}

impl RecordFields {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.prompt.is_none()
            && self.negative.is_none()
            && self.category.is_none()
            && self.output.is_none()
            && self.output_file.is_none()
            && self.input.is_none()
            && self.input_file.is_none()
            && self.model.is_none()
            && self.tags.is_empty()
            && !self.video
    }
}

/// Flags that remove optional fields during `edit`
#[derive(Args, Debug, Default)]
pub struct ClearFields {
    /// Remove the negative prompt
    #[arg(long)]
    clear_negative: bool,
    /// Remove the output media
    #[arg(long, conflicts_with_all = ["output", "output_file"])]
    clear_output: bool,
    /// Remove the input media
    #[arg(long, conflicts_with_all = ["input", "input_file"])]
    clear_input: bool,
    /// Remove the model name
    #[arg(long)]
    clear_model: bool,
    /// Remove all tags before adding any given with --tag
    #[arg(long)]
    clear_tags: bool,
    /// Mark the output media as a still image
    #[arg(long, conflicts_with = "video")]
    not_video: bool,
}

impl ClearFields {
    fn is_empty(&self) -> bool {
        !(self.clear_negative
            || self.clear_output
            || self.clear_input
            || self.clear_model
            || self.clear_tags
            || self.not_video)
    }

    fn apply(&self, record: &mut PromptRecord) {
        if self.clear_negative {
            record.set_negative_prompt(None);
        }
        if self.clear_output {
            record.set_output_media(None);
            record.set_is_video(None);
        }
        if self.clear_input {
            record.set_input_media(None);
        }
        if self.clear_model {
            record.set_model_used(None);
        }
        if self.clear_tags {
            record.set_tags(Vec::new());
        }
        if self.not_video {
            record.set_is_video(Some(false));
        }
    }
}

/// Copy the given field values onto a record
///
/// Local media files are embedded as data URLs. Video detection follows
/// the media unless `--video` forces it.
fn apply_fields(record: &mut PromptRecord, fields: RecordFields) -> Result<()> {
    if let Some(title) = fields.title {
        record.set_title(title);
    }
    if let Some(prompt) = fields.prompt {
        record.set_prompt(prompt);
    }
    if let Some(negative) = fields.negative {
        record.set_negative_prompt(Some(negative));
    }
    if let Some(category) = fields.category {
        record.set_category(category);
    }
    if let Some(model) = fields.model {
        record.set_model_used(Some(model));
    }
    for tag in fields.tags {
        record.add_tag(tag);
    }

    if let Some(url) = fields.output {
        record.set_is_video(Some(looks_like_video(&url)));
        record.set_output_media(Some(url));
    }
    if let Some(path) = fields.output_file {
        let media = embed_file(&path)?;
        record.set_is_video(Some(media.is_video));
        record.set_output_media(Some(media.data_url));
    }

    if let Some(url) = fields.input {
        record.set_input_media(Some(url));
    }
    if let Some(path) = fields.input_file {
        let media = embed_file(&path)?;
        if media.is_video {
            bail!("Input media must be an image, got {}", media.mime_type);
        }
        record.set_input_media(Some(media.data_url));
    }

    if fields.video {
        record.set_is_video(Some(true));
    }

    Ok(())
}

/// Create a new prompt
pub async fn add(vault: &mut Vault, fields: RecordFields, output: &Output) -> Result<()> {
    let mut record = PromptRecord::new(fields.category.unwrap_or_default());
    apply_fields(&mut record, fields)?;

    if record.prompt.trim().is_empty() && output.should_prompt() && is_interactive() {
        if let Some(text) = edit_prompt("", record.category)? {
            record.set_prompt(text);
        }
    }

    let record = vault
        .create(record)
        .await
        .context("Failed to save prompt")?;

    output.success(&format!("Created prompt: {}", record.id));
    output.print_record(&record);

    Ok(())
}

/// List prompts, newest first
pub fn list(
    vault: &Vault,
    category: Option<Category>,
    search: Option<String>,
    output: &Output,
) -> Result<()> {
    let records = vault.query(category, search.as_deref().unwrap_or(""));
    output.print_records(&records);
    Ok(())
}

/// Show a single prompt
pub fn show(vault: &Vault, id: String, output: &Output) -> Result<()> {
    let record = vault.resolve(&id)?;
    output.print_record(record);
    Ok(())
}

/// Edit a prompt
///
/// With no field flags in an interactive terminal, walks through each field.
pub async fn edit(
    vault: &mut Vault,
    id: String,
    fields: RecordFields,
    clear: ClearFields,
    output: &Output,
) -> Result<()> {
    let mut record = vault.resolve(&id)?.clone();

    if fields.is_empty() && clear.is_empty() {
        if !output.should_prompt() || !is_interactive() {
            bail!("Nothing to change. Pass field flags (see `pvault edit --help`).");
        }
        edit_interactively(&mut record)?;
    } else {
        clear.apply(&mut record);
        apply_fields(&mut record, fields)?;
    }

    vault
        .update(record.clone())
        .await
        .context("Failed to update prompt")?;

    output.success("Prompt updated");
    output.print_record(&record);

    Ok(())
}

/// Field-by-field prompts; Enter keeps a value, "-" clears an optional one
fn edit_interactively(record: &mut PromptRecord) -> Result<()> {
    println!("Editing prompt: {}", record.id);
    println!("Press Enter to keep current value, type new value, or '-' to clear.\n");

    if let Some(title) = prompt_with_default("Title", &record.title)? {
        record.set_title(title);
    }

    println!("Prompt: {}", truncate_line(&record.prompt, 60));
    if confirm("Edit prompt text in editor?")? {
        if let Some(text) = edit_prompt(&record.prompt, record.category)? {
            record.set_prompt(text);
        }
    }

    if let Some(negative) = prompt_clearable("Negative prompt", record.negative_prompt.as_deref())? {
        record.set_negative_prompt(negative);
    }

    if let Some(category) = prompt_with_default("Category", record.category.as_str())? {
        record.set_category(category.parse()?);
    }

    if let Some(url) = prompt_clearable("Output media URL", record.output_media_url.as_deref())? {
        record.set_is_video(url.as_deref().map(looks_like_video));
        record.set_output_media(url);
    }

    if let Some(url) = prompt_clearable("Input media URL", record.input_media_url.as_deref())? {
        record.set_input_media(url);
    }

    if let Some(model) = prompt_clearable("Model", record.model_used.as_deref())? {
        record.set_model_used(model);
    }

    let current_tags = record.tags.join(", ");
    println!(
        "Current tags: {}",
        if current_tags.is_empty() {
            "(none)"
        } else {
            &current_tags
        }
    );
    if let Some(new_tags) = prompt_optional("New tags (comma-separated)")? {
        record.set_tags(parse_tag_list(&new_tags));
    }

    Ok(())
}

/// `None` keeps the value, `Some(None)` clears it
fn prompt_clearable(prompt: &str, current: Option<&str>) -> Result<Option<Option<String>>> {
    let default = match current {
        Some(value) if value.starts_with("data:") => "embedded media",
        Some(value) => value,
        None => "",
    };

    Ok(prompt_with_default(prompt, default)?.map(|answer| {
        if answer == "-" {
            None
        } else {
            Some(answer)
        }
    }))
}

fn parse_tag_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Delete a prompt
pub async fn delete(vault: &mut Vault, id: String, output: &Output) -> Result<()> {
    let record = vault.resolve(&id)?.clone();

    if output.should_prompt() {
        println!(
            "Delete prompt: {} - {}",
            record.id,
            truncate_line(&record.title, 60)
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    vault
        .delete(&record.id)
        .await
        .context("Failed to delete prompt")?;

    output.success(&format!("Deleted prompt: {}", record.id));

    Ok(())
}

/// Open a prompt's output (or input) media with the system viewer
///
/// Embedded media is written to a temp file first.
pub fn open_media(vault: &Vault, id: String, input: bool, output: &Output) -> Result<()> {
    let record = vault.resolve(&id)?;
    let (which, media) = if input {
        ("input", record.input_media_url.as_deref())
    } else {
        ("output", record.output_media_url.as_deref())
    };
    let Some(url) = media else {
        bail!("Prompt {} has no {} media", record.id, which);
    };

    let target = if url.starts_with("data:") {
        media_temp_file(&record.id, which, url)?
            .display()
            .to_string()
    } else {
        url.to_string()
    };

    open::that(&target).with_context(|| format!("Failed to open {}", target))?;
    output.success(&format!("Opened {} media for {}", which, record.id));
    Ok(())
}

fn media_temp_file(id: &str, which: &str, data_url: &str) -> Result<PathBuf> {
    let (mime, bytes) = decode_data_url(data_url)?;
    let ext = extension_for_mime(&mime).unwrap_or("bin");
    let path = std::env::temp_dir().join(format!("pvault_{}_{}.{}", id, which, ext));
    std::fs::write(&path, bytes)
        .with_context(|| format!("Failed to write media file: {:?}", path))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use pvault_core::MemoryStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    async fn vault() -> Vault {
        Vault::load(Arc::new(MemoryStore::new())).await.unwrap()
    }

    fn fields(title: &str, prompt: &str, category: Category) -> RecordFields {
        RecordFields {
            title: Some(title.to_string()),
            prompt: Some(prompt.to_string()),
            category: Some(category),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_fields_detects_video_urls() {
        let mut record = PromptRecord::with_id("1", Category::ImageToVideo);
        apply_fields(
            &mut record,
            RecordFields {
                output: Some("https://cdn.example.com/clip.webm".to_string()),
                input: Some("https://cdn.example.com/still.png".to_string()),
                tags: vec!["motion".to_string(), " loop ".to_string()],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(record.is_video, Some(true));
        assert_eq!(
            record.input_media_url.as_deref(),
            Some("https://cdn.example.com/still.png")
        );
        assert_eq!(record.tags, vec!["motion", "loop"]);
    }

    #[test]
    fn test_apply_fields_embeds_files() {
        let temp_dir = TempDir::new().unwrap();
        let image = temp_dir.path().join("result.png");
        std::fs::write(&image, b"png-bytes").unwrap();

        let mut record = PromptRecord::with_id("1", Category::TextToImage);
        apply_fields(
            &mut record,
            RecordFields {
                output_file: Some(image),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(record
            .output_media_url
            .as_deref()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(record.is_video, Some(false));
    }

    #[test]
    fn test_apply_fields_rejects_video_input() {
        let temp_dir = TempDir::new().unwrap();
        let clip = temp_dir.path().join("source.mp4");
        std::fs::write(&clip, b"mp4").unwrap();

        let mut record = PromptRecord::with_id("1", Category::ImageToVideo);
        let result = apply_fields(
            &mut record,
            RecordFields {
                input_file: Some(clip),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_clear_fields() {
        let mut record = PromptRecord::with_id("1", Category::General);
        record.set_negative_prompt(Some("blurry".to_string()));
        record.set_model_used(Some("m".to_string()));
        record.set_tags(vec!["a".to_string()]);

        ClearFields {
            clear_negative: true,
            clear_model: true,
            clear_tags: true,
            ..Default::default()
        }
        .apply(&mut record);

        assert!(record.negative_prompt.is_none());
        assert!(record.model_used.is_none());
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(parse_tag_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_tag_list(" , ").is_empty());
    }

    #[tokio::test]
    async fn test_add_edit_delete() {
        let mut vault = vault().await;
        let output = quiet();

        add(&mut vault, fields("Helper", "Answer briefly", Category::General), &output)
            .await
            .unwrap();
        let id = vault.records()[0].id.clone();

        edit(
            &mut vault,
            id.clone(),
            RecordFields {
                title: Some("Terse helper".to_string()),
                tags: vec!["llm".to_string()],
                ..Default::default()
            },
            ClearFields::default(),
            &output,
        )
        .await
        .unwrap();

        let record = vault.get(&id).unwrap();
        assert_eq!(record.title, "Terse helper");
        assert_eq!(record.prompt, "Answer briefly");
        assert_eq!(record.tags, vec!["llm"]);

        // Quiet mode never prompts, so delete goes straight through
        delete(&mut vault, id.clone(), &output).await.unwrap();
        assert!(vault.get(&id).is_none());
    }

    #[tokio::test]
    async fn test_add_requires_output_media_outside_general() {
        let mut vault = vault().await;
        let result = add(
            &mut vault,
            fields("Restyle", "make it watercolor", Category::ImageToImage),
            &quiet(),
        )
        .await;

        assert!(result.is_err());
        assert!(vault.records().is_empty());
    }

    #[tokio::test]
    async fn test_edit_without_changes_is_an_error_when_not_interactive() {
        let mut vault = vault().await;
        add(&mut vault, fields("a", "b", Category::General), &quiet())
            .await
            .unwrap();
        let id = vault.records()[0].id.clone();

        let result = edit(
            &mut vault,
            id,
            RecordFields::default(),
            ClearFields::default(),
            &quiet(),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_media_temp_file() {
        let path = media_temp_file("42", "output", "data:image/png;base64,aGVsbG8=").unwrap();
        assert!(path.display().to_string().ends_with("pvault_42_output.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_open_media_without_media() {
        let mut vault = vault().await;
        add(&mut vault, fields("a", "b", Category::General), &quiet())
            .await
            .unwrap();
        let id = vault.records()[0].id.clone();
        assert!(open_media(&vault, id, false, &quiet()).is_err());
    }

    #[tokio::test]
    async fn test_show_unknown_id() {
        let vault = vault().await;
        assert!(show(&vault, "123456".to_string(), &quiet()).is_err());
    }
}
