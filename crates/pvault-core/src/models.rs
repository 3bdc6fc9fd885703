//! Data models for pvault
//!
//! Defines the single persisted entity, `PromptRecord`, and the `Category`
//! enumeration that classifies a record's generation modality.
//! Field names serialize in camelCase so backups stay compatible with the
//! browser-era JSON format.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generation modality of a prompt
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    TextToImage,
    ImageToImage,
    ImageToVideo,
    TextToVideo,
    General,
}

impl Category {
    /// All categories, in display order
    pub const ALL: [Category; 5] = [
        Category::TextToImage,
        Category::ImageToImage,
        Category::ImageToVideo,
        Category::TextToVideo,
        Category::General,
    ];

    /// The wire name used in backups and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TextToImage => "text-to-image",
            Category::ImageToImage => "image-to-image",
            Category::ImageToVideo => "image-to-video",
            Category::TextToVideo => "text-to-video",
            Category::General => "general",
        }
    }

    /// Human-friendly label
    pub fn label(&self) -> &'static str {
        match self {
            Category::TextToImage => "Text to Image",
            Category::ImageToImage => "Image to Image",
            Category::ImageToVideo => "Image to Video",
            Category::TextToVideo => "Text to Video",
            Category::General => "General",
        }
    }

    /// Whether records in this category need generated output media
    pub fn requires_output_media(&self) -> bool {
        !matches!(self, Category::General)
    }

    /// Whether this category is conditioned on a source image
    pub fn uses_input_media(&self) -> bool {
        matches!(self, Category::ImageToImage | Category::ImageToVideo)
    }

    /// Whether the generated output is normally a video
    pub fn produces_video(&self) -> bool {
        matches!(self, Category::ImageToVideo | Category::TextToVideo)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known category
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown category '{0}'. Valid categories: text-to-image, image-to-image, image-to-video, text-to-video, general")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A saved prompt with its metadata and optional media references
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecord {
    /// Unique identifier, immutable after creation
    pub id: String,
    /// Display title
    pub title: String,
    /// The generation instruction
    pub prompt: String,
    /// Things the generator should avoid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Generation modality
    pub category: Category,
    /// Generated media (URL or inline data URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_media_url: Option<String>,
    /// Source image for image-conditioned categories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_media_url: Option<String>,
    /// Free-text label of the model that produced the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Tags, in display order
    #[serde(default)]
    pub tags: Vec<String>,
    /// True when the output media is a video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_video: Option<bool>,
}

impl PromptRecord {
    /// Create an empty record in the given category with a fresh id
    pub fn new(category: Category) -> Self {
        Self::with_id(new_record_id(), category)
    }

    /// Create an empty record with a specific id (for loading from storage)
    pub fn with_id(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            prompt: String::new(),
            negative_prompt: None,
            category,
            output_media_url: None,
            input_media_url: None,
            model_used: None,
            tags: Vec::new(),
            is_video: None,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Set the negative prompt; blank text clears it
    pub fn set_negative_prompt(&mut self, negative: Option<String>) {
        self.negative_prompt = non_blank(negative);
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    /// Set the output media reference; blank text clears it
    pub fn set_output_media(&mut self, url: Option<String>) {
        self.output_media_url = non_blank(url);
    }

    /// Set the input media reference; blank text clears it
    pub fn set_input_media(&mut self, url: Option<String>) {
        self.input_media_url = non_blank(url);
    }

    pub fn set_model_used(&mut self, model: Option<String>) {
        self.model_used = non_blank(model);
    }

    pub fn set_is_video(&mut self, is_video: Option<bool>) {
        self.is_video = is_video;
    }

    /// Add a tag (trimmed; blank and duplicate tags are ignored)
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        let tag = tag.trim();
        if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        }
    }

    /// Set all tags (replacing existing)
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags.clear();
        for tag in tags {
            self.add_tag(tag);
        }
    }

    /// Whether the output media should be treated as a video
    pub fn output_is_video(&self) -> bool {
        self.is_video.unwrap_or(false)
    }

    /// Check the fields a create or update requires
    ///
    /// Runs before the store is touched; the store itself accepts any record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingPrompt);
        }
        if self.category.requires_output_media()
            && self
                .output_media_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ValidationError::MissingOutputMedia {
                category: self.category,
            });
        }
        Ok(())
    }
}

/// A required field is missing before a create or update
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,

    #[error("Prompt text is required")]
    MissingPrompt,

    #[error("Output media is required for {category} prompts")]
    MissingOutputMedia { category: Category },
}

/// Generate a record id from the current time in milliseconds
pub fn new_record_id() -> String {
    Utc::now().timestamp_millis().to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
