//! Canonical generation parameters, task states, and fan-out validation.
//!
//! Every provider speaks its own dialect; the types here are the single
//! provider-agnostic vocabulary the rest of the workspace is written in.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum prompt length in characters (not bytes).
pub const MAX_PROMPT_CHARS: usize = 10_000;
/// Maximum number of distinct providers in one fan-out request.
pub const MAX_PROVIDERS: usize = 4;
/// Maximum number of tasks submitted to a single provider per request.
pub const MAX_COUNT_PER_PROVIDER: u32 = 4;

/// Reason recorded when a provider reports failure without a message.
pub const FAILURE_PLACEHOLDER: &str = "Generation failed";

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// The four image-generation providers the orchestrator can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    NanoBanana,
    Seedream,
    Imagen,
    GptImage,
}

impl Provider {
    /// Every provider, in display order.
    pub const ALL: [Provider; 4] = [
        Provider::NanoBanana,
        Provider::Seedream,
        Provider::Imagen,
        Provider::GptImage,
    ];

    /// Stable name stored in the database and used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::NanoBanana => "nano-banana",
            Self::Seedream => "seedream",
            Self::Imagen => "imagen",
            Self::GptImage => "gpt-image",
        }
    }

    /// Parse from the database `provider` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown provider '{name}'")))
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Output parameters
// ---------------------------------------------------------------------------

/// Requested aspect ratio of the generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 7] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
    ];

    /// The `W:H` form most providers accept.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait2x3 => "2:3",
            Self::Landscape3x2 => "3:2",
            Self::Portrait3x4 => "3:4",
            Self::Landscape4x3 => "4:3",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
        }
    }

    /// Parse from the database `aspect_ratio` column.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown aspect ratio '{name}'")))
    }

    /// Width and height terms of the ratio.
    pub fn terms(self) -> (u32, u32) {
        match self {
            Self::Square => (1, 1),
            Self::Portrait2x3 => (2, 3),
            Self::Landscape3x2 => (3, 2),
            Self::Portrait3x4 => (3, 4),
            Self::Landscape4x3 => (4, 3),
            Self::Portrait9x16 => (9, 16),
            Self::Landscape16x9 => (16, 9),
        }
    }
}

/// Requested output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::OneK, Resolution::TwoK, Resolution::FourK];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown resolution '{name}'")))
    }

    /// Pixel length of the image's longer edge.
    pub fn long_edge_px(self) -> u32 {
        match self {
            Self::OneK => 1024,
            Self::TwoK => 2048,
            Self::FourK => 4096,
        }
    }
}

/// Requested image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Png, OutputFormat::Jpeg, OutputFormat::Webp];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| CoreError::Validation(format!("Unknown output format '{name}'")))
    }

    /// MIME type used when the provider's download omits `Content-Type`.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// File extension for storage keys.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Compute a `WIDTHxHEIGHT` size string for providers that take a single
/// combined size instead of aspect ratio and resolution.
///
/// The long edge is the resolution's pixel length; the short edge is scaled
/// by the ratio and rounded to a multiple of 16.
pub fn combined_size(aspect_ratio: AspectRatio, resolution: Resolution) -> String {
    let (w, h) = aspect_ratio.terms();
    let long = resolution.long_edge_px();
    let short = |num: u32, den: u32| -> u32 {
        let exact = long as f64 * num as f64 / den as f64;
        ((exact / 16.0).round() as u32) * 16
    };
    let (width, height) = if w >= h {
        (long, short(h, w))
    } else {
        (short(w, h), long)
    };
    format!("{width}x{height}")
}

// ---------------------------------------------------------------------------
// Canonical task state
// ---------------------------------------------------------------------------

/// Provider-agnostic lifecycle stage of a generation task.
///
/// Transitions only move forward: Queued -> Processing -> {Succeeded | Failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Processing => 1,
            Self::Succeeded | Self::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// Staying in place is not a transition; terminal states accept nothing.
    pub fn can_advance_to(self, next: TaskState) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Canonical parameters for one provider submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub provider: Provider,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub output_format: OutputFormat,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a prompt is non-blank and at most [`MAX_PROMPT_CHARS`].
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(CoreError::Validation(format!(
            "Prompt is {chars} characters; the maximum is {MAX_PROMPT_CHARS}"
        )));
    }
    Ok(())
}

/// Validate a fan-out request shape: 1–4 distinct providers, 1–4 tasks each.
pub fn validate_fan_out(providers: &[Provider], count_per_provider: u32) -> Result<(), CoreError> {
    if providers.is_empty() || providers.len() > MAX_PROVIDERS {
        return Err(CoreError::Validation(format!(
            "Between 1 and {MAX_PROVIDERS} providers are required, got {}",
            providers.len()
        )));
    }
    for (i, p) in providers.iter().enumerate() {
        if providers[..i].contains(p) {
            return Err(CoreError::Validation(format!("Provider '{p}' listed more than once")));
        }
    }
    if count_per_provider == 0 || count_per_provider > MAX_COUNT_PER_PROVIDER {
        return Err(CoreError::Validation(format!(
            "count_per_provider must be between 1 and {MAX_COUNT_PER_PROVIDER}, got {count_per_provider}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Prompt variations
// ---------------------------------------------------------------------------

/// Hints appended to each prompt when more than one image is requested from
/// the same provider. They nudge the model toward different outputs; they do
/// not guarantee distinct results.
pub const VARIATION_HINTS: [&str; MAX_COUNT_PER_PROVIDER as usize] = [
    "classic centered composition",
    "dynamic angle with dramatic lighting",
    "alternate color palette",
    "close-up with detailed background",
];

/// Decorate `prompt` for the `index`-th (0-based) of `count` submissions.
///
/// Returns the prompt unchanged when `count <= 1`.
pub fn decorate_prompt(prompt: &str, index: u32, count: u32) -> String {
    if count <= 1 {
        return prompt.to_string();
    }
    let hint = VARIATION_HINTS[index as usize % VARIATION_HINTS.len()];
    format!("{prompt}\n\n(Variation {} of {count}: {hint})", index + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
