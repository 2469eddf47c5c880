//! Per-provider adapter table.
//!
//! Each provider differs in endpoint, body nesting, and the names it uses for
//! the same canonical parameter. [`spec_for`] selects the entry for a
//! [`Provider`]; callers never branch on the provider themselves.

use forge_core::generation::{
    combined_size, AspectRatio, GenerationParams, Provider,
};
use serde_json::{json, Value};

use crate::status::Vocabulary;

/// Path of the shared jobs submission endpoint.
pub const JOBS_SUBMIT_PATH: &str = "/api/v1/jobs/createTask";
/// Path of the shared jobs status endpoint.
pub const JOBS_STATUS_PATH: &str = "/api/v1/jobs/recordInfo";
/// Path of the record-style submission endpoint.
pub const RECORD_SUBMIT_PATH: &str = "/api/v1/gpt4o-image/generate";
/// Path of the record-style status endpoint.
pub const RECORD_STATUS_PATH: &str = "/api/v1/gpt4o-image/record-info";

/// JSON pointer to the task id in every submission response.
const TASK_ID_POINTER: &str = "/data/taskId";

/// How to talk to one provider.
pub struct ProviderSpec {
    pub provider: Provider,
    /// Path (relative to the configured base URL) of the submission call.
    pub submit_path: &'static str,
    /// Path of the status call; the task id goes in the `taskId` query param.
    pub status_path: &'static str,
    /// JSON pointer to the external task id in the submission response.
    pub task_id_pointer: &'static str,
    pub vocabulary: Vocabulary,
    build_body: fn(&GenerationParams) -> Value,
}

impl ProviderSpec {
    /// Build the submission body for `params`.
    pub fn body(&self, params: &GenerationParams) -> Value {
        (self.build_body)(params)
    }
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("provider", &self.provider)
            .field("submit_path", &self.submit_path)
            .field("status_path", &self.status_path)
            .field("vocabulary", &self.vocabulary)
            .finish()
    }
}

static ADAPTERS: [ProviderSpec; 4] = [
    ProviderSpec {
        provider: Provider::NanoBanana,
        submit_path: JOBS_SUBMIT_PATH,
        status_path: JOBS_STATUS_PATH,
        task_id_pointer: TASK_ID_POINTER,
        vocabulary: Vocabulary::Jobs,
        build_body: nano_banana_body,
    },
    ProviderSpec {
        provider: Provider::Seedream,
        submit_path: JOBS_SUBMIT_PATH,
        status_path: JOBS_STATUS_PATH,
        task_id_pointer: TASK_ID_POINTER,
        vocabulary: Vocabulary::Jobs,
        build_body: seedream_body,
    },
    ProviderSpec {
        provider: Provider::Imagen,
        submit_path: JOBS_SUBMIT_PATH,
        status_path: JOBS_STATUS_PATH,
        task_id_pointer: TASK_ID_POINTER,
        vocabulary: Vocabulary::Jobs,
        build_body: imagen_body,
    },
    ProviderSpec {
        provider: Provider::GptImage,
        submit_path: RECORD_SUBMIT_PATH,
        status_path: RECORD_STATUS_PATH,
        task_id_pointer: TASK_ID_POINTER,
        vocabulary: Vocabulary::Record,
        build_body: gpt_image_body,
    },
];

/// The adapter entry for `provider`.
pub fn spec_for(provider: Provider) -> &'static ProviderSpec {
    match provider {
        Provider::NanoBanana => &ADAPTERS[0],
        Provider::Seedream => &ADAPTERS[1],
        Provider::Imagen => &ADAPTERS[2],
        Provider::GptImage => &ADAPTERS[3],
    }
}

// ---------------------------------------------------------------------------
// Body builders
// ---------------------------------------------------------------------------

fn nano_banana_body(params: &GenerationParams) -> Value {
    json!({
        "model": "google/nano-banana",
        "input": {
            "prompt": params.prompt,
            "image_size": params.aspect_ratio.as_str(),
            "output_format": params.output_format.as_str(),
        },
    })
}

fn seedream_body(params: &GenerationParams) -> Value {
    json!({
        "model": "bytedance/seedream-v4-text-to-image",
        "input": {
            "prompt": params.prompt,
            "image_size": seedream_image_size(params.aspect_ratio),
            "image_resolution": params.resolution.as_str(),
        },
    })
}

fn imagen_body(params: &GenerationParams) -> Value {
    json!({
        "model": "google/imagen4",
        "input": {
            "prompt": params.prompt,
            "aspect_ratio": params.aspect_ratio.as_str(),
            "output_format": params.output_format.as_str(),
        },
    })
}

fn gpt_image_body(params: &GenerationParams) -> Value {
    json!({
        "prompt": params.prompt,
        "size": combined_size(params.aspect_ratio, params.resolution),
        "nVariants": 1,
    })
}

/// Seedream names its sizes instead of taking a ratio.
fn seedream_image_size(aspect_ratio: AspectRatio) -> &'static str {
    match aspect_ratio {
        AspectRatio::Square => "square_hd",
        AspectRatio::Portrait2x3 => "portrait_3_2",
        AspectRatio::Landscape3x2 => "landscape_3_2",
        AspectRatio::Portrait3x4 => "portrait_4_3",
        AspectRatio::Landscape4x3 => "landscape_4_3",
        AspectRatio::Portrait9x16 => "portrait_16_9",
        AspectRatio::Landscape16x9 => "landscape_16_9",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::generation::{OutputFormat, Resolution};

    fn params(provider: Provider) -> GenerationParams {
        GenerationParams {
            prompt: "a red fox".to_string(),
            provider,
            aspect_ratio: AspectRatio::Landscape16x9,
            resolution: Resolution::TwoK,
            output_format: OutputFormat::Jpeg,
        }
    }

    #[test]
    fn table_entry_matches_requested_provider() {
        for provider in Provider::ALL {
            assert_eq!(spec_for(provider).provider, provider);
            assert_eq!(spec_for(provider).vocabulary, Vocabulary::of(provider));
        }
    }

    #[test]
    fn nano_banana_nests_input() {
        let body = spec_for(Provider::NanoBanana).body(&params(Provider::NanoBanana));
        assert_eq!(body["model"], "google/nano-banana");
        assert_eq!(body["input"]["prompt"], "a red fox");
        assert_eq!(body["input"]["image_size"], "16:9");
        assert_eq!(body["input"]["output_format"], "jpeg");
    }

    #[test]
    fn seedream_uses_named_size_and_resolution() {
        let body = spec_for(Provider::Seedream).body(&params(Provider::Seedream));
        assert_eq!(body["input"]["image_size"], "landscape_16_9");
        assert_eq!(body["input"]["image_resolution"], "2K");
        assert!(body["input"].get("output_format").is_none());
    }

    #[test]
    fn imagen_uses_aspect_ratio_key() {
        let body = spec_for(Provider::Imagen).body(&params(Provider::Imagen));
        assert_eq!(body["model"], "google/imagen4");
        assert_eq!(body["input"]["aspect_ratio"], "16:9");
    }

    #[test]
    fn gpt_image_body_is_flat() {
        let spec = spec_for(Provider::GptImage);
        let body = spec.body(&params(Provider::GptImage));
        assert!(body.get("input").is_none());
        assert_eq!(body["prompt"], "a red fox");
        assert_eq!(body["size"], "2048x1152");
        assert_eq!(body["nVariants"], 1);
        assert_eq!(spec.submit_path, RECORD_SUBMIT_PATH);
    }
}
