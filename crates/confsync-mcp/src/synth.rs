//! Entry synthesis: canonical model → target-independent stanza.
//!
//! Adapters turn a [`SynthesizedModel`] into their native shape; everything
//! that depends on the model family is decided here.

use crate::model::{CanonicalModel, managed_display_name};

/// Id prefix of the reasoning-model family.
pub const REASONING_PREFIX: &str = "claude-";
/// Provider string written for the reasoning family.
pub const REASONING_PROVIDER: &str = "anthropic";
/// Provider string written for every other model.
pub const GENERIC_PROVIDER: &str = "generic-chat-completion-api";
pub const MAX_OUTPUT_TOKENS: u32 = 64_000;
pub const THINKING_BUDGET_TOKENS: u32 = 32_000;
pub const VERSION_SUFFIX: &str = "/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Reasoning,
    Generic,
}

impl ModelFamily {
    pub fn of(model_id: &str) -> Self {
        if model_id.starts_with(REASONING_PREFIX) {
            ModelFamily::Reasoning
        } else {
            ModelFamily::Generic
        }
    }
}

/// Which families get [`VERSION_SUFFIX`] appended to the base URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlPolicy {
    pub suffix_reasoning: bool,
    pub suffix_generic: bool,
}

impl UrlPolicy {
    fn wants_suffix(&self, family: ModelFamily) -> bool {
        match family {
            ModelFamily::Reasoning => self.suffix_reasoning,
            ModelFamily::Generic => self.suffix_generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedModel {
    pub model_id: String,
    pub display_name: String,
    pub family: ModelFamily,
    pub provider: &'static str,
    pub base_url: String,
    pub api_key: String,
    pub max_output_tokens: Option<u32>,
    /// Thinking budget for extended-reasoning variants.
    pub thinking_budget: Option<u32>,
    pub no_image_support: bool,
}

pub fn synthesize(
    model: &CanonicalModel,
    base_url: &str,
    api_key: &str,
    policy: UrlPolicy,
) -> SynthesizedModel {
    let family = ModelFamily::of(&model.id);
    let base_url = effective_base_url(base_url, policy.wants_suffix(family));
    let display_name = managed_display_name(&model.name);
    match family {
        ModelFamily::Reasoning => SynthesizedModel {
            model_id: model.id.clone(),
            display_name,
            family,
            provider: REASONING_PROVIDER,
            base_url,
            api_key: api_key.to_string(),
            max_output_tokens: Some(MAX_OUTPUT_TOKENS),
            thinking_budget: model
                .id
                .contains("thinking")
                .then_some(THINKING_BUDGET_TOKENS),
            no_image_support: false,
        },
        ModelFamily::Generic => SynthesizedModel {
            model_id: model.id.clone(),
            display_name,
            family,
            provider: GENERIC_PROVIDER,
            base_url,
            api_key: api_key.to_string(),
            max_output_tokens: None,
            thinking_budget: None,
            no_image_support: !model.id.contains("image"),
        },
    }
}

fn effective_base_url(base_url: &str, suffix: bool) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if suffix && !trimmed.ends_with(VERSION_SUFFIX) {
        format!("{trimmed}{VERSION_SUFFIX}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, name: &str) -> CanonicalModel {
        CanonicalModel {
            id: id.into(),
            name: name.into(),
            group: "g".into(),
        }
    }

    const GENERIC_ONLY: UrlPolicy = UrlPolicy {
        suffix_reasoning: false,
        suffix_generic: true,
    };

    #[test]
    fn reasoning_thinking_variant_gets_budget() {
        let s = synthesize(
            &model("claude-opus-4-5-thinking", "Claude Opus 4.5 Thinking"),
            "http://127.0.0.1:8045/",
            "sk-1",
            GENERIC_ONLY,
        );
        assert_eq!(s.provider, REASONING_PROVIDER);
        assert_eq!(s.max_output_tokens, Some(MAX_OUTPUT_TOKENS));
        assert_eq!(s.thinking_budget, Some(THINKING_BUDGET_TOKENS));
        assert_eq!(s.base_url, "http://127.0.0.1:8045");
        assert_eq!(s.display_name, "AG-Claude Opus 4.5 Thinking");
        assert!(!s.no_image_support);
    }

    #[test]
    fn reasoning_plain_variant_has_no_thinking() {
        let s = synthesize(
            &model("claude-sonnet-4-5", "Claude Sonnet 4.5"),
            "http://h",
            "k",
            GENERIC_ONLY,
        );
        assert_eq!(s.family, ModelFamily::Reasoning);
        assert_eq!(s.thinking_budget, None);
    }

    #[test]
    fn generic_gets_suffix_and_image_flag() {
        let s = synthesize(
            &model("gemini-3-pro", "Gemini 3 Pro"),
            "http://h:1//",
            "k",
            GENERIC_ONLY,
        );
        assert_eq!(s.provider, GENERIC_PROVIDER);
        assert_eq!(s.base_url, "http://h:1/v1");
        assert!(s.no_image_support);
        assert_eq!(s.max_output_tokens, None);

        let img = synthesize(
            &model("gemini-3-pro-image", "Gemini 3 Pro Image"),
            "http://h:1/v1",
            "k",
            GENERIC_ONLY,
        );
        assert_eq!(img.base_url, "http://h:1/v1");
        assert!(!img.no_image_support);
    }

    #[test]
    fn invalid_base_url_passes_through() {
        let s = synthesize(&model("x", "X"), "not a url", "k", UrlPolicy::default());
        assert_eq!(s.base_url, "not a url");
    }
}
