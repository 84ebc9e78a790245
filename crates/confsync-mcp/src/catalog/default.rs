use crate::model::CanonicalModel;

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8045";

pub fn default_models() -> Vec<CanonicalModel> {
    let mk = |id: &str, name: &str, group: &str| CanonicalModel {
        id: id.to_string(),
        name: name.to_string(),
        group: group.to_string(),
    };
    vec![
        mk("claude-sonnet-4-5", "Claude Sonnet 4.5", "Claude"),
        mk("claude-sonnet-4-5-thinking", "Claude Sonnet 4.5 Thinking", "Claude"),
        mk("claude-opus-4-5-thinking", "Claude Opus 4.5 Thinking", "Claude"),
        mk("gemini-3-pro-high", "Gemini 3 Pro High", "Gemini"),
        mk("gemini-3-pro-low", "Gemini 3 Pro Low", "Gemini"),
        mk("gemini-3-flash", "Gemini 3 Flash", "Gemini"),
        mk("gemini-2.5-flash", "Gemini 2.5 Flash", "Gemini"),
        mk("gemini-3-pro-image", "Gemini 3 Pro Image", "Gemini"),
        mk("gpt-oss-120b-medium", "GPT-OSS 120B Medium", "Other"),
    ]
}
