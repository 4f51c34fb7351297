//! Default context limits for known model families.
//!
//! Provides a static map from model type tags to context window sizes,
//! used by the chains to budget how much history one request may carry.

/// Returns the default context limit (in tokens) for a model type tag.
///
/// Uses prefix matching against known model families. Unknown models
/// return 4096 as a conservative default.
pub fn default_context_limit(model_type: &str) -> usize {
    // Claude family
    if model_type.starts_with("claude") {
        return 100_000;
    }
    // GPT-4 32k context variant
    if model_type.starts_with("gpt-4-32k") {
        return 32_768;
    }
    // GPT-4
    if model_type.starts_with("gpt-4") {
        return 8_192;
    }
    // GPT-3.5 16k context variant
    if model_type.starts_with("gpt-3.5-turbo-16k") {
        return 16_384;
    }
    // GPT-3.5
    if model_type.starts_with("gpt-3.5") {
        return 4_096;
    }
    // Legacy completion models
    if model_type.starts_with("text-davinci") {
        return 4_097;
    }
    if model_type.starts_with("text-curie")
        || model_type.starts_with("text-babbage")
        || model_type.starts_with("text-ada")
    {
        return 2_048;
    }
    // Unknown model, conservative default
    4_096
}
