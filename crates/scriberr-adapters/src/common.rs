//! Shared plumbing used by every concrete adapter: parameter extraction
//! helpers and the local-subprocess-adapter conversion from
//! [`scriberr_worker::SubprocessError`] into [`ScriberrError`].

use std::collections::HashMap;

use scriberr_types::ScriberrError;
use scriberr_worker::SubprocessError;

pub fn get_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn get_u32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<u32> {
    params.get(key).and_then(|v| v.as_u64()).map(|v| v as u32)
}

pub fn get_bool(params: &HashMap<String, serde_json::Value>, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Map a subprocess failure onto the shared error taxonomy. A cancellation
/// becomes `Canceled`; everything else becomes `AdapterRuntime`.
pub fn map_subprocess_error(err: SubprocessError) -> ScriberrError {
    match err {
        SubprocessError::Cancelled => ScriberrError::Canceled,
        SubprocessError::NonZeroExit { stderr_tail, .. } => {
            ScriberrError::AdapterRuntime { stderr: stderr_tail }
        }
        other => ScriberrError::AdapterRuntime {
            stderr: other.to_string(),
        },
    }
}

/// Reject any language other than the ones a monolingual adapter supports.
pub fn reject_unsupported_language(
    params: &HashMap<String, serde_json::Value>,
    supported: &[&str],
) -> Result<(), ScriberrError> {
    if let Some(lang) = get_str(params, "language") {
        if !supported.iter().any(|s| *s == lang) {
            return Err(ScriberrError::invalid(
                "language",
                format!("unsupported language `{lang}`, expected one of {supported:?}"),
            ));
        }
    }
    Ok(())
}
