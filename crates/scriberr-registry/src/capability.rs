//! Capability and parameter-schema descriptions an adapter publishes so the
//! registry can select and validate without knowing the adapter's backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ModelId = String;

/// Feature flags a model may or may not support, used both for display and
/// for `select_best` scoring.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Features {
    pub timestamps: bool,
    pub translation: bool,
    pub diarization: bool,
    pub longform: bool,
}

/// Coarse accuracy/latency tier, used to satisfy a caller's quality floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Draft,
    Standard,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub model_id: ModelId,
    pub model_family: String,
    pub display_name: String,
    pub supported_languages: Vec<String>,
    pub supported_formats: Vec<String>,
    pub features: Features,
    pub quality_tier: QualityTier,
    pub memory_mb: u32,
    pub requires_gpu: bool,
    /// Whether this adapter only accepts 16 kHz mono PCM16 input. Drives
    /// whether the preprocessor converts the source audio before this
    /// adapter is called (§4.3).
    #[serde(default)]
    pub requires_pcm16_mono_16k: bool,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// The shape of a single validated parameter, as exposed by an adapter's
/// `parameter_schema()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
    Enum,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    pub description: String,
}

/// What a caller is looking for when asking the registry to pick a model.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    pub language: Option<String>,
    pub features: Features,
    pub min_quality: Option<QualityTier>,
}

/// Score an adapter's capabilities against requirements per the registry's
/// documented scoring function. Returns `i64::MIN` if `is_ready` is false —
/// callers pass that in since readiness is an async check, not part of
/// [`Capabilities`].
pub fn score(caps: &Capabilities, reqs: &Requirements, is_ready: bool) -> i64 {
    if !is_ready {
        return i64::MIN;
    }
    let mut total: i64 = 0;

    if let Some(lang) = &reqs.language {
        if caps.supported_languages.iter().any(|l| l == lang) {
            total += 3;
        }
    }

    let want = &reqs.features;
    let have = &caps.features;
    if want.timestamps && have.timestamps {
        total += 1;
    }
    if want.translation && have.translation {
        total += 1;
    }
    if want.diarization && have.diarization {
        total += 1;
    }
    if want.longform && have.longform {
        total += 1;
    }

    if let Some(min) = reqs.min_quality {
        if caps.quality_tier >= min {
            total += 2;
        }
    }

    total
}

/// Validate a generic parameter map against a schema: every key the schema
/// names must match type/enum/range when present; unknown keys pass through
/// untouched, per the registry's documented validation rule.
pub fn validate_parameters(
    schema: &[ParameterSpec],
    params: &HashMap<String, serde_json::Value>,
) -> Result<(), (String, String)> {
    for spec in schema {
        let value = match params.get(&spec.name) {
            Some(v) => v,
            None => {
                if spec.required {
                    return Err((spec.name.clone(), "required parameter missing".into()));
                }
                continue;
            }
        };
        validate_one(spec, value)?;
    }
    Ok(())
}

fn validate_one(spec: &ParameterSpec, value: &serde_json::Value) -> Result<(), (String, String)> {
    let type_ok = match spec.kind {
        ParameterType::String | ParameterType::Enum => value.is_string(),
        ParameterType::Integer => value.is_i64() || value.is_u64(),
        ParameterType::Float => value.is_f64() || value.is_i64() || value.is_u64(),
        ParameterType::Boolean => value.is_boolean(),
    };
    if !type_ok {
        return Err((
            spec.name.clone(),
            format!("expected {:?}, got {value}", spec.kind),
        ));
    }

    if spec.kind == ParameterType::Enum {
        if let Some(options) = &spec.options {
            let s = value.as_str().unwrap_or_default();
            if !options.iter().any(|o| o == s) {
                return Err((
                    spec.name.clone(),
                    format!("`{s}` is not one of {options:?}"),
                ));
            }
        }
    }

    if matches!(spec.kind, ParameterType::Integer | ParameterType::Float) {
        let n = value.as_f64().unwrap_or(f64::NAN);
        if let Some(min) = spec.min {
            if n < min {
                return Err((spec.name.clone(), format!("{n} is below minimum {min}")));
            }
        }
        if let Some(max) = spec.max {
            if n > max {
                return Err((spec.name.clone(), format!("{n} is above maximum {max}")));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(langs: &[&str], features: Features, tier: QualityTier) -> Capabilities {
        Capabilities {
            model_id: "m".into(),
            model_family: "whisper".into(),
            display_name: "M".into(),
            supported_languages: langs.iter().map(|s| s.to_string()).collect(),
            supported_formats: vec!["wav".into()],
            features,
            quality_tier: tier,
            memory_mb: 512,
            requires_gpu: false,
            requires_pcm16_mono_16k: false,
            metadata: Default::default(),
        }
    }

    #[test]
    fn not_ready_scores_minimum() {
        let c = caps(&["en"], Features::default(), QualityTier::Standard);
        let r = Requirements::default();
        assert_eq!(score(&c, &r, false), i64::MIN);
    }

    #[test]
    fn language_and_feature_and_quality_add_up() {
        let c = caps(
            &["en"],
            Features {
                timestamps: true,
                diarization: true,
                ..Default::default()
            },
            QualityTier::High,
        );
        let r = Requirements {
            language: Some("en".into()),
            features: Features {
                timestamps: true,
                diarization: true,
                ..Default::default()
            },
            min_quality: Some(QualityTier::Standard),
        };
        // +3 language, +1 timestamps, +1 diarization, +2 quality
        assert_eq!(score(&c, &r, true), 7);
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let schema = vec![ParameterSpec {
            name: "temperature".into(),
            kind: ParameterType::Float,
            required: false,
            default: None,
            options: None,
            min: Some(0.0),
            max: Some(1.0),
            description: String::new(),
        }];
        let mut params = HashMap::new();
        params.insert("temperature".to_string(), serde_json::json!(1.5));
        assert!(validate_parameters(&schema, &params).is_err());
    }

    #[test]
    fn validate_allows_unknown_keys() {
        let schema: Vec<ParameterSpec> = vec![];
        let mut params = HashMap::new();
        params.insert("whatever".to_string(), serde_json::json!("x"));
        assert!(validate_parameters(&schema, &params).is_ok());
    }
}
