//! inputs.json composition against a womtool-style template.
//!
//! Template values are strings that may carry an `(optional)` or
//! `(optional, default = X)` marker; everything else is a required key.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use regex::Regex;
use serde_json::{Map, Value};

use crate::core::error::GatewayError;

fn optional_marker() -> &'static Regex {
    use std::sync::OnceLock;
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\(\s*optional(?:\s*,\s*default\s*=\s*([^)]+))?\s*\)").expect("regex")
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecKind {
    Required,
    OptionalWithDefault(Value),
    OptionalNoDefault,
}

/// Classify one template value. Defaults are coerced bool -> number ->
/// string, matching how womtool prints them.
pub fn parse_spec(spec: &str) -> SpecKind {
    let Some(caps) = optional_marker().captures(spec) else {
        return SpecKind::Required;
    };
    let Some(raw) = caps.get(1) else {
        return SpecKind::OptionalNoDefault;
    };
    let raw = raw.as_str().trim().trim_matches(|c| c == '"' || c == '\'');
    let lowered = raw.to_ascii_lowercase();
    if lowered == "true" || lowered == "false" {
        return SpecKind::OptionalWithDefault(Value::Bool(lowered == "true"));
    }
    if raw.contains('.') {
        if let Ok(f) = raw.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return SpecKind::OptionalWithDefault(Value::Number(n));
            }
        }
    } else if let Ok(i) = raw.parse::<i64>() {
        return SpecKind::OptionalWithDefault(Value::Number(i.into()));
    }
    SpecKind::OptionalWithDefault(Value::String(raw.to_string()))
}

#[derive(Debug, Default)]
pub struct Classified {
    pub required: BTreeSet<String>,
    pub with_default: BTreeMap<String, Value>,
    pub without_default: BTreeSet<String>,
}

impl Classified {
    fn template_keys(&self) -> BTreeSet<String> {
        self.required
            .iter()
            .chain(self.with_default.keys())
            .chain(self.without_default.iter())
            .cloned()
            .collect()
    }
}

/// Split template keys into required / optional-with-default /
/// optional-without-default. Non-string template values count as required.
pub fn classify(template: &Map<String, Value>) -> Classified {
    let mut out = Classified::default();
    for (key, value) in template {
        match value.as_str().map(parse_spec) {
            Some(SpecKind::OptionalWithDefault(d)) => {
                out.with_default.insert(key.clone(), d);
            }
            Some(SpecKind::OptionalNoDefault) => {
                out.without_default.insert(key.clone());
            }
            _ => {
                out.required.insert(key.clone());
            }
        }
    }
    out
}

/// Fill one sample. Returns the filled object and any rule violations
/// (missing required keys, keys the template does not know).
pub fn fill_sample(sample: &Map<String, Value>, classified: &Classified) -> (Map<String, Value>, Vec<String>) {
    let mut filled = Map::new();
    let mut errors = Vec::new();

    for key in &classified.required {
        match sample.get(key) {
            Some(v) => {
                filled.insert(key.clone(), v.clone());
            }
            None => errors.push(format!("missing required field {key}")),
        }
    }
    for (key, default) in &classified.with_default {
        filled.insert(
            key.clone(),
            sample.get(key).cloned().unwrap_or_else(|| default.clone()),
        );
    }
    // Optional without default: only written when the user supplied it.
    for key in &classified.without_default {
        if let Some(v) = sample.get(key) {
            filled.insert(key.clone(), v.clone());
        }
    }

    let known = classified.template_keys();
    let extra: Vec<&String> = sample.keys().filter(|k| !known.contains(*k)).collect();
    if !extra.is_empty() {
        let joined = extra
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        errors.push(format!("fields not present in the template: {joined}"));
    }

    (filled, errors)
}

/// Normalize the `params` argument: a single object is replicated
/// `sample_count` times, a one-element list likewise; otherwise the list
/// length must equal `sample_count`.
pub fn normalize_samples(
    params: &Value,
    sample_count: usize,
) -> Result<Vec<Map<String, Value>>, GatewayError> {
    if sample_count == 0 {
        return Err(GatewayError::InvalidParams(
            "sample_count must be >= 1".into(),
        ));
    }
    match params {
        Value::Object(one) => Ok(vec![one.clone(); sample_count]),
        Value::Array(items) => {
            let mut samples = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(m) => samples.push(m.clone()),
                    _ => {
                        return Err(GatewayError::InvalidParams(
                            "every sample in params must be an object".into(),
                        ))
                    }
                }
            }
            if samples.len() == sample_count {
                Ok(samples)
            } else if samples.len() == 1 && sample_count > 1 {
                Ok(vec![samples[0].clone(); sample_count])
            } else {
                Err(GatewayError::InvalidParams(format!(
                    "sample count mismatch: sample_count={sample_count}, but params has {} entries",
                    samples.len()
                )))
            }
        }
        _ => Err(GatewayError::InvalidParams(
            "params must be an object or a list of objects".into(),
        )),
    }
}

/// Read the template, fill every sample, collect per-sample violations.
pub fn build_inputs(
    template_path: &str,
    samples: &[Map<String, Value>],
) -> Result<(Vec<Map<String, Value>>, Vec<String>), GatewayError> {
    let raw = std::fs::read_to_string(template_path).map_err(|e| {
        GatewayError::InvalidParams(format!("cannot read template {template_path}: {e}"))
    })?;
    let template: Map<String, Value> = serde_json::from_str(&raw)
        .map_err(|e| GatewayError::InvalidParams(format!("template is not a JSON object: {e}")))?;
    let classified = classify(&template);

    let mut filled_all = Vec::with_capacity(samples.len());
    let mut all_errors = Vec::new();
    for (idx, sample) in samples.iter().enumerate() {
        let (filled, errors) = fill_sample(sample, &classified);
        if !errors.is_empty() {
            all_errors.push(format!("sample #{}:\n{}", idx + 1, errors.join("\n")));
        }
        filled_all.push(filled);
    }
    Ok((filled_all, all_errors))
}

/// Write the filled sample list as pretty JSON, creating parent directories.
pub fn write_inputs(output_path: &str, filled: &[Map<String, Value>]) -> Result<(), GatewayError> {
    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(&filled)?;
    std::fs::write(path, body)?;
    Ok(())
}
