use std::path::Path;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::Result;

const DEFAULT_TEXT_PREFIX_CHARS: usize = 50;

/// Additive points awarded by the candidate file ranker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreWeights {
    /// File contains `<tag`.
    pub tag: u32,
    /// File contains the whole class attribute value.
    pub class_name: u32,
    pub id: u32,
    /// File contains the trimmed text content.
    pub text: u32,
    /// `.html` files.
    pub html_extension: u32,
    /// `.jsx` / `.tsx` files.
    pub component_extension: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            tag: 10,
            class_name: 8,
            id: 15,
            text: 5,
            html_extension: 3,
            component_extension: 2,
        }
    }
}

/// Tunables shared by the ranker and the in-file locator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoringProfile {
    name: String,
    weights: ScoreWeights,
    text_prefix_chars: usize,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            weights: ScoreWeights::default(),
            text_prefix_chars: DEFAULT_TEXT_PREFIX_CHARS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawProfile {
    name: Option<String>,
    #[serde(default)]
    weights: RawWeights,
    #[serde(default)]
    locator: RawLocator,
}

#[derive(Debug, Default, Deserialize)]
struct RawWeights {
    tag: Option<u32>,
    class_name: Option<u32>,
    id: Option<u32>,
    text: Option<u32>,
    html_extension: Option<u32>,
    component_extension: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLocator {
    text_prefix_chars: Option<usize>,
}

impl ScoringProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// How many leading characters of the trimmed text the tag+text strategy
    /// looks for.
    pub fn text_prefix_chars(&self) -> usize {
        self.text_prefix_chars
    }

    #[must_use]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Load a JSON or TOML profile. Keys that are not set keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read profile file {}", path.display()))?;
        let fallback_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "custom".to_string());
        Self::from_bytes(&fallback_name, &bytes)
    }

    pub fn from_bytes(profile_name: &str, bytes: &[u8]) -> Result<Self> {
        let raw = parse_raw(bytes).with_context(|| {
            format!("Profile '{profile_name}' is not valid JSON/TOML configuration")
        })?;
        Ok(Self::from_raw(raw, profile_name))
    }

    fn from_raw(raw: RawProfile, fallback_name: &str) -> Self {
        let defaults = ScoreWeights::default();
        let w = raw.weights;
        Self {
            name: raw.name.unwrap_or_else(|| fallback_name.to_string()),
            weights: ScoreWeights {
                tag: w.tag.unwrap_or(defaults.tag),
                class_name: w.class_name.unwrap_or(defaults.class_name),
                id: w.id.unwrap_or(defaults.id),
                text: w.text.unwrap_or(defaults.text),
                html_extension: w.html_extension.unwrap_or(defaults.html_extension),
                component_extension: w
                    .component_extension
                    .unwrap_or(defaults.component_extension),
            },
            text_prefix_chars: raw
                .locator
                .text_prefix_chars
                .unwrap_or(DEFAULT_TEXT_PREFIX_CHARS),
        }
    }
}

fn parse_raw(bytes: &[u8]) -> anyhow::Result<RawProfile> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes).map_err(|err| anyhow!("{json_err}; {err}"))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                anyhow!(
                    "Profile is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                )
            })?;
            serde_json::to_value(toml_value)
                .map_err(|err| anyhow!("Failed to convert TOML profile to JSON: {err}"))?
        }
    };

    validate_profile_value(&value)?;
    serde_json::from_value(value).map_err(|err| anyhow!("Profile parse error: {err}"))
}

fn validate_profile_value(value: &serde_json::Value) -> anyhow::Result<()> {
    fn validate_object_keys(
        unknown: &mut Vec<String>,
        obj: &serde_json::Map<String, serde_json::Value>,
        base: &str,
        allowed: &[&str],
    ) {
        for key in obj.keys() {
            if !allowed.contains(&key.as_str()) {
                if base.is_empty() {
                    unknown.push(key.clone());
                } else {
                    unknown.push(format!("{base}.{key}"));
                }
            }
        }
    }

    let serde_json::Value::Object(root) = value else {
        return Err(anyhow!("Profile config must be a JSON object"));
    };

    let mut unknown = Vec::new();
    validate_object_keys(&mut unknown, root, "", &["name", "weights", "locator"]);

    if let Some(serde_json::Value::Object(weights)) = root.get("weights") {
        validate_object_keys(
            &mut unknown,
            weights,
            "weights",
            &[
                "tag",
                "class_name",
                "id",
                "text",
                "html_extension",
                "component_extension",
            ],
        );
    }
    if let Some(serde_json::Value::Object(locator)) = root.get("locator") {
        validate_object_keys(&mut unknown, locator, "locator", &["text_prefix_chars"]);
    }

    if unknown.is_empty() {
        Ok(())
    } else {
        unknown.sort();
        Err(anyhow!("Unknown profile keys: {}", unknown.join(", ")))
    }
}
