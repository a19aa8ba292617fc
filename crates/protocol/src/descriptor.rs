use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound on the captured `textContent` prefix.
pub const TEXT_CONTENT_MAX_CHARS: usize = 100;

/// Normalized facts about a clicked DOM element.
///
/// Deserialization accepts both the flat shape (`sourceFileHint`,
/// `generatedLine`, `generatedColumn`) and the capture payload sent by the
/// browser extension (`sourceMap.{sourceFile,line,column}`, `pageInfo.sourceFile`).
/// Every deserialized value is normalized: the tag is lower-cased, blank
/// optional strings become `None`, the text is cut to [`TEXT_CONTENT_MAX_CHARS`]
/// and zero coordinates are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawElementDescriptor", rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub text_content: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_column: Option<u32>,
}

impl ElementDescriptor {
    pub fn new(tag_name: impl AsRef<str>) -> Self {
        Self {
            tag_name: normalize_tag(tag_name.as_ref()),
            id: None,
            class_name: None,
            text_content: String::new(),
            attributes: BTreeMap::new(),
            source_file_hint: None,
            generated_line: None,
            generated_column: None,
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = non_blank(Some(id.into()));
        self
    }

    #[must_use]
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = non_blank(Some(class_name.into()));
        self
    }

    #[must_use]
    pub fn text_content(mut self, text: impl AsRef<str>) -> Self {
        self.text_content = truncate_chars(text.as_ref(), TEXT_CONTENT_MAX_CHARS);
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn source_file_hint(mut self, hint: impl Into<String>) -> Self {
        self.source_file_hint = non_blank(Some(hint.into()));
        self
    }

    #[must_use]
    pub fn generated_position(mut self, line: u32, column: u32) -> Self {
        self.generated_line = positive(Some(line));
        self.generated_column = positive(Some(column));
        self
    }

    /// Class tokens in declaration order, empty tokens skipped.
    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.class_name
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
    }

    pub fn trimmed_text(&self) -> &str {
        self.text_content.trim()
    }

    /// `<tag` literal used by both the ranker and the locator.
    pub fn tag_needle(&self) -> Option<String> {
        (!self.tag_name.is_empty()).then(|| format!("<{}", self.tag_name))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElementDescriptor {
    tag_name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    text_content: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default, alias = "sourceFile")]
    source_file_hint: Option<String>,
    #[serde(default, alias = "line")]
    generated_line: Option<u32>,
    #[serde(default, alias = "column")]
    generated_column: Option<u32>,
    #[serde(default)]
    source_map: Option<RawSourceMapInfo>,
    #[serde(default)]
    page_info: Option<RawPageInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMapInfo {
    #[serde(default)]
    source_file: Option<String>,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageInfo {
    #[serde(default)]
    source_file: Option<String>,
}

impl From<RawElementDescriptor> for ElementDescriptor {
    fn from(raw: RawElementDescriptor) -> Self {
        let source_map = raw.source_map.unwrap_or_default();
        let page_info = raw.page_info.unwrap_or_default();

        let source_file_hint = non_blank(raw.source_file_hint)
            .or_else(|| non_blank(source_map.source_file))
            .or_else(|| non_blank(page_info.source_file));

        Self {
            tag_name: normalize_tag(&raw.tag_name),
            id: non_blank(raw.id),
            class_name: non_blank(raw.class_name),
            text_content: truncate_chars(
                raw.text_content.as_deref().unwrap_or_default(),
                TEXT_CONTENT_MAX_CHARS,
            ),
            attributes: raw.attributes,
            source_file_hint,
            generated_line: positive(raw.generated_line).or_else(|| positive(source_map.line)),
            generated_column: positive(raw.generated_column)
                .or_else(|| positive(source_map.column)),
        }
    }
}

fn normalize_tag(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn positive(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flat_payload_is_normalized() {
        let descriptor: ElementDescriptor = serde_json::from_str(
            r#"{"tagName":"BUTTON","id":"","className":"btn primary","textContent":"Send",
                "sourceFileHint":"app.js","generatedLine":40,"generatedColumn":3}"#,
        )
        .unwrap();

        assert_eq!(descriptor.tag_name, "button");
        assert_eq!(descriptor.id, None);
        assert_eq!(descriptor.class_tokens().collect::<Vec<_>>(), vec!["btn", "primary"]);
        assert_eq!(descriptor.source_file_hint.as_deref(), Some("app.js"));
        assert_eq!(descriptor.generated_line, Some(40));
        assert_eq!(descriptor.generated_column, Some(3));
    }

    #[test]
    fn capture_payload_fills_source_hint() {
        let descriptor: ElementDescriptor = serde_json::from_str(
            r#"{"tagName":"div","className":"card","textContent":"hi",
                "attributes":{"data-x":"1"},
                "position":{"x":1,"y":2,"width":3,"height":4},
                "sourceMap":{"hasSourceMap":true,"sourceFile":"bundle.js","line":null,"column":null},
                "pageInfo":{"url":"http://localhost:5173/","sourceFile":"index.html"},
                "timestamp":1700000000000}"#,
        )
        .unwrap();

        assert_eq!(descriptor.source_file_hint.as_deref(), Some("bundle.js"));
        assert_eq!(descriptor.generated_line, None);
        assert_eq!(descriptor.attributes.get("data-x").map(String::as_str), Some("1"));
    }

    #[test]
    fn page_info_is_last_resort_hint() {
        let descriptor: ElementDescriptor = serde_json::from_str(
            r#"{"tagName":"p","pageInfo":{"sourceFile":"index.html"}}"#,
        )
        .unwrap();
        assert_eq!(descriptor.source_file_hint.as_deref(), Some("index.html"));
        assert_eq!(descriptor.text_content, "");
    }

    #[test]
    fn tag_name_is_required() {
        let err = serde_json::from_str::<ElementDescriptor>(r#"{"id":"x"}"#).unwrap_err();
        assert!(err.to_string().contains("tagName"), "{err}");
    }

    #[test]
    fn text_is_cut_on_char_boundary() {
        let long = "é".repeat(150);
        let descriptor = ElementDescriptor::new("span").text_content(&long);
        assert_eq!(descriptor.text_content.chars().count(), TEXT_CONTENT_MAX_CHARS);
    }

    #[test]
    fn zero_coordinates_are_dropped() {
        let descriptor = ElementDescriptor::new("a").generated_position(0, 7);
        assert_eq!(descriptor.generated_line, None);
        assert_eq!(descriptor.generated_column, Some(7));
    }

    #[test]
    fn serialized_form_round_trips_through_normalization() {
        let descriptor = ElementDescriptor::new("button")
            .id("submit-btn")
            .source_file_hint("app.js")
            .generated_position(40, 3);
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["tagName"], "button");
        assert_eq!(json["sourceFileHint"], "app.js");
        assert!(json.get("className").is_none());

        let back: ElementDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, descriptor);
    }
}
