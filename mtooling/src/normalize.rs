//! Response Normalizer: turns a raw tool response into the answer handed back
//! to the model.
//!
//! ```rust
//! use mtooling::{NormalizeLimits, ResponseNormalizer, ResponseShape};
//! use serde_json::json;
//!
//! let shape = ResponseShape::parse("result.content[0].text").expect("valid path");
//! let normalizer = ResponseNormalizer::new(NormalizeLimits::default());
//! let raw = json!({"result": {"content": [{"text": "{\"hits\":3}"}]}});
//!
//! let answer = normalizer.normalize(&shape, &raw).expect("answer");
//! assert_eq!(answer.value, json!({"hits": 3}));
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use mconfig::{ConfigError, ResponseFormatConfig, ResponseLimits};
use serde_json::Value;

use crate::{ToolError, ToolErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Dotted path with optional `[index]` suffixes, e.g. `result.content[0].text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl ExtractionPath {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| {
            ConfigError::invalid(format!("extraction path '{raw}' is invalid: {reason}"))
        };

        if raw.trim().is_empty() {
            return Err(invalid("path is empty"));
        }

        let mut segments = Vec::new();
        for part in raw.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(open) => part.split_at(open),
                None => (part, ""),
            };

            if key.is_empty() && (rest.is_empty() || segments.is_empty()) {
                return Err(invalid("empty key"));
            }
            if !key.is_empty() {
                segments.push(PathSegment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let Some(body) = rest.strip_prefix('[') else {
                    return Err(invalid("expected '['"));
                };
                let Some(close) = body.find(']') else {
                    return Err(invalid("unclosed '['"));
                };
                let index = body[..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("index must be a non-negative integer"))?;
                segments.push(PathSegment::Index(index));
                rest = &body[close + 1..];
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn resolve<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                PathSegment::Key(key) => current.get(key.as_str()),
                PathSegment::Index(index) => current.get(*index),
            })
    }
}

impl FromStr for ExtractionPath {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Display for ExtractionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Per-tool response handling, compiled from a `response_format` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseShape {
    pub extraction_path: ExtractionPath,
    pub parse_json: bool,
    pub error_field: Option<ExtractionPath>,
    pub fail_on_truncation: bool,
    pub treat_empty_as_no_results: bool,
}

impl ResponseShape {
    /// Shape with the documented defaults and the given extraction path.
    pub fn parse(extraction_path: &str) -> Result<Self, ConfigError> {
        Self::from_config(&ResponseFormatConfig {
            extraction_path: extraction_path.to_string(),
            ..ResponseFormatConfig::default()
        })
    }

    pub fn from_config(config: &ResponseFormatConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            extraction_path: ExtractionPath::parse(&config.extraction_path)?,
            parse_json: config.parse_json,
            error_field: config
                .error_field
                .as_deref()
                .map(ExtractionPath::parse)
                .transpose()?,
            fail_on_truncation: config.fail_on_truncation,
            treat_empty_as_no_results: config.treat_empty_as_no_results,
        })
    }

    /// The error a response body reports through `error_field`, if any.
    pub fn reported_error(&self, raw: &Value) -> Option<ToolError> {
        let reported = self.error_field.as_ref()?.resolve(raw)?;
        (!reported.is_null()).then(|| classify_remote_error(reported))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeLimits {
    pub max_response_length: usize,
    pub max_search_results: usize,
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self::from_config(&ResponseLimits::default())
    }
}

impl NormalizeLimits {
    pub fn from_config(limits: &ResponseLimits) -> Self {
        Self {
            max_response_length: limits.max_response_length,
            max_search_results: limits.max_search_results_per_call,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnswer {
    pub value: Value,
    /// Set when the value was shortened to fit the response limits.
    pub truncated: bool,
}

impl NormalizedAnswer {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            truncated: false,
        }
    }

    /// Text handed back to the model: strings verbatim, anything else as JSON.
    pub fn text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseNormalizer {
    limits: NormalizeLimits,
}

impl ResponseNormalizer {
    pub fn new(limits: NormalizeLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> NormalizeLimits {
        self.limits
    }

    pub fn normalize(
        &self,
        shape: &ResponseShape,
        raw: &Value,
    ) -> Result<NormalizedAnswer, ToolError> {
        if let Some(error) = shape.reported_error(raw) {
            return Err(error);
        }

        let extracted = shape.extraction_path.resolve(raw).ok_or_else(|| {
            ToolError::shape_mismatch(format!(
                "response has no value at '{}'",
                shape.extraction_path
            ))
        })?;

        let value = match extracted {
            Value::String(text) if shape.parse_json => {
                serde_json::from_str::<Value>(text).unwrap_or_else(|_| extracted.clone())
            }
            other => other.clone(),
        };

        if shape.treat_empty_as_no_results && is_empty(&value) {
            return Err(ToolError::no_results("tool returned an empty result"));
        }

        let mut answer = NormalizedAnswer::new(value);
        self.cap_results(&mut answer);
        self.cap_length(&mut answer);

        if answer.truncated && shape.fail_on_truncation {
            return Err(ToolError::truncated(format!(
                "response exceeded the configured limits ({} results, {} characters)",
                self.limits.max_search_results, self.limits.max_response_length
            )));
        }

        Ok(answer)
    }

    fn cap_results(&self, answer: &mut NormalizedAnswer) {
        let max = self.limits.max_search_results;
        let cap = |items: &mut Vec<Value>| {
            if items.len() > max {
                items.truncate(max);
                true
            } else {
                false
            }
        };

        let cut = match &mut answer.value {
            Value::Array(items) => cap(items),
            Value::Object(members) => members
                .values_mut()
                .filter_map(|member| member.as_array_mut())
                .fold(false, |cut, items| cap(items) || cut),
            _ => false,
        };
        answer.truncated |= cut;
    }

    fn cap_length(&self, answer: &mut NormalizedAnswer) {
        let max = self.limits.max_response_length;
        let shortened = match &answer.value {
            Value::String(text) if text.chars().count() > max => {
                Some(text.chars().take(max).collect::<String>())
            }
            Value::String(_) => None,
            other => {
                let rendered = other.to_string();
                (rendered.chars().count() > max).then(|| rendered.chars().take(max).collect())
            }
        };

        if let Some(text) = shortened {
            answer.value = Value::String(text);
            answer.truncated = true;
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Maps a tool-reported error body onto the error taxonomy. The remote
/// `message` member is never copied into the result.
fn classify_remote_error(reported: &Value) -> ToolError {
    let member = |name: &str| reported.get(name).filter(|value| !value.is_null());

    let from_code = member("code").and_then(|code| {
        let numeric = code
            .as_i64()
            .or_else(|| code.as_str().and_then(|text| text.parse().ok()))?;
        Some((kind_for_status(numeric), format!("code {numeric}")))
    });

    let from_label = ["category", "type"].into_iter().find_map(|name| {
        let label = member(name)?.as_str()?;
        ToolErrorKind::from_category(label).map(|kind| (kind, format!("{name} '{label}'")))
    });

    let from_bare = reported
        .as_str()
        .and_then(ToolErrorKind::from_category)
        .map(|kind| (kind, kind.category().to_string()));

    let (kind, detail) = from_label
        .or(from_code)
        .or(from_bare)
        .unwrap_or((ToolErrorKind::Remote, "unclassified".to_string()));

    ToolError::of_kind(kind, format!("tool reported an error ({detail})"))
}

fn kind_for_status(code: i64) -> ToolErrorKind {
    match code {
        401 => ToolErrorKind::Unauthenticated,
        403 => ToolErrorKind::Forbidden,
        404 => ToolErrorKind::NoResults,
        408 | 504 => ToolErrorKind::Timeout,
        429 => ToolErrorKind::Throttled,
        500..=599 => ToolErrorKind::Connection,
        _ => ToolErrorKind::Remote,
    }
}
