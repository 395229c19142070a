use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model output that could not be decoded into a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DegradedResponse {
    pub raw_response: String,
    pub parsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of decoding one stage's model output.
///
/// Serializes to the bare object for structured output, or to
/// `{"raw_response", "parsed": false, "error"?}` when degraded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedResponse {
    Degraded(DegradedResponse),
    Structured(Map<String, Value>),
}

impl ParsedResponse {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub fn as_structured(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Structured(map) => Some(map),
            Self::Degraded(_) => None,
        }
    }
}

/// Decodes the span between the first `{` and the last `}` of `raw`.
///
/// Never fails: anything that does not decode is kept verbatim as a
/// [`DegradedResponse`].
pub fn parse_response(raw: &str) -> ParsedResponse {
    let span = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return ParsedResponse::Degraded(DegradedResponse {
                raw_response: raw.to_string(),
                parsed: false,
                error: None,
            })
        }
    };

    match serde_json::from_str::<Map<String, Value>>(span) {
        Ok(map) => ParsedResponse::Structured(map),
        Err(e) => ParsedResponse::Degraded(DegradedResponse {
            raw_response: raw.to_string(),
            parsed: false,
            error: Some(e.to_string()),
        }),
    }
}
