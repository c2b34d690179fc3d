use serde::{Deserialize, Serialize};

use crate::highlight::HighlightSegment;
use crate::providers::ProviderUsage;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ServerRequest {
    pub(crate) text: Option<String>,
    pub(crate) lang: Option<String>,
    pub(crate) tone: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) key: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ServerResponse {
    pub(crate) translation: String,
    pub(crate) idioms: Vec<String>,
    pub(crate) alternative_translations: Vec<String>,
    pub(crate) segments: Vec<SegmentPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) usage: Option<ProviderUsage>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SegmentPayload {
    pub(crate) kind: &'static str,
    pub(crate) text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) idiom: Option<String>,
}

impl From<HighlightSegment> for SegmentPayload {
    fn from(segment: HighlightSegment) -> Self {
        match segment {
            HighlightSegment::Plain(text) => SegmentPayload {
                kind: "plain",
                text,
                idiom: None,
            },
            HighlightSegment::Idiom { text, source } => SegmentPayload {
                kind: "idiom",
                text,
                idiom: Some(source),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
