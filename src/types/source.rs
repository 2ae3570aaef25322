use serde::{Deserialize, Serialize};

/// A document excerpt the backend used to ground an answer.
///
/// The backend appends a JSON array of these after the sources marker at the
/// end of every streamed answer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCitation {
    /// Identifier of the cited document.
    #[serde(default)]
    pub doc_id: String,

    /// Display name of the cited document.
    #[serde(default)]
    pub doc_name: String,

    /// The leading text of the cited chunk.
    #[serde(default)]
    pub chunk_text: String,
}

impl SourceCitation {
    /// Parses the metadata segment that follows the sources marker.
    ///
    /// Returns `None` when the segment is not a JSON array of citations.
    pub fn parse_list(segment: &str) -> Option<Vec<SourceCitation>> {
        let segment = segment.trim();
        if segment.is_empty() {
            return Some(Vec::new());
        }
        serde_json::from_str(segment).ok()
    }
}
