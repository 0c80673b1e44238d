use crate::models::{ScoreKind, SearchResult};

/// Stands in for a similarity the backend did not report. Never compared
/// against a score threshold.
pub const PLACEHOLDER_SCORE: f32 = 0.9;

const UNKNOWN: &str = "unknown";

/// One row returned by a [`crate::VectorIndex`] lookup. Metadata is optional
/// because remote payloads may lack it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    pub text: String,
    pub source_name: Option<String>,
    pub file_type: Option<String>,
    pub score: Option<f32>,
}

impl StoreHit {
    pub fn into_result(self) -> SearchResult {
        let (score, score_kind) = match self.score {
            Some(score) => (score, ScoreKind::Similarity),
            None => (PLACEHOLDER_SCORE, ScoreKind::Placeholder),
        };

        SearchResult {
            content: self.text,
            source: self.source_name.unwrap_or_else(|| UNKNOWN.to_string()),
            file_type: self.file_type.unwrap_or_else(|| UNKNOWN.to_string()),
            score,
            score_kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_metadata_and_score_get_defaults() {
        let result = StoreHit {
            text: "body".to_string(),
            source_name: None,
            file_type: None,
            score: None,
        }
        .into_result();

        assert_eq!(result.source, "unknown");
        assert_eq!(result.file_type, "unknown");
        assert_eq!(result.score, PLACEHOLDER_SCORE);
        assert_eq!(result.score_kind, ScoreKind::Placeholder);
    }

    #[test]
    fn reported_score_is_kept() {
        let result = StoreHit {
            text: "body".to_string(),
            source_name: Some("faq.txt".to_string()),
            file_type: Some("text".to_string()),
            score: Some(0.42),
        }
        .into_result();

        assert_eq!(result.source, "faq.txt");
        assert_eq!(result.score, 0.42);
        assert_eq!(result.score_kind, ScoreKind::Similarity);
    }
}
