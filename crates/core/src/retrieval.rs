use crate::embeddings::Embedder;
use crate::models::{ScoreKind, SearchResult};
use crate::traits::VectorIndex;
use tracing::{debug, warn};

pub const DEFAULT_K: usize = 4;
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.3;

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Outcome of a lookup. Retrieval never fails outright: backend errors come
/// back as `Degraded` so callers can carry on without grounding context.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Hits(Vec<SearchResult>),
    Empty,
    Degraded(String),
}

impl Retrieval {
    pub fn into_results(self) -> Vec<SearchResult> {
        match self {
            Self::Hits(results) => results,
            Self::Empty | Self::Degraded(_) => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Embeds `query`, asks the index for its `k` nearest entries and drops those
/// scoring below `score_threshold`.
///
/// The threshold only applies to [`ScoreKind::Similarity`] results. Entries
/// whose backend reported no score get a placeholder and are always kept, so
/// with such a backend the threshold has no effect. The same holds for an
/// embedder that is not [`Embedder::calibrated`]: its scores are kept as
/// [`ScoreKind::Uncalibrated`] and only decide the order, so a lexical
/// embedder still returns its `k` nearest chunks at the default threshold.
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    query: &str,
    k: usize,
    score_threshold: f32,
) -> Retrieval {
    if query.trim().is_empty() || k == 0 {
        return Retrieval::Empty;
    }

    let vector = match embedder.embed(query).await {
        Ok(vector) => vector,
        Err(error) => {
            warn!(%error, "query embedding failed, continuing without context");
            return Retrieval::Degraded(error.to_string());
        }
    };

    let hits = match index.query_nearest(&vector, k).await {
        Ok(hits) => hits,
        Err(error) => {
            warn!(%error, "vector search failed, continuing without context");
            return Retrieval::Degraded(error.to_string());
        }
    };

    let calibrated = embedder.calibrated();
    let returned = hits.len();
    let results: Vec<SearchResult> = hits
        .into_iter()
        .map(|hit| {
            let mut result = hit.into_result();
            if !calibrated && result.score_kind == ScoreKind::Similarity {
                result.score_kind = ScoreKind::Uncalibrated;
            }
            result
        })
        .filter(|result| match result.score_kind {
            ScoreKind::Similarity => result.score >= score_threshold,
            ScoreKind::Uncalibrated | ScoreKind::Placeholder => true,
        })
        .collect();

    debug!(k, returned, kept = results.len(), score_threshold, "vector search");

    if results.is_empty() {
        Retrieval::Empty
    } else {
        Retrieval::Hits(results)
    }
}

/// Numbered, source-labelled blocks for prompt injection. Empty input renders
/// as an empty string, which callers read as "no grounding context".
pub fn render_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(position, result)| {
            format!("[Source {}: {}]\n{}", position + 1, result.source, result.content)
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
