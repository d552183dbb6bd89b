//! Embedding-similarity ranking (Application 2)
//!
//! Overall ranking and the per-sub-aspect explanation are independent: a venue
//! can rank in the top results and still show no matched sub-aspect.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::embedding::{VenueEmbeddings, VenueVector, WordVectors};
use crate::error::{KafeError, Result};
use crate::lexicon::{KeywordSet, Query};
use crate::similarity;

/// A venue scored against a query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVenue {
  pub venue: String,
  pub similarity: f32,
  /// Occurrences of excluded tokens; zero outside refinement
  #[serde(default)]
  pub penalty: usize,
  pub final_score: f32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avg_sentiment: Option<f32>,
  /// Admitted back by the refinement fallback despite containing excluded tokens
  #[serde(default)]
  pub relaxed: bool,
}

impl RankedVenue {
  pub fn new(row: &VenueVector, similarity: f32) -> Self {
    Self {
      venue: row.venue.clone(),
      similarity,
      penalty: 0,
      final_score: similarity,
      avg_sentiment: row.avg_sentiment,
      relaxed: false,
    }
  }
}

/// Sub-aspects whose own vector clears the relevance threshold for a venue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AspectRelevance {
  /// Matched sub-aspects, most similar first
  pub matched: Vec<(String, f32)>,
}

impl AspectRelevance {
  pub fn is_empty(&self) -> bool {
    self.matched.is_empty()
  }

  pub fn average(&self) -> Option<f32> {
    if self.matched.is_empty() {
      return None;
    }
    Some(self.matched.iter().map(|(_, s)| s).sum::<f32>() / self.matched.len() as f32)
  }
}

/// Order by descending final score; equal scores keep their incoming order
pub fn sort_by_final_score(venues: &mut [RankedVenue]) {
  venues.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(Ordering::Equal));
}

/// Cosine of the query vector against every venue row, in table order
pub fn score_all(embeddings: &VenueEmbeddings, query_vector: &[f32]) -> Vec<RankedVenue> {
  embeddings
    .rows()
    .iter()
    .map(|row| RankedVenue::new(row, similarity::cosine(query_vector, &row.vector)))
    .collect()
}

/// Top `top_n` venues by similarity to the mean vector of the query keywords
pub fn rank_by_similarity(
  embeddings: &VenueEmbeddings,
  words: &WordVectors,
  query: &Query,
  top_n: usize,
) -> Result<Vec<RankedVenue>> {
  if query.is_empty() {
    return Err(KafeError::EmptyQuery);
  }

  let query_vector = words.mean_vector(&query.keyword_set());
  let mut ranked = score_all(embeddings, &query_vector);
  sort_by_final_score(&mut ranked);
  ranked.truncate(top_n);

  debug!(
    keywords = query.keyword_set().len(),
    results = ranked.len(),
    best = ranked.first().map(|r| r.final_score),
    "similarity ranking finished"
  );
  Ok(ranked)
}

/// Compare each selected sub-aspect's own vector against one venue vector
pub fn aspect_relevance(
  words: &WordVectors,
  venue_vector: &[f32],
  query: &Query,
  threshold: f32,
) -> AspectRelevance {
  let mut matched: Vec<(String, f32)> = query
    .aspects
    .iter()
    .filter_map(|aspect| {
      let keywords: KeywordSet = aspect.keywords.iter().cloned().collect();
      let score = similarity::cosine(&words.mean_vector(&keywords), venue_vector);
      (score > threshold).then(|| (aspect.label.clone(), score))
    })
    .collect();

  matched.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
  AspectRelevance { matched }
}
