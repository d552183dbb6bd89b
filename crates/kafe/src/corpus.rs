//! Review corpus index
//!
//! Reviews arrive pre-tokenized (negation already folded into tokens such as
//! `tidak_bersih`). Each venue's primary-language and secondary-language tokens
//! are counted together as one stream.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{KafeError, Result};
use crate::lexicon::KeywordSet;

/// One review line of the corpus file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  pub venue: String,
  #[serde(default)]
  pub tokens_primary: Vec<String>,
  #[serde(default)]
  pub tokens_secondary: Vec<String>,
}

impl Review {
  pub fn new(venue: &str, primary: &[&str], secondary: &[&str]) -> Self {
    Self {
      venue: venue.to_string(),
      tokens_primary: primary.iter().map(|t| t.to_string()).collect(),
      tokens_secondary: secondary.iter().map(|t| t.to_string()).collect(),
    }
  }
}

/// Token occurrence counts for one venue
#[derive(Debug, Clone, Default)]
pub struct VenueDocument {
  counts: HashMap<String, usize>,
  review_count: usize,
}

impl VenueDocument {
  fn push_review(&mut self, review: Review) {
    for token in review.tokens_primary.into_iter().chain(review.tokens_secondary) {
      *self.counts.entry(token).or_insert(0) += 1;
    }
    self.review_count += 1;
  }

  pub fn review_count(&self) -> usize {
    self.review_count
  }

  /// Occurrences of a single token across all reviews
  pub fn count(&self, token: &str) -> usize {
    self.counts.get(token).copied().unwrap_or(0)
  }

  pub fn contains(&self, token: &str) -> bool {
    self.counts.contains_key(token)
  }

  /// Summed occurrences of every token in the set
  pub fn count_all(&self, tokens: &KeywordSet) -> usize {
    tokens.iter().map(|t| self.count(t)).sum()
  }

  pub fn contains_any(&self, tokens: &KeywordSet) -> bool {
    tokens.iter().any(|t| self.contains(t))
  }
}

/// Read-only per-venue aggregation, iterated in venue-name order
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
  venues: BTreeMap<String, VenueDocument>,
}

impl CorpusIndex {
  pub fn from_reviews<I: IntoIterator<Item = Review>>(reviews: I) -> Self {
    let mut venues: BTreeMap<String, VenueDocument> = BTreeMap::new();
    for review in reviews {
      venues.entry(review.venue.clone()).or_default().push_review(review);
    }
    Self { venues }
  }

  /// Load a JSON Lines review file; blank lines are ignored
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| KafeError::data_load(path, e))?;

    let mut reviews = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
      if line.trim().is_empty() {
        continue;
      }
      let review: Review = serde_json::from_str(line)
        .map_err(|e| KafeError::data_load(path, format!("line {}: {e}", line_no + 1)))?;
      reviews.push(review);
    }

    let index = Self::from_reviews(reviews);
    debug!(venues = index.len(), path = %path.display(), "loaded review corpus");
    Ok(index)
  }

  pub fn len(&self) -> usize {
    self.venues.len()
  }

  pub fn is_empty(&self) -> bool {
    self.venues.is_empty()
  }

  pub fn get(&self, venue: &str) -> Option<&VenueDocument> {
    self.venues.get(venue)
  }

  pub fn contains_venue(&self, venue: &str) -> bool {
    self.venues.contains_key(venue)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &VenueDocument)> {
    self.venues.iter().map(|(name, doc)| (name.as_str(), doc))
  }

  pub fn venue_names(&self) -> impl Iterator<Item = &str> {
    self.venues.keys().map(|name| name.as_str())
  }
}
