//! Exact keyword matching over the review corpus (Application 1)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::corpus::{CorpusIndex, VenueDocument};
use crate::error::{KafeError, Result};
use crate::lexicon::Query;

/// Score of one venue against the selected sub-aspects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
  pub venue: String,
  /// Number of sub-aspects with at least one keyword present
  pub matched_sub_aspect_count: usize,
  /// Occurrences of each matched keyword across all the venue's reviews
  pub mentions: BTreeMap<String, usize>,
  pub total_mentions: usize,
  /// Mentions attributed to each matched sub-aspect, in query order
  pub aspect_mentions: Vec<(String, usize)>,
}

/// Rank venues by distinct sub-aspects matched, then by total mentions.
///
/// Ties keep corpus order (venue name), so results are reproducible.
pub fn score_by_keywords(index: &CorpusIndex, query: &Query, top_n: usize) -> Result<Vec<KeywordMatch>> {
  if query.is_empty() {
    return Err(KafeError::EmptyQuery);
  }

  let mut results: Vec<KeywordMatch> =
    index.iter().filter_map(|(venue, doc)| score_venue(venue, doc, query)).collect();

  results.sort_by(|a, b| {
    b.matched_sub_aspect_count
      .cmp(&a.matched_sub_aspect_count)
      .then_with(|| b.total_mentions.cmp(&a.total_mentions))
  });
  results.truncate(top_n);

  debug!(aspects = query.aspects.len(), results = results.len(), "keyword scoring finished");
  Ok(results)
}

fn score_venue(venue: &str, doc: &VenueDocument, query: &Query) -> Option<KeywordMatch> {
  let mut matched_sub_aspect_count = 0;
  let mut mentions = BTreeMap::new();

  for aspect in &query.aspects {
    let mut matched = false;
    for keyword in &aspect.keywords {
      let count = doc.count(keyword);
      if count > 0 {
        matched = true;
        // a keyword shared by two sub-aspects is only counted once
        mentions.insert(keyword.clone(), count);
      }
    }
    if matched {
      matched_sub_aspect_count += 1;
    }
  }

  if matched_sub_aspect_count == 0 {
    return None;
  }

  let aspect_mentions = query
    .aspects
    .iter()
    .map(|aspect| {
      let count: usize = aspect.keywords.iter().filter_map(|k| mentions.get(k)).sum();
      (aspect.label.clone(), count)
    })
    .filter(|(_, count)| *count > 0)
    .collect();

  Some(KeywordMatch {
    venue: venue.to_string(),
    matched_sub_aspect_count,
    total_mentions: mentions.values().sum(),
    mentions,
    aspect_mentions,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::corpus::Review;
  use crate::lexicon::Taxonomy;

  fn cozy_wifi_query() -> Query {
    Taxonomy::builtin().select(&["Cozy-homey", "Wifi"]).unwrap()
  }

  #[test]
  fn test_two_aspects_beat_one() {
    let index = CorpusIndex::from_reviews(vec![
      Review::new("B", &["wifi"], &[]),
      Review::new("A", &["cozy", "cozy"], &["wifi"]),
    ]);

    let results = score_by_keywords(&index, &cozy_wifi_query(), 10).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].venue, "A");
    assert_eq!(results[0].matched_sub_aspect_count, 2);
    assert_eq!(results[0].total_mentions, 3);
    assert_eq!(results[1].venue, "B");
    assert_eq!(results[1].matched_sub_aspect_count, 1);
    assert_eq!(results[1].total_mentions, 1);
  }

  #[test]
  fn test_unmatched_venues_are_dropped() {
    let index = CorpusIndex::from_reviews(vec![
      Review::new("A", &["wifi"], &[]),
      Review::new("Quiet", &["kopi"], &[]),
    ]);
    let results = score_by_keywords(&index, &cozy_wifi_query(), 10).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results.iter().all(|r| r.matched_sub_aspect_count >= 1));
  }

  #[test]
  fn test_empty_query_is_rejected() {
    let index = CorpusIndex::from_reviews(vec![Review::new("A", &["wifi"], &[])]);
    let err = score_by_keywords(&index, &Query::default(), 10).unwrap_err();
    assert!(matches!(err, KafeError::EmptyQuery));
  }

  #[test]
  fn test_results_truncate_to_top_n() {
    let reviews: Vec<Review> =
      (0..15).map(|i| Review::new(&format!("Venue {i:02}"), &["wifi"], &[])).collect();
    let index = CorpusIndex::from_reviews(reviews);
    let results = score_by_keywords(&index, &cozy_wifi_query(), 10).unwrap();
    assert_eq!(results.len(), 10);
  }

  #[test]
  fn test_ties_keep_venue_name_order() {
    let index = CorpusIndex::from_reviews(vec![
      Review::new("Charlie", &["wifi"], &[]),
      Review::new("Alpha", &["internet"], &[]),
      Review::new("Bravo", &["wifinya"], &[]),
    ]);
    let results = score_by_keywords(&index, &cozy_wifi_query(), 10).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.venue.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Bravo", "Charlie"]);
  }

  #[test]
  fn test_shared_keyword_counts_once_but_matches_both_aspects() {
    let query = Taxonomy::builtin().select(&["Ramai", "Genre musik upbeat"]).unwrap();
    let index = CorpusIndex::from_reviews(vec![Review::new("Loud", &["ramai", "ramai"], &[])]);

    let results = score_by_keywords(&index, &query, 10).unwrap();
    assert_eq!(results[0].matched_sub_aspect_count, 2);
    assert_eq!(results[0].total_mentions, 2);
    assert_eq!(
      results[0].aspect_mentions,
      vec![("Ramai".to_string(), 2), ("Genre musik upbeat".to_string(), 2)]
    );
  }
}
