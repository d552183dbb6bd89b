//! Negative-critique reporting and exclusion-based refinement
//!
//! Refinement applies two rules at once: a soft penalty on the score for every
//! excluded token occurrence, and a hard filter removing any venue that mentions
//! an excluded token at all. When the hard filter leaves too few venues, venues
//! less critiqued than the worst of the previous results are admitted back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::corpus::{CorpusIndex, VenueDocument};
use crate::lexicon::KeywordSet;
use crate::ranker::{self, RankedVenue};

pub const DEFAULT_CRITIQUE_VOCABULARY: &[&str] = &[
  "mahal",
  "rame",
  "berisik",
  "bising",
  "lambat",
  "pelayan_lama",
  "kotor",
  "sempit",
  "panas",
  "gerah",
  "jutek",
  "antri",
  "macet",
  "crowded",
  "tidak_bersih",
  "tidak_aman",
  "overpriced",
];

/// A critique token and how often it occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueCount {
  pub token: String,
  pub count: usize,
}

/// Nonzero critique counts for one venue, most frequent first.
///
/// Equal counts keep vocabulary order. A venue missing from the corpus has none.
pub fn critique_report(doc: Option<&VenueDocument>, vocabulary: &[String]) -> Vec<CritiqueCount> {
  let Some(doc) = doc else { return Vec::new() };

  let mut counts: Vec<CritiqueCount> = vocabulary
    .iter()
    .map(|token| CritiqueCount { token: token.clone(), count: doc.count(token) })
    .filter(|c| c.count > 0)
    .collect();
  counts.sort_by(|a, b| b.count.cmp(&a.count));
  counts
}

/// Critique counts summed over several venues: the candidates offered for exclusion
pub fn aggregate_critiques<'a, I>(index: &CorpusIndex, venues: I, vocabulary: &[String]) -> Vec<CritiqueCount>
where
  I: IntoIterator<Item = &'a str>,
{
  let mut totals: BTreeMap<String, usize> = BTreeMap::new();
  for venue in venues {
    for critique in critique_report(index.get(venue), vocabulary) {
      *totals.entry(critique.token).or_insert(0) += critique.count;
    }
  }

  let mut counts: Vec<CritiqueCount> = vocabulary
    .iter()
    .filter_map(|token| {
      totals.get(token).map(|count| CritiqueCount { token: token.clone(), count: *count })
    })
    .collect();
  counts.sort_by(|a, b| b.count.cmp(&a.count));
  counts
}

/// Occurrences of excluded tokens across a venue's reviews
pub fn total_exclusion_count(index: &CorpusIndex, venue: &str, excluded: &KeywordSet) -> usize {
  index.get(venue).map(|doc| doc.count_all(excluded)).unwrap_or(0)
}

/// Penalty settings for one refinement pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement {
  pub penalty_weight: f32,
  pub top_n: usize,
}

/// Re-rank scored venues against an exclusion set.
///
/// `scored` holds every venue with its similarity to the refined query.
/// `baseline` is the result list shown before this refinement; its worst
/// exclusion count bounds which filtered venues may be admitted back.
pub fn refine(
  index: &CorpusIndex,
  mut scored: Vec<RankedVenue>,
  excluded: &KeywordSet,
  baseline: &[RankedVenue],
  settings: Refinement,
) -> Vec<RankedVenue> {
  for venue in scored.iter_mut() {
    venue.penalty = total_exclusion_count(index, &venue.venue, excluded);
    venue.final_score = venue.similarity - settings.penalty_weight * venue.penalty as f32;
    venue.relaxed = false;
  }
  ranker::sort_by_final_score(&mut scored);

  let (mut kept, filtered): (Vec<RankedVenue>, Vec<RankedVenue>) =
    scored.into_iter().partition(|venue| !mentions_any(index, &venue.venue, excluded));

  if kept.len() < settings.top_n {
    let max_baseline = baseline
      .iter()
      .map(|venue| total_exclusion_count(index, &venue.venue, excluded))
      .max()
      .unwrap_or(0);

    let mut relaxed = 0;
    for mut venue in filtered {
      if kept.len() >= settings.top_n {
        break;
      }
      if venue.penalty < max_baseline {
        venue.relaxed = true;
        kept.push(venue);
        relaxed += 1;
      }
    }
    debug!(max_baseline, relaxed, "relaxed exclusion filter");
  }

  kept.truncate(settings.top_n);
  kept
}

fn mentions_any(index: &CorpusIndex, venue: &str, excluded: &KeywordSet) -> bool {
  index.get(venue).map(|doc| doc.contains_any(excluded)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::corpus::Review;

  fn vocabulary() -> Vec<String> {
    DEFAULT_CRITIQUE_VOCABULARY.iter().map(|s| s.to_string()).collect()
  }

  fn scored(entries: &[(&str, f32)]) -> Vec<RankedVenue> {
    entries
      .iter()
      .map(|(venue, similarity)| RankedVenue {
        venue: venue.to_string(),
        similarity: *similarity,
        penalty: 0,
        final_score: *similarity,
        avg_sentiment: None,
        relaxed: false,
      })
      .collect()
  }

  fn exclude(tokens: &[&str]) -> KeywordSet {
    tokens.iter().copied().collect()
  }

  const SETTINGS: Refinement = Refinement { penalty_weight: 0.01, top_n: 5 };

  #[test]
  fn test_report_sorted_by_count_nonzero_only() {
    let index = CorpusIndex::from_reviews(vec![Review::new(
      "A",
      &["kotor", "mahal", "kotor", "cozy"],
      &["kotor"],
    )]);
    let report = critique_report(index.get("A"), &vocabulary());
    assert_eq!(
      report,
      vec![
        CritiqueCount { token: "kotor".into(), count: 3 },
        CritiqueCount { token: "mahal".into(), count: 1 },
      ]
    );
    assert!(critique_report(index.get("missing"), &vocabulary()).is_empty());
  }

  #[test]
  fn test_aggregate_sums_across_venues() {
    let index = CorpusIndex::from_reviews(vec![
      Review::new("A", &["antri", "mahal"], &[]),
      Review::new("B", &["antri"], &[]),
    ]);
    let totals = aggregate_critiques(&index, ["A", "B"], &vocabulary());
    assert_eq!(totals[0], CritiqueCount { token: "antri".into(), count: 2 });
    assert_eq!(totals[1], CritiqueCount { token: "mahal".into(), count: 1 });
  }

  #[test]
  fn test_penalty_is_subtracted_from_similarity() {
    let index = CorpusIndex::from_reviews(vec![
      Review::new("A", &["berisik", "berisik"], &[]),
      Review::new("B", &[], &[]),
    ]);
    let result =
      refine(&index, scored(&[("A", 0.9), ("B", 0.5)]), &exclude(&["berisik"]), &[], SETTINGS);

    // A is hard-filtered; nothing in the empty baseline allows relaxation
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].venue, "B");
    assert_eq!(result[0].final_score, 0.5);
  }

  #[test]
  fn test_empty_exclusion_keeps_similarity_order() {
    let index = CorpusIndex::from_reviews(vec![Review::new("A", &["berisik"], &[])]);
    let result = refine(
      &index,
      scored(&[("A", 0.2), ("B", 0.9), ("C", 0.5)]),
      &KeywordSet::new(),
      &[],
      SETTINGS,
    );
    let names: Vec<&str> = result.iter().map(|r| r.venue.as_str()).collect();
    assert_eq!(names, vec!["B", "C", "A"]);
  }

  #[test]
  fn test_venue_above_baseline_is_not_relaxed_back() {
    let index = CorpusIndex::from_reviews(vec![
      Review::new("Base", &["berisik", "berisik"], &[]),
      Review::new("C", &["berisik", "berisik", "berisik"], &[]),
      Review::new("D", &["berisik"], &[]),
    ]);
    let baseline = scored(&[("Base", 0.8)]);
    let result = refine(
      &index,
      scored(&[("C", 0.95), ("D", 0.7), ("Base", 0.8), ("E", 0.1)]),
      &exclude(&["berisik"]),
      &baseline,
      SETTINGS,
    );

    let names: Vec<&str> = result.iter().map(|r| r.venue.as_str()).collect();
    // E survives the filter, D (1 < 2) is relaxed back, C (3) and Base (2) are not
    assert_eq!(names, vec!["E", "D"]);
    assert!(!result[0].relaxed);
    assert!(result[1].relaxed);
    assert!(result.iter().filter(|r| r.relaxed).all(|r| r.penalty < 2));
  }

  #[test]
  fn test_relaxation_fills_up_to_top_n_in_score_order() {
    let reviews: Vec<Review> =
      (0..6).map(|i| Review::new(&format!("V{i}"), &["antri"], &[])).collect();
    let mut index_reviews = reviews;
    index_reviews.push(Review::new("Worst", &["antri", "antri", "antri"], &[]));
    let index = CorpusIndex::from_reviews(index_reviews);

    let all = scored(&[
      ("V0", 0.9),
      ("V1", 0.8),
      ("V2", 0.7),
      ("V3", 0.6),
      ("V4", 0.5),
      ("V5", 0.4),
      ("Worst", 0.95),
    ]);
    let baseline = scored(&[("Worst", 0.95)]);
    let result = refine(&index, all, &exclude(&["antri"]), &baseline, SETTINGS);

    let names: Vec<&str> = result.iter().map(|r| r.venue.as_str()).collect();
    assert_eq!(names, vec!["V0", "V1", "V2", "V3", "V4"]);
    assert!(result.iter().all(|r| r.relaxed && r.penalty == 1));
    assert!((result[0].final_score - 0.89).abs() < 1e-6);
  }

  #[test]
  fn test_venue_missing_from_corpus_is_never_filtered() {
    let index = CorpusIndex::from_reviews(vec![Review::new("A", &["kotor"], &[])]);
    let result = refine(&index, scored(&[("Ghost", 0.3)]), &exclude(&["kotor"]), &[], SETTINGS);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].penalty, 0);
  }
}
