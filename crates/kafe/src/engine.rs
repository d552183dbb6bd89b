//! Recommendation engine: the loaded, read-only data plus the core operations
//! the shell calls into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::casebase::{self, Case, CaseStore};
use crate::config::{Config, RankingSettings};
use crate::corpus::CorpusIndex;
use crate::critique::{self, CritiqueCount, Refinement};
use crate::embedding::{VenueEmbeddings, WordVectors};
use crate::error::{KafeError, Result};
use crate::keyword::{self, KeywordMatch};
use crate::lexicon::{KeywordSet, Query, Taxonomy};
use crate::ranker::{self, AspectRelevance, RankedVenue};
use crate::similarity;

pub struct Engine {
  taxonomy: Taxonomy,
  corpus: CorpusIndex,
  words: WordVectors,
  venues: VenueEmbeddings,
  settings: RankingSettings,
  critique_vocabulary: Vec<String>,
}

/// Everything shown next to a recommended venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDetail {
  pub ranked: RankedVenue,
  pub relevance: AspectRelevance,
  /// Reviews in the corpus for this venue; zero when it has none
  pub review_count: usize,
  /// Nonzero occurrences of each query keyword
  pub mentions: BTreeMap<String, usize>,
  pub critiques: Vec<CritiqueCount>,
}

impl Engine {
  pub fn new(
    taxonomy: Taxonomy,
    corpus: CorpusIndex,
    words: WordVectors,
    venues: VenueEmbeddings,
    settings: RankingSettings,
    critique_vocabulary: Vec<String>,
  ) -> Self {
    let engine = Self { taxonomy, corpus, words, venues, settings, critique_vocabulary };
    engine.check_integrity();
    engine
  }

  /// Load every input named by the configuration
  pub fn load(config: &Config) -> Result<Self> {
    let taxonomy = match &config.taxonomy {
      Some(path) => Taxonomy::load_from_file(path)?,
      None => Taxonomy::builtin(),
    };
    let dimension = config.ranking.vector_dimension;
    let corpus = CorpusIndex::load(&config.reviews)?;
    let words = WordVectors::load(&config.word_vectors, dimension)?;
    let venues = VenueEmbeddings::load(&config.venues, dimension)?;

    Ok(Self::new(
      taxonomy,
      corpus,
      words,
      venues,
      config.ranking.clone(),
      config.critique_vocabulary.clone(),
    ))
  }

  /// Venues present in only one of the corpus and the embedding table still
  /// take part in ranking; they are reported once here.
  fn check_integrity(&self) {
    for row in self.venues.rows() {
      if !self.corpus.contains_venue(&row.venue) {
        warn!(venue = %row.venue, "venue has an embedding but no reviews");
      }
    }
    for name in self.corpus.venue_names() {
      if self.venues.get(name).is_none() {
        warn!(venue = %name, "venue has reviews but no embedding, it cannot be ranked by similarity");
      }
    }
  }

  pub fn taxonomy(&self) -> &Taxonomy {
    &self.taxonomy
  }

  /// Application 1: exact keyword matching
  pub fn score_by_keywords(&self, query: &Query) -> Result<Vec<KeywordMatch>> {
    keyword::score_by_keywords(&self.corpus, query, self.settings.keyword_top_n)
  }

  /// Application 2: top venues by embedding similarity
  pub fn rank_by_similarity(&self, query: &Query) -> Result<Vec<RankedVenue>> {
    ranker::rank_by_similarity(&self.venues, &self.words, query, self.settings.similarity_top_n)
  }

  /// Re-rank for the refined query, penalising and filtering excluded tokens.
  ///
  /// `previous_results` is the list shown before this refinement.
  pub fn refine(
    &self,
    query: &Query,
    excluded: &KeywordSet,
    previous_results: &[RankedVenue],
  ) -> Result<Vec<RankedVenue>> {
    if query.is_empty() {
      return Err(KafeError::EmptyQuery);
    }

    let query_vector = self.words.mean_vector(&query.keyword_set());
    let scored = ranker::score_all(&self.venues, &query_vector);
    let refined = critique::refine(
      &self.corpus,
      scored,
      excluded,
      previous_results,
      Refinement {
        penalty_weight: self.settings.penalty_weight,
        top_n: self.settings.similarity_top_n,
      },
    );

    debug!(excluded = excluded.len(), results = refined.len(), "refinement finished");
    Ok(refined)
  }

  /// Earliest stored case for exactly this query
  pub fn find_prior_case<S: CaseStore + ?Sized>(&self, store: &S, query: &Query) -> Result<Option<Case>> {
    casebase::lookup(store, &query.keyword_set(), &query.label_map())
  }

  pub fn record_case<S: CaseStore + ?Sized>(&self, store: &S, case: Case) -> Result<Case> {
    casebase::insert(store, case)
  }

  /// Score a single named venue against the query, as when replaying a prior case
  pub fn score_venue(&self, query: &Query, venue: &str) -> Option<RankedVenue> {
    let row = self.venues.get(venue)?;
    let query_vector = self.words.mean_vector(&query.keyword_set());
    Some(RankedVenue::new(row, similarity::cosine(&query_vector, &row.vector)))
  }

  /// Explanation shown alongside a ranked venue
  pub fn detail(&self, ranked: &RankedVenue, query: &Query) -> VenueDetail {
    let relevance = match self.venues.get(&ranked.venue) {
      Some(row) => ranker::aspect_relevance(&self.words, &row.vector, query, self.settings.aspect_threshold),
      None => AspectRelevance::default(),
    };

    let doc = self.corpus.get(&ranked.venue);
    let mentions = match doc {
      Some(doc) => query
        .keyword_set()
        .iter()
        .map(|k| (k.clone(), doc.count(k)))
        .filter(|(_, count)| *count > 0)
        .collect(),
      None => BTreeMap::new(),
    };

    VenueDetail {
      ranked: ranked.clone(),
      relevance,
      review_count: doc.map(|d| d.review_count()).unwrap_or(0),
      mentions,
      critiques: critique::critique_report(doc, &self.critique_vocabulary),
    }
  }

  /// Critique tokens across a result list, offered as exclusion candidates
  pub fn critique_candidates(&self, results: &[RankedVenue]) -> Vec<CritiqueCount> {
    critique::aggregate_critiques(
      &self.corpus,
      results.iter().map(|r| r.venue.as_str()),
      &self.critique_vocabulary,
    )
  }
}
