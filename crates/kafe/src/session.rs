//! Interactive session context
//!
//! Holds the current query, the first result list, the refined result list and
//! the refinement history. The CLI persists it between invocations as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::casebase::{Case, CaseStore, CompareChoice, Identity};
use crate::engine::Engine;
use crate::error::{KafeError, Result};
use crate::lexicon::{KeywordSet, Query};
use crate::ranker::RankedVenue;

/// One pass through the refinement loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementStep {
  pub labels: Vec<String>,
  pub excluded: KeywordSet,
  pub results: Vec<String>,
  pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub query: Query,
  /// Results shown before any refinement
  pub baseline: Vec<RankedVenue>,
  #[serde(default)]
  pub refined: Option<Vec<RankedVenue>>,
  #[serde(default)]
  pub refine_added: KeywordSet,
  #[serde(default)]
  pub excluded: KeywordSet,
  #[serde(default)]
  pub history: Vec<RefinementStep>,
  /// Earlier case stored for the same query
  #[serde(default)]
  pub prior_case: Option<Case>,
  /// The baseline is the prior case's venue rather than fresh results
  #[serde(default)]
  pub replayed: bool,
  pub started: DateTime<Utc>,
}

impl Session {
  /// Begin a session for a query.
  ///
  /// A matching prior case is replayed unless `fresh` is set. A failing case
  /// store is logged and treated as having no prior case.
  pub fn start(engine: &Engine, store: &dyn CaseStore, query: Query, fresh: bool) -> Result<Self> {
    if query.is_empty() {
      return Err(KafeError::EmptyQuery);
    }

    let prior_case = match engine.find_prior_case(store, &query) {
      Ok(found) => found,
      Err(e) => {
        warn!(error = %e, "case lookup failed, continuing without case memory");
        None
      }
    };

    let replay = match (&prior_case, fresh) {
      (Some(case), false) => {
        let replayed = engine.score_venue(&query, &case.selected_venue);
        if replayed.is_none() {
          warn!(venue = %case.selected_venue, "venue from prior case has no embedding");
        }
        replayed
      }
      _ => None,
    };

    let replayed = replay.is_some();
    let (baseline, excluded) = match replay {
      Some(venue) => {
        let excluded = prior_case.as_ref().map(|c| c.refine_excluded.clone()).unwrap_or_default();
        (vec![venue], excluded)
      }
      None => (engine.rank_by_similarity(&query)?, KeywordSet::new()),
    };

    Ok(Self {
      query,
      baseline,
      refined: None,
      refine_added: KeywordSet::new(),
      excluded,
      history: Vec::new(),
      prior_case,
      replayed,
      started: Utc::now(),
    })
  }

  /// The list the user is currently looking at
  pub fn current_results(&self) -> &[RankedVenue] {
    self.refined.as_deref().unwrap_or(&self.baseline)
  }

  /// Refine with a new selection and exclusion set, compared against the baseline
  pub fn refine(&mut self, engine: &Engine, query: Query, excluded: KeywordSet) -> Result<&[RankedVenue]> {
    let results = engine.refine(&query, &excluded, &self.baseline)?;

    self.history.push(RefinementStep {
      labels: query.labels().iter().map(|l| l.to_string()).collect(),
      excluded: excluded.clone(),
      results: results.iter().map(|r| r.venue.clone()).collect(),
      at: Utc::now(),
    });
    self.refine_added = query.keyword_set();
    self.query = query;
    self.excluded = excluded;

    Ok(self.refined.insert(results).as_slice())
  }

  /// Venues the user may pick from for a given compare answer
  pub fn offered(&self, compare: CompareChoice) -> &[RankedVenue] {
    match (compare, &self.refined) {
      (CompareChoice::BeforeRefinement, _) | (_, None) => &self.baseline,
      (_, Some(refined)) => refined,
    }
  }

  /// Build the case recording the user's final choice
  pub fn choose(
    &self,
    venue: &str,
    compare: Option<CompareChoice>,
    submitter: Option<Identity>,
  ) -> Result<Case> {
    let compare = match (&self.refined, compare) {
      (None, _) => CompareChoice::Immediate,
      (Some(_), Some(choice)) if choice != CompareChoice::Immediate => choice,
      (Some(_), _) => CompareChoice::AfterRefinement,
    };

    if !self.offered(compare).iter().any(|r| r.venue == venue) {
      return Err(KafeError::unknown_venue(venue));
    }

    let mut case =
      Case::new(venue, self.query.keyword_set(), self.query.label_map(), compare);
    case.refine_added = self.refine_added.clone();
    case.refine_excluded = self.excluded.clone();
    case.submitter = submitter;
    Ok(case)
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|e| KafeError::data_load(path, e))?;
    }
    let content = serde_json::to_string_pretty(self).map_err(|e| KafeError::data_load(path, e))?;
    fs::write(path, content).map_err(|e| KafeError::data_load(path, e))
  }

  pub fn load(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Err(KafeError::NoSession);
    }
    let content = fs::read_to_string(path).map_err(|e| KafeError::data_load(path, e))?;
    serde_json::from_str(&content).map_err(|e| KafeError::data_load(path, e))
  }

  pub fn clear(path: &Path) -> Result<()> {
    if path.exists() {
      fs::remove_file(path).map_err(|e| KafeError::data_load(path, e))?;
    }
    Ok(())
  }
}
