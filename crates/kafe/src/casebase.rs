//! Case memory: prior users' final choices keyed by their query
//!
//! Cases are append-only. Two cases describe the same query when their keyword
//! sets are equal as sets and their aspect-label maps are equal as maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{KafeError, Result};
use crate::lexicon::{AspectLabelMap, KeywordSet};

/// Which result list the final choice was made from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareChoice {
  /// Satisfied with the first recommendations, no refinement
  Immediate,
  BeforeRefinement,
  AfterRefinement,
  NoDifference,
}

impl fmt::Display for CompareChoice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      CompareChoice::Immediate => "accepted first results",
      CompareChoice::BeforeRefinement => "before refinement",
      CompareChoice::AfterRefinement => "after refinement",
      CompareChoice::NoDifference => "no difference",
    };
    write!(f, "{label}")
  }
}

/// Who submitted a case, stored as given
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub age: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gender: Option<String>,
  /// Casual or frequent cafe visitor
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visitor_kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

/// A persisted query → chosen venue record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
  pub selected_venue: String,
  pub keywords: KeywordSet,
  pub aspect_labels: AspectLabelMap,
  #[serde(default)]
  pub refine_added: KeywordSet,
  #[serde(default)]
  pub refine_excluded: KeywordSet,
  pub compare_choice: CompareChoice,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub submitter: Option<Identity>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timestamp: Option<DateTime<Utc>>,
}

impl Case {
  pub fn new(
    selected_venue: impl Into<String>,
    keywords: KeywordSet,
    aspect_labels: AspectLabelMap,
    compare_choice: CompareChoice,
  ) -> Self {
    Self {
      selected_venue: selected_venue.into(),
      keywords,
      aspect_labels,
      refine_added: KeywordSet::new(),
      refine_excluded: KeywordSet::new(),
      compare_choice,
      submitter: None,
      timestamp: None,
    }
  }

  pub fn matches(&self, keywords: &KeywordSet, aspect_labels: &AspectLabelMap) -> bool {
    &self.keywords == keywords && &self.aspect_labels == aspect_labels
  }
}

/// Transport behind the case memory: append one record, scan them all
pub trait CaseStore {
  fn append(&self, case: &Case) -> Result<()>;
  fn scan(&self) -> Result<Vec<Case>>;
}

/// First stored case (earliest inserted) for the query, if any
pub fn lookup<S: CaseStore + ?Sized>(
  store: &S,
  keywords: &KeywordSet,
  aspect_labels: &AspectLabelMap,
) -> Result<Option<Case>> {
  let found = store.scan()?.into_iter().find(|case| case.matches(keywords, aspect_labels));
  debug!(hit = found.is_some(), "case lookup");
  Ok(found)
}

/// Append a case, stamping the creation time when missing
pub fn insert<S: CaseStore + ?Sized>(store: &S, mut case: Case) -> Result<Case> {
  if case.timestamp.is_none() {
    case.timestamp = Some(Utc::now());
  }
  store.append(&case)?;
  debug!(venue = %case.selected_venue, "case recorded");
  Ok(case)
}

/// JSON Lines file; each case is written as one line with a single append
#[derive(Debug, Clone)]
pub struct JsonlCaseStore {
  path: PathBuf,
}

impl JsonlCaseStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl CaseStore for JsonlCaseStore {
  fn append(&self, case: &Case) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(|e| KafeError::store_unavailable(e.to_string()))?;
    }

    let record = serde_json::to_string(case).map_err(|e| KafeError::store_unavailable(e.to_string()))?;
    let unavailable = |e: std::io::Error| KafeError::store_unavailable(format!("{}: {e}", self.path.display()));

    // a writer that died mid-record leaves no newline; start on a fresh line
    let mut line = String::with_capacity(record.len() + 2);
    if ends_mid_line(&self.path).map_err(unavailable)? {
      line.push('\n');
    }
    line.push_str(&record);
    line.push('\n');

    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)
      .map_err(unavailable)?;
    file.write_all(line.as_bytes()).map_err(unavailable)
  }

  fn scan(&self) -> Result<Vec<Case>> {
    if !self.path.exists() {
      return Ok(Vec::new());
    }

    let content = fs::read_to_string(&self.path)
      .map_err(|e| KafeError::store_unavailable(format!("{}: {e}", self.path.display())))?;

    let mut cases = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
      if line.trim().is_empty() {
        continue;
      }
      match serde_json::from_str::<Case>(line) {
        Ok(case) => cases.push(case),
        Err(e) => warn!(line = line_no + 1, error = %e, "skipping unreadable case record"),
      }
    }
    Ok(cases)
  }
}

/// True when the file exists, is non-empty and its last byte is not a newline
fn ends_mid_line(path: &Path) -> std::io::Result<bool> {
  let mut file = match File::open(path) {
    Ok(file) => file,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
    Err(e) => return Err(e),
  };
  if file.metadata()?.len() == 0 {
    return Ok(false);
  }

  file.seek(SeekFrom::End(-1))?;
  let mut last = [0u8; 1];
  file.read_exact(&mut last)?;
  Ok(last[0] != b'\n')
}

/// In-process store, mostly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryCaseStore {
  cases: Mutex<Vec<Case>>,
}

impl MemoryCaseStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CaseStore for MemoryCaseStore {
  fn append(&self, case: &Case) -> Result<()> {
    let mut cases = self.cases.lock().map_err(|e| KafeError::store_unavailable(e.to_string()))?;
    cases.push(case.clone());
    Ok(())
  }

  fn scan(&self) -> Result<Vec<Case>> {
    let cases = self.cases.lock().map_err(|e| KafeError::store_unavailable(e.to_string()))?;
    Ok(cases.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeSet;

  fn labels(entries: &[(&str, &str)]) -> AspectLabelMap {
    let mut map = AspectLabelMap::new();
    for (category, label) in entries {
      map.entry(category.to_string()).or_insert_with(BTreeSet::new).insert(label.to_string());
    }
    map
  }

  fn case(venue: &str) -> Case {
    Case::new(
      venue,
      ["wifi", "cozy"].into_iter().collect(),
      labels(&[("Fasilitas Tambahan", "Wifi")]),
      CompareChoice::Immediate,
    )
  }

  #[test]
  fn test_lookup_matches_keyword_permutation() {
    let store = MemoryCaseStore::new();
    insert(&store, case("Kopi Senja")).unwrap();

    let permuted: KeywordSet = ["cozy", "wifi", "cozy"].into_iter().collect();
    let found = lookup(&store, &permuted, &labels(&[("Fasilitas Tambahan", "Wifi")])).unwrap();
    assert_eq!(found.unwrap().selected_venue, "Kopi Senja");
  }

  #[test]
  fn test_lookup_requires_equal_label_map() {
    let store = MemoryCaseStore::new();
    insert(&store, case("Kopi Senja")).unwrap();

    let keywords: KeywordSet = ["wifi", "cozy"].into_iter().collect();
    let other = labels(&[("Fasilitas Tambahan", "Wifi"), ("Desain lokasi", "Cozy-homey")]);
    assert!(lookup(&store, &keywords, &other).unwrap().is_none());
  }

  #[test]
  fn test_earliest_case_wins() {
    let store = MemoryCaseStore::new();
    insert(&store, case("First")).unwrap();
    insert(&store, case("Second")).unwrap();

    let first = case("x");
    let found = lookup(&store, &first.keywords, &first.aspect_labels).unwrap().unwrap();
    assert_eq!(found.selected_venue, "First");
    assert_eq!(store.scan().unwrap().len(), 2);
  }

  #[test]
  fn test_insert_stamps_missing_timestamp_only() {
    let store = MemoryCaseStore::new();
    let stamped = insert(&store, case("A")).unwrap();
    assert!(stamped.timestamp.is_some());

    let mut fixed = case("B");
    let when = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z").unwrap().with_timezone(&Utc);
    fixed.timestamp = Some(when);
    let kept = insert(&store, fixed).unwrap();
    assert_eq!(kept.timestamp, Some(when));
  }

  #[test]
  fn test_jsonl_round_trip_and_skips_torn_lines() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = JsonlCaseStore::new(temp.path().join("nested").join("casebase.jsonl"));
    assert!(store.scan().unwrap().is_empty());

    let recorded = insert(&store, case("Kopi Senja")).unwrap();
    fs::OpenOptions::new()
      .append(true)
      .open(store.path())
      .unwrap()
      .write_all(b"{\"selected_venue\": \"torn")
      .unwrap();

    let cases = store.scan().unwrap();
    assert_eq!(cases, vec![recorded]);
  }

  #[test]
  fn test_append_after_torn_line_keeps_new_record() {
    let temp = tempfile::TempDir::new().unwrap();
    let store = JsonlCaseStore::new(temp.path().join("casebase.jsonl"));

    insert(&store, case("First")).unwrap();
    fs::OpenOptions::new()
      .append(true)
      .open(store.path())
      .unwrap()
      .write_all(b"{\"selected_venue\": \"torn")
      .unwrap();
    insert(&store, case("Second Session")).unwrap();

    let venues: Vec<String> = store.scan().unwrap().into_iter().map(|c| c.selected_venue).collect();
    assert_eq!(venues, vec!["First", "Second Session"]);

    let content = fs::read_to_string(store.path()).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.ends_with('\n'));
  }
}
