//! Static word-vector table and per-venue embedding matrix

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{KafeError, Result};
use crate::lexicon::KeywordSet;

/// Pretrained token → vector lookup. Unknown tokens are simply absent.
#[derive(Debug, Clone)]
pub struct WordVectors {
  dimension: usize,
  vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
  pub fn new(dimension: usize) -> Self {
    Self { dimension, vectors: HashMap::new() }
  }

  /// Add a vector; vectors of the wrong length are rejected
  pub fn insert(&mut self, token: impl Into<String>, vector: Vec<f32>) -> bool {
    if vector.len() != self.dimension {
      return false;
    }
    self.vectors.insert(token.into(), vector);
    true
  }

  pub fn len(&self) -> usize {
    self.vectors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vectors.is_empty()
  }

  pub fn get(&self, token: &str) -> Option<&[f32]> {
    self.vectors.get(token).map(|v| v.as_slice())
  }

  /// Element-wise mean of the vectors of every known keyword.
  ///
  /// Returns the zero vector when none of the keywords are in the table.
  pub fn mean_vector(&self, keywords: &KeywordSet) -> Vec<f32> {
    let mut sum = vec![0.0f32; self.dimension];
    let mut found = 0usize;

    for vector in keywords.iter().filter_map(|k| self.get(k)) {
      for (acc, value) in sum.iter_mut().zip(vector) {
        *acc += value;
      }
      found += 1;
    }

    if found > 0 {
      let n = found as f32;
      sum.iter_mut().for_each(|v| *v /= n);
    }
    sum
  }

  /// Load word2vec text format: `token v1 .. vN` per line, optional `count dim` header
  pub fn load<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| KafeError::data_load(path, e))?;
    let mut table = Self::new(dimension);
    let mut skipped = 0usize;

    for (line_no, line) in content.lines().enumerate() {
      let mut fields = line.split_whitespace();
      let Some(token) = fields.next() else { continue };
      let values: Vec<f32> = fields
        .map(|f| f.parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| KafeError::data_load(path, format!("line {}: {e}", line_no + 1)))?;

      if line_no == 0 && values.len() == 1 {
        // word2vec header: "<count> <dim>"
        continue;
      }
      if !table.insert(token, values) {
        skipped += 1;
      }
    }

    if skipped > 0 {
      warn!(skipped, dimension, "word vectors with unexpected length were ignored");
    }
    debug!(tokens = table.len(), path = %path.display(), "loaded word vectors");
    Ok(table)
  }
}

/// Precomputed embedding of one venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueVector {
  pub venue: String,
  pub vector: Vec<f32>,
  /// Carried through for display, never computed here
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avg_sentiment: Option<f32>,
}

/// Venue embedding matrix, in file order
#[derive(Debug, Clone, Default)]
pub struct VenueEmbeddings {
  rows: Vec<VenueVector>,
}

impl VenueEmbeddings {
  pub fn new(rows: Vec<VenueVector>) -> Self {
    Self { rows }
  }

  /// Load a JSON Lines table, skipping rows whose vector length is not `dimension`
  pub fn load<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| KafeError::data_load(path, e))?;
    let mut rows = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
      if line.trim().is_empty() {
        continue;
      }
      let row: VenueVector = serde_json::from_str(line)
        .map_err(|e| KafeError::data_load(path, format!("line {}: {e}", line_no + 1)))?;
      if row.vector.len() != dimension {
        warn!(
          venue = %row.venue,
          expected = dimension,
          actual = row.vector.len(),
          "skipping venue embedding with wrong dimension"
        );
        continue;
      }
      rows.push(row);
    }

    debug!(venues = rows.len(), path = %path.display(), "loaded venue embeddings");
    Ok(Self { rows })
  }

  pub fn rows(&self) -> &[VenueVector] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn get(&self, venue: &str) -> Option<&VenueVector> {
    self.rows.iter().find(|row| row.venue == venue)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn table() -> WordVectors {
    let mut wv = WordVectors::new(3);
    wv.insert("cozy", vec![1.0, 0.0, 0.0]);
    wv.insert("wifi", vec![0.0, 1.0, 0.0]);
    wv.insert("tenang", vec![0.0, 0.0, 4.0]);
    wv
  }

  #[test]
  fn test_mean_skips_unknown_keywords() {
    let keywords: KeywordSet = ["cozy", "wifi", "unknown"].into_iter().collect();
    assert_eq!(table().mean_vector(&keywords), vec![0.5, 0.5, 0.0]);
  }

  #[test]
  fn test_mean_of_nothing_known_is_zero_vector() {
    let keywords: KeywordSet = ["nope"].into_iter().collect();
    assert_eq!(table().mean_vector(&keywords), vec![0.0, 0.0, 0.0]);
    assert_eq!(table().mean_vector(&KeywordSet::new()).len(), 3);
  }

  #[test]
  fn test_mean_is_order_independent() {
    let a: KeywordSet = ["tenang", "cozy", "wifi"].into_iter().collect();
    let b: KeywordSet = ["wifi", "tenang", "cozy", "cozy"].into_iter().collect();
    assert_eq!(table().mean_vector(&a), table().mean_vector(&b));
  }

  #[test]
  fn test_insert_rejects_wrong_dimension() {
    let mut wv = WordVectors::new(3);
    assert!(!wv.insert("short", vec![1.0]));
    assert!(wv.is_empty());
  }

  #[test]
  fn test_load_word2vec_text_with_header() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "2 3").unwrap();
    writeln!(file, "cozy 1 0 0").unwrap();
    writeln!(file, "wifi 0 1 0").unwrap();
    writeln!(file, "bad 1 2").unwrap();

    let wv = WordVectors::load(file.path(), 3).unwrap();
    assert_eq!(wv.len(), 2);
    assert_eq!(wv.get("wifi"), Some(&[0.0, 1.0, 0.0][..]));
    assert!(wv.get("bad").is_none());
  }

  #[test]
  fn test_venue_table_skips_wrong_dimension() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"venue": "A", "vector": [1, 0, 0], "avg_sentiment": 0.8}}"#).unwrap();
    writeln!(file, r#"{{"venue": "B", "vector": [1, 0]}}"#).unwrap();

    let table = VenueEmbeddings::load(file.path(), 3).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("A").unwrap().avg_sentiment, Some(0.8));
    assert!(table.get("B").is_none());
  }
}
