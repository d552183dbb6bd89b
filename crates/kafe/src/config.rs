//! Configuration for the recommendation engine
//!
//! Resolves the data root, loads the optional `kafe.yaml` and carries the
//! ranking constants every component reads.

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::critique::DEFAULT_CRITIQUE_VOCABULARY;
use crate::error::{KafeError, Result};

pub const CONFIG_FILE_NAME: &str = "kafe.yaml";

/// Top-level configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Review corpus, JSON Lines
  #[serde(default = "default_reviews")]
  pub reviews: PathBuf,
  /// Venue embedding table, JSON Lines
  #[serde(default = "default_venues")]
  pub venues: PathBuf,
  /// Word-vector table, word2vec text format
  #[serde(default = "default_word_vectors")]
  pub word_vectors: PathBuf,
  /// Optional YAML taxonomy replacing the built-in lexicon
  #[serde(default)]
  pub taxonomy: Option<PathBuf>,
  /// Append-only case log
  #[serde(default = "default_casebase")]
  pub casebase: PathBuf,
  /// Saved interactive session
  #[serde(default = "default_session")]
  pub session: PathBuf,
  #[serde(default)]
  pub ranking: RankingSettings,
  #[serde(default = "default_critique_vocabulary")]
  pub critique_vocabulary: Vec<String>,
}

/// Constants shared by the scorers and rankers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSettings {
  #[serde(default = "default_keyword_top_n")]
  pub keyword_top_n: usize,
  #[serde(default = "default_similarity_top_n")]
  pub similarity_top_n: usize,
  /// Minimum cosine for a sub-aspect to count as matched in explanations
  #[serde(default = "default_aspect_threshold")]
  pub aspect_threshold: f32,
  /// Score subtracted per occurrence of an excluded token
  #[serde(default = "default_penalty_weight")]
  pub penalty_weight: f32,
  #[serde(default = "default_vector_dimension")]
  pub vector_dimension: usize,
}

fn default_reviews() -> PathBuf {
  PathBuf::from("reviews.jsonl")
}
fn default_venues() -> PathBuf {
  PathBuf::from("venues.jsonl")
}
fn default_word_vectors() -> PathBuf {
  PathBuf::from("word_vectors.txt")
}
fn default_casebase() -> PathBuf {
  PathBuf::from("casebase.jsonl")
}
fn default_session() -> PathBuf {
  PathBuf::from("session.json")
}
fn default_keyword_top_n() -> usize {
  10
}
fn default_similarity_top_n() -> usize {
  5
}
fn default_aspect_threshold() -> f32 {
  0.3
}
fn default_penalty_weight() -> f32 {
  0.01
}
fn default_vector_dimension() -> usize {
  100
}
fn default_critique_vocabulary() -> Vec<String> {
  DEFAULT_CRITIQUE_VOCABULARY.iter().map(|s| s.to_string()).collect()
}

impl Default for RankingSettings {
  fn default() -> Self {
    Self {
      keyword_top_n: default_keyword_top_n(),
      similarity_top_n: default_similarity_top_n(),
      aspect_threshold: default_aspect_threshold(),
      penalty_weight: default_penalty_weight(),
      vector_dimension: default_vector_dimension(),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      reviews: default_reviews(),
      venues: default_venues(),
      word_vectors: default_word_vectors(),
      taxonomy: None,
      casebase: default_casebase(),
      session: default_session(),
      ranking: RankingSettings::default(),
      critique_vocabulary: default_critique_vocabulary(),
    }
  }
}

impl Config {
  /// Load configuration from a YAML file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| KafeError::data_load(path, e))?;
    serde_yaml::from_str(&content).map_err(|e| KafeError::data_load(path, e))
  }

  /// Load `kafe.yaml` from the data root, falling back to defaults
  pub fn load(root: &Path) -> Result<Self> {
    let path = root.join(CONFIG_FILE_NAME);
    if path.exists() {
      Self::load_from_file(path)
    } else {
      Ok(Self::default())
    }
  }

  /// Resolve every relative path against the data root
  pub fn resolve(mut self, root: &Path) -> Self {
    self.reviews = root.join(&self.reviews);
    self.venues = root.join(&self.venues);
    self.word_vectors = root.join(&self.word_vectors);
    self.taxonomy = self.taxonomy.map(|t| root.join(t));
    self.casebase = match std::env::var("KAFE_CASEBASE") {
      Ok(custom) => PathBuf::from(custom),
      Err(_) => root.join(&self.casebase),
    };
    self.session = root.join(&self.session);
    self
  }
}

/// Get the data root directory (~/.kafe)
pub fn get_data_root() -> Result<PathBuf> {
  // Allow tests or callers to override the root directory via env var
  if let Ok(custom_root) = std::env::var("KAFE_DATA_ROOT") {
    return Ok(PathBuf::from(custom_root));
  }

  let home = home_dir().ok_or_else(|| KafeError::DataLoad {
    path: "~".to_string(),
    message: "Could not find home directory".to_string(),
  })?;
  Ok(home.join(".kafe"))
}
