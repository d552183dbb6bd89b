use std::path::Path;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KafeError>;

#[derive(Error, Debug)]
pub enum KafeError {
  #[error("Select at least one sub-aspect before searching")]
  EmptyQuery,

  #[error("Case store unavailable: {message}")]
  StoreUnavailable { message: String },

  #[error("Failed to load {path}: {message}")]
  DataLoad { path: String, message: String },

  #[error("Unknown sub-aspect '{label}'")]
  UnknownAspect { label: String },

  #[error("Venue '{name}' is not among the offered results")]
  UnknownVenue { name: String },

  #[error("No recommendation session found, run `kafe recommend` first")]
  NoSession,
}

impl KafeError {
  pub fn store_unavailable(message: impl Into<String>) -> Self {
    Self::StoreUnavailable { message: message.into() }
  }

  pub fn data_load(path: &Path, message: impl ToString) -> Self {
    Self::DataLoad { path: path.display().to_string(), message: message.to_string() }
  }

  pub fn unknown_aspect(label: impl Into<String>) -> Self {
    Self::UnknownAspect { label: label.into() }
  }

  pub fn unknown_venue(name: impl Into<String>) -> Self {
    Self::UnknownVenue { name: name.into() }
  }

  /// Store failures are recoverable; everything else ends the operation.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::StoreUnavailable { .. })
  }
}
