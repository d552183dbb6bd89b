//! Aspect taxonomy: category → sub-aspect → keyword list
//!
//! Keyword lists may overlap across sub-aspects ("ramai" is both a mood and a
//! music keyword). Nothing here treats that as an error.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{KafeError, Result};

const BUILTIN_TAXONOMY: &[(&str, &[(&str, &[&str])])] = &[
  (
    "Desain lokasi",
    &[
      ("Cozy-homey", &["cozy", "homey", "rumah", "hangat", "nyaman"]),
      ("Minimalist/modern style", &["minimal", "modern", "kekinian", "instagramable", "aesthetic"]),
      ("Nature-styled", &["tanaman", "alam", "asri", "sejuk", "hutan", "pepohonan"]),
    ],
  ),
  (
    "Tipe kafe",
    &[
      ("Indoor", &["indoor"]),
      ("Outdoor", &["outdoor"]),
      ("Keduanya", &["indooroutdoor", "outdoorindoor", "semiindoor", "semioutdoor"]),
    ],
  ),
  (
    "Keunikan kafe",
    &[
      ("Harga terjangkau", &["murah", "terjangkau", "affordable"]),
      ("Mewah", &["mewah", "premium", "mahal", "elegan"]),
      (
        "Reputasi pelayanan yang tinggi",
        &["ramah", "pelayan", "pelayanannya", "staff", "service", "responsif"],
      ),
      ("Reputasi kebersihan yang tinggi", &["bersih", "kebersihan"]),
    ],
  ),
  (
    "Suasana lokasi",
    &[
      ("Tenang/regang/luas", &["tenang", "luas", "adem", "lega", "sepi"]),
      ("Ramai", &["ramai", "rame", "penuh", "berisik", "bising"]),
    ],
  ),
  (
    "Sirkulasi Udara",
    &[
      ("Sirkulasi udara alami", &["angin", "sejuk", "alami"]),
      ("Sirkulasi udara tertutup (AC)", &["ac", "dingin", "tertutup"]),
    ],
  ),
  (
    "Aksesibilitas",
    &[
      ("Friendly for disabled people", &["akses", "ramah", "kursi_roda", "disabilitas"]),
      ("Memiliki view alam", &["view", "pemandangan", "alam"]),
      ("Berlokasi di kota", &["kota", "pusat", "strategis"]),
      ("Lokasi parkir yang luas", &["parkir", "parkiran", "parkirnya", "mobil"]),
    ],
  ),
  (
    "Fasilitas Tambahan",
    &[
      ("Wifi", &["wifi", "internet", "wifinya"]),
      ("Stop kontak", &["colokan", "stopkontak", "colok"]),
      ("Toilet", &["toilet", "wc", "kamar_mandi", "toiletnya"]),
      ("Musholla", &["musholla", "mushola", "musola", "musholanya", "tempat_sholat"]),
      ("Smoking area", &["smoking", "smoking_area", "merokok", "rokok", "ruang_merokok"]),
    ],
  ),
  (
    "Suasana Musik",
    &[
      ("Live musik", &["live", "musik", "band", "acara", "performance"]),
      ("Genre musik santai", &["backsound", "musik_santai", "lagu_santai", "ambience"]),
      ("Genre musik upbeat", &["musik_upbeat", "musik_keras", "upbeat", "ramai"]),
      ("Tidak bermusik", &["tidak_ada_musik", "tanpa_musik", "hening"]),
    ],
  ),
  (
    "Kebutuhan agenda",
    &[
      ("Untuk nongkrong", &["nongkrong", "bareng", "ngumpul", "teman", "hangout", "santai"]),
      ("Work from café", &["wfc", "nugas", "kerja", "laptop", "wfh"]),
      (
        "Meeting kantor/pertemuan komunitas",
        &["meeting", "rapat", "komunitas", "diskusi", "presentasi"],
      ),
    ],
  ),
  (
    "Tipe Menu",
    &[
      ("Western", &["steak", "pasta", "burger", "western", "pizza"]),
      ("Asian", &["nasi", "mie", "ramen", "korea", "asian", "jepang", "sushi"]),
      ("Patisserie", &["croissant", "cake", "kue", "dessert", "pastry", "patisserie"]),
      (
        "Fokus ke minuman",
        &["kopi", "coffee", "drink", "minuman", "latte", "americano", "espresso"],
      ),
      ("Snacks and desserts", &["snack", "cemilan", "dessert", "roti", "manis"]),
    ],
  ),
];

/// Canonical set-of-tokens type used for query keywords and exclusion sets.
///
/// Iteration is sorted, so anything folded over a `KeywordSet` (vector means,
/// counts) is independent of the order the user picked things in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
  pub fn new() -> Self {
    Self(BTreeSet::new())
  }

  pub fn insert(&mut self, token: impl Into<String>) -> bool {
    self.0.insert(token.into())
  }

  pub fn contains(&self, token: &str) -> bool {
    self.0.contains(token)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &String> {
    self.0.iter()
  }

  pub fn to_vec(&self) -> Vec<String> {
    self.0.iter().cloned().collect()
  }
}

impl<S: Into<String>> FromIterator<S> for KeywordSet {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self(iter.into_iter().map(Into::into).collect())
  }
}

impl<'a> IntoIterator for &'a KeywordSet {
  type Item = &'a String;
  type IntoIter = std::collections::btree_set::Iter<'a, String>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// Category name → selected sub-aspect labels within it
pub type AspectLabelMap = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAspect {
  pub label: String,
  pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub name: String,
  pub sub_aspects: Vec<SubAspect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
  categories: Vec<Category>,
}

/// A sub-aspect the user ticked, expanded to its keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedAspect {
  pub category: String,
  pub label: String,
  pub keywords: Vec<String>,
}

/// The set of selected sub-aspects, in taxonomy order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
  pub aspects: Vec<SelectedAspect>,
}

impl Query {
  pub fn is_empty(&self) -> bool {
    self.aspects.is_empty()
  }

  /// Union of every selected sub-aspect's keywords
  pub fn keyword_set(&self) -> KeywordSet {
    self.aspects.iter().flat_map(|a| a.keywords.iter().cloned()).collect()
  }

  pub fn label_map(&self) -> AspectLabelMap {
    let mut map = AspectLabelMap::new();
    for aspect in &self.aspects {
      map.entry(aspect.category.clone()).or_default().insert(aspect.label.clone());
    }
    map
  }

  pub fn labels(&self) -> Vec<&str> {
    self.aspects.iter().map(|a| a.label.as_str()).collect()
  }
}

impl Default for Taxonomy {
  fn default() -> Self {
    Self::builtin()
  }
}

impl Taxonomy {
  /// The lexicon used by the cafe experiment
  pub fn builtin() -> Self {
    let categories = BUILTIN_TAXONOMY
      .iter()
      .map(|(name, subs)| Category {
        name: name.to_string(),
        sub_aspects: subs
          .iter()
          .map(|(label, keywords)| SubAspect {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
          })
          .collect(),
      })
      .collect();
    Self { categories }
  }

  /// Load a `category: { sub_aspect: [keyword, ...] }` YAML file, keeping file order
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| KafeError::data_load(path, e))?;
    Self::from_yaml(&content).map_err(|message| KafeError::data_load(path, message))
  }

  fn from_yaml(content: &str) -> std::result::Result<Self, String> {
    let root: serde_yaml::Mapping = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let mut categories = Vec::new();

    for (name, subs) in root {
      let name = name.as_str().ok_or("category names must be strings")?.to_string();
      let subs = subs
        .as_mapping()
        .ok_or_else(|| format!("category '{name}' must map sub-aspects to keyword lists"))?;

      let mut sub_aspects = Vec::new();
      for (label, keywords) in subs {
        let label = label.as_str().ok_or("sub-aspect names must be strings")?.to_string();
        let keywords: Vec<String> = serde_yaml::from_value(keywords.clone())
          .map_err(|e| format!("keywords of '{label}': {e}"))?;
        sub_aspects.push(SubAspect { label, keywords });
      }
      categories.push(Category { name, sub_aspects });
    }

    Ok(Self { categories })
  }

  pub fn categories(&self) -> &[Category] {
    &self.categories
  }

  pub fn sub_aspect_count(&self) -> usize {
    self.categories.iter().map(|c| c.sub_aspects.len()).sum()
  }

  /// Build a query from sub-aspect labels (case-insensitive), in taxonomy order
  pub fn select<S: AsRef<str>>(&self, labels: &[S]) -> Result<Query> {
    let wanted: Vec<String> = labels.iter().map(|l| l.as_ref().trim().to_lowercase()).collect();

    for label in &wanted {
      if !self.has_label(label) {
        return Err(KafeError::unknown_aspect(label.clone()));
      }
    }

    let aspects = self
      .categories
      .iter()
      .flat_map(|category| {
        category.sub_aspects.iter().map(move |sub| (category, sub))
      })
      .filter(|(_, sub)| wanted.contains(&sub.label.to_lowercase()))
      .map(|(category, sub)| SelectedAspect {
        category: category.name.clone(),
        label: sub.label.clone(),
        keywords: sub.keywords.clone(),
      })
      .collect();

    Ok(Query { aspects })
  }

  fn has_label(&self, lowered: &str) -> bool {
    self
      .categories
      .iter()
      .flat_map(|c| c.sub_aspects.iter())
      .any(|sub| sub.label.to_lowercase() == lowered)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_builtin_has_all_categories() {
    let taxonomy = Taxonomy::builtin();
    assert_eq!(taxonomy.categories().len(), 10);
    assert_eq!(taxonomy.sub_aspect_count(), 35);
  }

  #[test]
  fn test_select_is_case_insensitive_and_taxonomy_ordered() {
    let taxonomy = Taxonomy::builtin();
    let query = taxonomy.select(&["wifi", "COZY-HOMEY"]).unwrap();
    assert_eq!(query.labels(), vec!["Cozy-homey", "Wifi"]);
  }

  #[test]
  fn test_select_unknown_label_fails() {
    let taxonomy = Taxonomy::builtin();
    let err = taxonomy.select(&["Rooftop"]).unwrap_err();
    assert!(err.to_string().contains("rooftop"));
  }

  #[test]
  fn test_overlapping_keywords_collapse_in_keyword_set() {
    let taxonomy = Taxonomy::builtin();
    let query = taxonomy.select(&["Ramai", "Genre musik upbeat"]).unwrap();
    let keywords = query.keyword_set();
    // "ramai" belongs to both sub-aspects
    assert_eq!(keywords.len(), 8);
    assert!(keywords.contains("ramai"));
  }

  #[test]
  fn test_label_map_groups_by_category() {
    let taxonomy = Taxonomy::builtin();
    let query = taxonomy.select(&["Wifi", "Toilet", "Indoor"]).unwrap();
    let map = query.label_map();
    assert_eq!(map.len(), 2);
    assert_eq!(map["Fasilitas Tambahan"].len(), 2);
    assert!(map["Tipe kafe"].contains("Indoor"));
  }

  #[test]
  fn test_keyword_set_ignores_order_and_duplicates() {
    let a: KeywordSet = ["wifi", "cozy", "wifi"].into_iter().collect();
    let b: KeywordSet = ["cozy", "wifi"].into_iter().collect();
    assert_eq!(a, b);
  }
}
