//! Display formatting utilities for CLI output

use colored::*;

use crate::casebase::Case;
use crate::critique::CritiqueCount;
use crate::engine::VenueDetail;
use crate::keyword::KeywordMatch;
use crate::lexicon::{KeywordSet, Taxonomy};
use crate::ranker::AspectRelevance;

/// Join labels as "a, b and c"
pub fn join_labels(labels: &[&str]) -> String {
  match labels {
    [] => String::new(),
    [only] => only.to_string(),
    [init @ .., last] => format!("{} and {}", init.join(", "), last),
  }
}

/// Matched sub-aspects with their mean similarity, or "-" when none cleared the threshold
pub fn format_relevance(relevance: &AspectRelevance) -> String {
  match relevance.average() {
    Some(avg) => {
      let labels: Vec<&str> = relevance.matched.iter().map(|(l, _)| l.as_str()).collect();
      format!("{} (sim: {avg:.2})", join_labels(&labels))
    }
    None => "-".to_string(),
  }
}

pub fn format_critiques(critiques: &[CritiqueCount]) -> String {
  if critiques.is_empty() {
    return "No common critiques found in reviews.".to_string();
  }
  let parts: Vec<String> =
    critiques.iter().map(|c| format!("{} mention '{}'", c.count, c.token)).collect();
  format!("Common critiques: {}", parts.join(", "))
}

/// One Application 1 result
pub fn format_keyword_match(result: &KeywordMatch) -> Vec<String> {
  let matched: Vec<String> =
    result.aspect_mentions.iter().map(|(label, count)| format!("{label} ({count}x)")).collect();

  vec![
    format!("=== {} ===", result.venue.yellow().bold()),
    format!("Matches because reviews mention: {}", matched.join(", ")),
    format!(
      "Total: {} mentions across {} sub-aspect(s)",
      result.total_mentions, result.matched_sub_aspect_count
    ),
  ]
}

/// One Application 2 result with its explanation
pub fn format_venue_detail(detail: &VenueDetail, excluded: &KeywordSet) -> Vec<String> {
  let ranked = &detail.ranked;
  let mut lines = vec![format!("=== {} ===", ranked.venue.yellow().bold())];

  lines.push(format!("  Similarity score : {:.4}", ranked.similarity));
  if let Some(sentiment) = ranked.avg_sentiment {
    lines.push(format!("  Avg sentiment    : {sentiment:.2}"));
  }
  lines.push(format!("  Final score      : {:.4}", ranked.final_score));
  lines.push(format!("  Matches          : {}", format_relevance(&detail.relevance)));

  let mentions = if detail.mentions.is_empty() {
    "No relevant reviews.".to_string()
  } else {
    let parts: Vec<String> =
      detail.mentions.iter().map(|(k, v)| format!("{v} mention '{k}'")).collect();
    parts.join(", ")
  };
  lines.push(format!("  Reviews          : {} review(s), {mentions}", detail.review_count));
  lines.push(format!("  {}", format_critiques(&detail.critiques)));

  if !excluded.is_empty() {
    lines.push(format!("  Avoiding         : {}", excluded.to_vec().join(", ")));
  }
  if ranked.relaxed {
    lines.push(format!("  {}", "(admitted by relaxed filter)".dimmed()));
  }
  lines
}

pub fn format_case(case: &Case) -> Vec<String> {
  let labels: Vec<String> = case
    .aspect_labels
    .iter()
    .map(|(category, subs)| {
      let subs: Vec<&str> = subs.iter().map(|s| s.as_str()).collect();
      format!("{category}: {}", subs.join(", "))
    })
    .collect();

  let when = case
    .timestamp
    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
    .unwrap_or_else(|| "-".to_string());
  let by = case.submitter.as_ref().map(|s| s.name.as_str()).unwrap_or("anonymous");

  vec![
    format!("{} {} ({by}, {when})", "→".cyan(), case.selected_venue.yellow().bold()),
    format!("  Preferences: {}", labels.join("; ")),
    format!("  Keywords: {}", case.keywords.to_vec().join(", ")),
    format!("  Choice: {}", case.compare_choice),
  ]
}

/// Taxonomy listing: categories, sub-aspects and their keywords
pub fn format_taxonomy(taxonomy: &Taxonomy) -> Vec<String> {
  let mut lines = Vec::new();
  for category in taxonomy.categories() {
    lines.push(format!("{}", category.name.blue().bold()));
    for sub in &category.sub_aspects {
      lines.push(format!("  {} {}", sub.label.green(), format!("[{}]", sub.keywords.join(", ")).dimmed()));
    }
  }
  lines
}

pub fn print_lines(lines: &[String]) {
  for line in lines {
    println!("{line}");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ranker::RankedVenue;

  #[test]
  fn test_join_labels() {
    assert_eq!(join_labels(&[]), "");
    assert_eq!(join_labels(&["Wifi"]), "Wifi");
    assert_eq!(join_labels(&["Wifi", "Toilet", "Indoor"]), "Wifi, Toilet and Indoor");
  }

  #[test]
  fn test_relevance_without_match_is_dash() {
    assert_eq!(format_relevance(&AspectRelevance::default()), "-");
  }

  #[test]
  fn test_relevance_lists_labels_and_average() {
    let relevance = AspectRelevance {
      matched: vec![("Wifi".to_string(), 0.8), ("Cozy-homey".to_string(), 0.6)],
    };
    assert_eq!(format_relevance(&relevance), "Wifi and Cozy-homey (sim: 0.70)");
  }

  #[test]
  fn test_venue_detail_reports_review_count() {
    let detail = VenueDetail {
      ranked: RankedVenue {
        venue: "Kopi Senja".to_string(),
        similarity: 0.9,
        penalty: 0,
        final_score: 0.9,
        avg_sentiment: None,
        relaxed: false,
      },
      relevance: AspectRelevance::default(),
      review_count: 4,
      mentions: [("wifi".to_string(), 2)].into_iter().collect(),
      critiques: Vec::new(),
    };

    let lines = format_venue_detail(&detail, &KeywordSet::new()).join("\n");
    assert!(lines.contains("4 review(s), 2 mention 'wifi'"));
    assert!(!lines.contains("Avoiding"));
  }

  #[test]
  fn test_critiques_text() {
    assert!(format_critiques(&[]).contains("No common critiques"));
    let text = format_critiques(&[CritiqueCount { token: "kotor".into(), count: 3 }]);
    assert!(text.contains("3 mention 'kotor'"));
  }
}
