use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use kafe::casebase::{CaseStore, CompareChoice, Identity, JsonlCaseStore};
use kafe::config::{self, Config};
use kafe::display;
use kafe::lexicon::{KeywordSet, Taxonomy};
use kafe::session::Session;
use kafe::Engine;

#[derive(Parser)]
#[command(name = "kafe")]
#[command(
  about = "Kafe - Cafe Recommendation Engine\nKeyword search, embedding recommendations and case memory over cafe reviews"
)]
#[command(version)]
struct Cli {
  /// Configuration file (defaults to kafe.yaml in the data root)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,
  #[command(subcommand)]
  command: Commands,
}

/// Who is recording the case
#[derive(Args)]
struct SubmitterArgs {
  /// Full name
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  age: Option<u32>,
  #[arg(long)]
  gender: Option<String>,
  /// How often you visit cafes (casual, frequent)
  #[arg(long)]
  visitor_kind: Option<String>,
  #[arg(long)]
  email: Option<String>,
}

impl SubmitterArgs {
  fn into_identity(self) -> Option<Identity> {
    let name = self.name?.trim().to_string();
    if name.is_empty() {
      return None;
    }
    Some(Identity {
      name,
      age: self.age,
      gender: self.gender,
      visitor_kind: self.visitor_kind,
      email: self.email.filter(|e| !e.trim().is_empty()),
    })
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum CompareArg {
  /// The results before refinement fit better
  Before,
  /// The refined results fit better
  After,
  /// No difference between the two
  Same,
}

impl From<CompareArg> for CompareChoice {
  fn from(arg: CompareArg) -> Self {
    match arg {
      CompareArg::Before => CompareChoice::BeforeRefinement,
      CompareArg::After => CompareChoice::AfterRefinement,
      CompareArg::Same => CompareChoice::NoDifference,
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// List categories, sub-aspects and their keywords
  Aspects,
  /// Exact keyword search over reviews (Application 1)
  Search {
    /// Sub-aspect labels, e.g. "Cozy-homey" Wifi
    #[arg(required = true)]
    aspects: Vec<String>,
  },
  /// Recommend by meaning similarity (Application 2)
  Recommend {
    /// Sub-aspect labels, e.g. "Cozy-homey" Wifi
    #[arg(required = true)]
    aspects: Vec<String>,
    /// Ignore a prior user's choice for the same preferences
    #[arg(short, long)]
    fresh: bool,
  },
  /// Refine the current recommendations
  Refine {
    /// Sub-aspects to add to the current selection
    aspects: Vec<String>,
    /// Sub-aspects to remove from the current selection
    #[arg(short, long)]
    drop: Vec<String>,
    /// Critique tokens the venue's reviews should not mention
    #[arg(short, long)]
    exclude: Vec<String>,
  },
  /// Save your final venue choice to the case memory
  Choose {
    /// Venue name, exactly as shown
    venue: String,
    /// Which result list fit better (only after refinement)
    #[arg(long, value_enum)]
    compare: Option<CompareArg>,
    #[command(flatten)]
    submitter: SubmitterArgs,
  },
  /// List recorded cases
  Cases,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = load_config(cli.config.as_deref())?;
  let store = JsonlCaseStore::new(&config.casebase);

  match cli.command {
    Commands::Aspects => {
      display::print_lines(&display::format_taxonomy(&taxonomy_for(&config)?));
    }
    Commands::Search { aspects } => {
      let engine = Engine::load(&config)?;
      search(&engine, &aspects)?;
    }
    Commands::Recommend { aspects, fresh } => {
      let engine = Engine::load(&config)?;
      recommend(&engine, &store, &config.session, &aspects, fresh)?;
    }
    Commands::Refine { aspects, drop, exclude } => {
      let engine = Engine::load(&config)?;
      refine(&engine, &config.session, &aspects, &drop, &exclude)?;
    }
    Commands::Choose { venue, compare, submitter } => {
      let engine = Engine::load(&config)?;
      choose(&engine, &store, &config.session, &venue, compare, submitter)?;
    }
    Commands::Cases => {
      list_cases(&store)?;
    }
  }

  Ok(())
}

fn init_logging(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("kafe=debug")
    } else {
      EnvFilter::new("kafe=warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
  let root = config::get_data_root()?;
  let config = match path {
    Some(path) => Config::load_from_file(path)?,
    None => Config::load(&root)?,
  };
  Ok(config.resolve(&root))
}

fn taxonomy_for(config: &Config) -> Result<Taxonomy> {
  Ok(match &config.taxonomy {
    Some(path) => Taxonomy::load_from_file(path)?,
    None => Taxonomy::builtin(),
  })
}

fn search(engine: &Engine, aspects: &[String]) -> Result<()> {
  let query = engine.taxonomy().select(aspects)?;
  let results = engine.score_by_keywords(&query)?;

  if results.is_empty() {
    println!("No cafes found for: {}", query.labels().join(", ").yellow());
    return Ok(());
  }

  println!("{} Top {} cafes by keyword match:\n", "✓".green(), results.len());
  for result in &results {
    display::print_lines(&display::format_keyword_match(result));
    println!();
  }
  Ok(())
}

fn recommend(
  engine: &Engine,
  store: &dyn CaseStore,
  session_path: &Path,
  aspects: &[String],
  fresh: bool,
) -> Result<()> {
  let query = engine.taxonomy().select(aspects)?;
  let session = Session::start(engine, store, query, fresh)?;

  if let Some(case) = &session.prior_case {
    println!(
      "{} These preferences were searched before; that user chose {}",
      "↻".cyan(),
      case.selected_venue.yellow().bold()
    );
    if session.replayed {
      println!("  Showing their choice. Run with --fresh for new recommendations.\n");
    } else {
      println!();
    }
  }

  println!("{} Top {} recommendations:\n", "✓".green(), session.baseline.len());
  show_results(engine, &session);
  show_critique_candidates(engine, &session);

  session.save(session_path)?;
  Ok(())
}

fn refine(
  engine: &Engine,
  session_path: &Path,
  added: &[String],
  dropped: &[String],
  exclude: &[String],
) -> Result<()> {
  let mut session = Session::load(session_path)?;

  let dropped: Vec<String> = dropped.iter().map(|d| d.trim().to_lowercase()).collect();
  let mut labels: Vec<String> = session
    .query
    .labels()
    .into_iter()
    .filter(|label| !dropped.contains(&label.to_lowercase()))
    .map(|label| label.to_string())
    .collect();
  labels.extend(added.iter().cloned());

  let query = engine.taxonomy().select(&labels)?;
  let excluded: KeywordSet = exclude.iter().map(|e| e.trim().to_lowercase()).collect();

  let count = session.refine(engine, query, excluded)?.len();
  println!("{} {} recommendations after refinement:\n", "✓".green(), count);
  show_results(engine, &session);

  session.save(session_path)?;
  Ok(())
}

fn choose(
  engine: &Engine,
  store: &dyn CaseStore,
  session_path: &Path,
  venue: &str,
  compare: Option<CompareArg>,
  submitter: SubmitterArgs,
) -> Result<()> {
  let session = Session::load(session_path)?;
  let case = session.choose(venue, compare.map(Into::into), submitter.into_identity())?;

  match engine.record_case(store, case) {
    Ok(case) => {
      println!("{} Saved '{}' to the case memory", "✓".green(), case.selected_venue.yellow());
      Session::clear(session_path)?;
      Ok(())
    }
    Err(e) => {
      eprintln!("{} Could not save your choice: {e}", "✗".red());
      if e.is_recoverable() {
        eprintln!("  Your session is kept, run the same command again to retry.");
      }
      Err(e.into())
    }
  }
}

fn list_cases(store: &dyn CaseStore) -> Result<()> {
  let cases = store.scan()?;
  if cases.is_empty() {
    println!("No cases recorded yet");
    return Ok(());
  }

  for case in &cases {
    display::print_lines(&display::format_case(case));
  }
  Ok(())
}

fn show_results(engine: &Engine, session: &Session) {
  for ranked in session.current_results() {
    let detail = engine.detail(ranked, &session.query);
    display::print_lines(&display::format_venue_detail(&detail, &session.excluded));
    println!();
  }
}

fn show_critique_candidates(engine: &Engine, session: &Session) {
  let candidates = engine.critique_candidates(&session.baseline);
  if candidates.is_empty() {
    return;
  }

  let parts: Vec<String> = candidates.iter().map(|c| format!("{} ({})", c.token, c.count)).collect();
  println!("Not satisfied? Critiques you can avoid: {}", parts.join(", "));
  println!("  e.g. kafe refine --exclude {}", candidates[0].token);
}
