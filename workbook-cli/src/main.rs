//! Workbook CLI - headless wizard for improvement projects

// Global invariants enforced:
// - One edit per invocation: load the record, apply the edit, save the full record
// - Deterministic output ordering
// - Identical records yield byte-for-byte identical reports

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use workbook_core::config;
use workbook_core::preferences::{Language, Theme};
use workbook_core::report::report_file_name;
use workbook_core::store::{atomic_write, FileBackend};
use workbook_core::{
    render, AdvanceError, Column, Criterion, CriterionIndex, Evaluation, IdeaIndex, Preferences,
    ProjectRecord, ProjectStore, ProjectSummary, ReportFormat, ResolvedConfig, RiskIndex, Slot,
    Step, TaskIndex, TaskRow, Wizard,
};

#[derive(Parser)]
#[command(name = "workbook")]
#[command(about = "Improvement-project workbook: criteria, ideas, concepts, risks and tasks")]
#[command(version)]
struct Cli {
    /// Directory holding project.json and preferences.json (overrides config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty record if none exists
    Init,
    /// Set the project name and description
    Project {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Set a criterion label and weight
    Criterion {
        #[arg(value_parser = bounded::<CriterionIndex>)]
        index: CriterionIndex,
        #[arg(long)]
        label: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        weight: Option<f64>,
        /// Remove the weight
        #[arg(long, conflicts_with = "weight")]
        clear_weight: bool,
    },
    /// Set an idea's text (empty text clears it)
    Idea {
        #[arg(value_parser = bounded::<IdeaIndex>)]
        index: IdeaIndex,
        text: String,
    },
    /// Rate an idea on one criterion (omit the rating to clear it)
    RateIdea {
        #[arg(value_parser = bounded::<IdeaIndex>)]
        idea: IdeaIndex,
        #[arg(value_parser = bounded::<CriterionIndex>)]
        criterion: CriterionIndex,
        #[arg(allow_negative_numbers = true)]
        rating: Option<f64>,
    },
    /// Compute idea scores (all existing ideas when no index is given)
    ScoreIdea {
        #[arg(value_parser = bounded::<IdeaIndex>)]
        idea: Option<IdeaIndex>,
    },
    /// Set one of an idea's three possibilities
    Possibility {
        #[arg(value_parser = bounded::<IdeaIndex>)]
        idea: IdeaIndex,
        #[arg(value_parser = bounded::<Slot>)]
        slot: Slot,
        text: String,
    },
    /// Choose an idea's possibility for a formation column
    Select {
        #[arg(value_parser = bounded::<IdeaIndex>)]
        idea: IdeaIndex,
        #[arg(value_parser = bounded::<Column>)]
        column: Column,
        /// Possibility slot to select
        #[arg(long, value_parser = bounded::<Slot>, conflicts_with_all = ["text", "clear"])]
        slot: Option<Slot>,
        /// Free text to select
        #[arg(long, conflicts_with = "clear")]
        text: Option<String>,
        /// Remove the selection
        #[arg(long)]
        clear: bool,
    },
    /// Rate a formed concept on one criterion (omit the rating to clear it)
    RateFormed {
        #[arg(value_parser = bounded::<Column>)]
        column: Column,
        #[arg(value_parser = bounded::<CriterionIndex>)]
        criterion: CriterionIndex,
        #[arg(allow_negative_numbers = true)]
        rating: Option<f64>,
    },
    /// Compute formed-concept scores (all three when no column is given)
    ScoreFormed {
        #[arg(value_parser = bounded::<Column>)]
        column: Option<Column>,
    },
    /// Show the best formed concept
    Best,
    /// Edit a prevention matrix entry
    Risk {
        #[arg(value_parser = bounded::<RiskIndex>)]
        index: RiskIndex,
        #[arg(long)]
        failure: Option<String>,
        #[arg(long)]
        effect: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        severity: Option<f64>,
        /// Remove the severity
        #[arg(long, conflicts_with = "severity")]
        clear_severity: bool,
        #[arg(long, allow_negative_numbers = true)]
        occurrence: Option<f64>,
        /// Remove the occurrence
        #[arg(long, conflicts_with = "occurrence")]
        clear_occurrence: bool,
        #[arg(long)]
        action_planned: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
        #[arg(long)]
        recorded_date: Option<String>,
        #[arg(long)]
        action_taken: Option<String>,
        #[arg(long)]
        completion_date: Option<String>,
    },
    /// Compute risk = severity x occurrence for an entry
    ComputeRisk {
        #[arg(value_parser = bounded::<RiskIndex>)]
        index: RiskIndex,
    },
    /// Edit a task plan row
    Task {
        #[arg(value_parser = bounded::<TaskIndex>)]
        row: TaskIndex,
        #[arg(long)]
        person: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        output: Option<String>,
    },
    /// Check whether a step may be left
    Check {
        #[arg(value_parser = parse_step)]
        step: Step,
    },
    /// Check a step's gate and move to the next step
    Advance {
        #[arg(value_parser = parse_step)]
        step: Step,
    },
    /// Render the project report
    Report {
        /// Output format (overrides config file)
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Output file path (default: stdout, or report_dir from config)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show or change display preferences
    Prefs {
        #[arg(long, value_parser = parse_language)]
        language: Option<Language>,
        #[arg(long, value_parser = parse_theme, conflicts_with = "toggle_theme")]
        theme: Option<Theme>,
        #[arg(long)]
        toggle_theme: bool,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

/// Parse a 1-based index into one of the bounded index types
fn bounded<T: TryFrom<usize, Error = String>>(s: &str) -> Result<T, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a positive number", s))?;
    T::try_from(n)
}

fn parse_step(s: &str) -> Result<Step, String> {
    Step::parse(s).ok_or_else(|| {
        let names: Vec<&str> = Step::all().map(|step| step.as_str()).collect();
        format!("unknown step `{}` (expected one of: {})", s, names.join(", "))
    })
}

fn parse_language(s: &str) -> Result<Language, String> {
    Language::parse(s).ok_or_else(|| format!("unknown language `{}` (expected es or en)", s))
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    Theme::parse(s).ok_or_else(|| format!("unknown theme `{}` (expected light or dark)", s))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cwd = std::env::current_dir()?;
    run(cli, &cwd)
}

/// Execute one command with `root` as the working directory
fn run(cli: Cli, root: &Path) -> anyhow::Result<()> {
    // `config validate` must report a broken config file rather than fail on it
    let mut resolved = if matches!(cli.command, Commands::Config { .. }) {
        ResolvedConfig::defaults(root)?
    } else {
        config::load_and_resolve(root, cli.config.as_deref())
            .context("failed to load configuration")?
    };
    if let Some(dir) = cli.data_dir {
        resolved.data_dir = root.join(dir);
    }
    let mut store = ProjectStore::open(&resolved.data_dir);

    match cli.command {
        Commands::Init => {
            let record = load(&store)?;
            save(&mut store, &record)?;
            println!("Workbook ready at {}", store.backend().path().display());
        }
        Commands::Project { name, description } => {
            if name.is_none() && description.is_none() {
                anyhow::bail!("nothing to change: pass --name and/or --description");
            }
            edit(&mut store, |record| {
                if let Some(name) = name {
                    record.set_project_name(&name);
                }
                if let Some(description) = description {
                    record.set_project_description(&description);
                }
                Ok(())
            })?;
        }
        Commands::Criterion {
            index,
            label,
            weight,
            clear_weight,
        } => {
            edit(&mut store, |record| {
                let current = record.criterion(index).cloned().unwrap_or_default();
                let label = label.unwrap_or(current.label);
                let weight = if clear_weight {
                    None
                } else {
                    weight.or(current.weight)
                };
                record.set_criterion(index, Criterion::new(&label, weight));
                let sum = record.weight_sum();
                println!(
                    "Criterion {}: {} (weight sum {:.1})",
                    index,
                    record.criterion_label(index),
                    sum
                );
                Ok(())
            })?;
        }
        Commands::Idea { index, text } => {
            edit(&mut store, |record| {
                record.set_idea(index, &text);
                Ok(())
            })?;
        }
        Commands::RateIdea {
            idea,
            criterion,
            rating,
        } => {
            edit(&mut store, |record| {
                record.set_idea_rating(idea, criterion, rating);
                if matches!(record.idea_result(idea), Evaluation::Stale(_)) {
                    println!("Idea {} score is outdated; run score-idea {}", idea, idea);
                }
                Ok(())
            })?;
        }
        Commands::ScoreIdea { idea } => {
            edit(&mut store, |record| {
                let ideas = match idea {
                    Some(idea) => vec![idea],
                    None => record.existing_ideas(),
                };
                for idea in ideas {
                    let total = record
                        .score_idea(idea)
                        .with_context(|| format!("cannot score idea {}", idea))?;
                    println!("Idea {}: {:.2}", idea, total);
                }
                Ok(())
            })?;
        }
        Commands::Possibility { idea, slot, text } => {
            edit(&mut store, |record| {
                record.set_possibility(idea, slot, &text);
                Ok(())
            })?;
        }
        Commands::Select {
            idea,
            column,
            slot,
            text,
            clear,
        } => {
            if slot.is_none() && text.is_none() && !clear {
                anyhow::bail!("pass --slot, --text or --clear");
            }
            edit(&mut store, |record| {
                match (slot, text) {
                    (Some(slot), _) => record.select_slot(idea, column, slot),
                    (None, Some(text)) => record.set_selection(idea, column, Some(&text)),
                    (None, None) => record.set_selection(idea, column, None),
                }
                println!(
                    "Idea {} / concept {}: {}",
                    idea,
                    column,
                    record.get_selection(idea, column).unwrap_or("(no selection)")
                );
                Ok(())
            })?;
        }
        Commands::RateFormed {
            column,
            criterion,
            rating,
        } => {
            edit(&mut store, |record| {
                record.set_formed_rating(column, criterion, rating);
                if matches!(record.formed_result(column), Evaluation::Stale(_)) {
                    println!(
                        "Formed concept {} score is outdated; run score-formed {}",
                        column, column
                    );
                }
                Ok(())
            })?;
        }
        Commands::ScoreFormed { column } => {
            edit(&mut store, |record| {
                let columns: Vec<Column> = match column {
                    Some(column) => vec![column],
                    None => Column::all().collect(),
                };
                for column in columns {
                    let total = record
                        .score_formed(column)
                        .with_context(|| format!("cannot score formed concept {}", column))?;
                    println!("Formed concept {}: {:.2}", column, total);
                }
                Ok(())
            })?;
        }
        Commands::Best => {
            let record = load(&store)?;
            match record.best_concept() {
                Some(best) => {
                    println!(
                        "Best: formed concept {} ({:.2})",
                        best.concept.column, best.score
                    );
                    for component in &best.concept.components {
                        println!(
                            "  {}: {}",
                            component.idea_text,
                            component.selection.as_deref().unwrap_or("(idea not selected)")
                        );
                    }
                }
                None => println!("No formed concept has been scored yet"),
            }
        }
        Commands::Risk {
            index,
            failure,
            effect,
            severity,
            clear_severity,
            occurrence,
            clear_occurrence,
            action_planned,
            responsible,
            recorded_date,
            action_taken,
            completion_date,
        } => {
            edit(&mut store, |record| {
                let entry = record.risk_entry_mut(index);
                apply_text(&mut entry.failure, failure);
                apply_text(&mut entry.effect, effect);
                if severity.is_some() || clear_severity {
                    entry.set_severity(severity);
                }
                if occurrence.is_some() || clear_occurrence {
                    entry.set_occurrence(occurrence);
                }
                apply_text(&mut entry.action_planned, action_planned);
                apply_text(&mut entry.responsible, responsible);
                apply_text(&mut entry.recorded_date, recorded_date);
                apply_text(&mut entry.action_taken, action_taken);
                apply_text(&mut entry.completion_date, completion_date);
                if matches!(entry.risk(), Evaluation::Stale(_)) {
                    println!("Risk {} is outdated; run compute-risk {}", index, index);
                }
                Ok(())
            })?;
        }
        Commands::ComputeRisk { index } => {
            edit(&mut store, |record| {
                let value = record
                    .compute_risk(index)
                    .with_context(|| format!("cannot compute risk {}", index))?;
                println!("Risk {}: {:.2}", index, value);
                Ok(())
            })?;
        }
        Commands::Task {
            row,
            person,
            description,
            output,
        } => {
            edit(&mut store, |record| {
                let mut task: TaskRow = record.task(row).clone();
                apply_text(&mut task.person, person);
                apply_text(&mut task.description, description);
                apply_text(&mut task.output, output);
                record.set_task(row, task);
                Ok(())
            })?;
        }
        Commands::Check { step } => {
            let record = load(&store)?;
            match step.check(&record) {
                Ok(()) => println!("{}: ready to advance", step.as_str()),
                Err(e) => {
                    eprintln!("{}: {}", step.as_str(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Advance { step } => {
            // The step view falls back to an empty record; refuse that here
            load(&store)?;
            let mut wizard = Wizard::new(store);
            let record = wizard.enter(step);
            match wizard.advance(step, &record) {
                Ok(Some(next)) => println!("Next step: {}", next.as_str()),
                Ok(None) => println!("Workbook complete"),
                Err(AdvanceError::Validation(e)) => {
                    eprintln!("{}: {}", step.as_str(), e);
                    std::process::exit(1);
                }
                Err(AdvanceError::Storage(e)) => {
                    return Err(e).with_context(|| format!("cannot advance {}", step.as_str()))
                }
            }
        }
        Commands::Report { format, output } => {
            let record = load(&store)?;
            let format = format.map(ReportFormat::from).unwrap_or(resolved.format);
            let rendered = render(&ProjectSummary::from_record(&record), format);
            let target = output.map(|p| root.join(p)).or_else(|| {
                resolved
                    .report_dir
                    .as_ref()
                    .map(|dir| dir.join(report_file_name(record.project_name(), format)))
            });
            match target {
                Some(path) => {
                    write_report(&path, &rendered)?;
                    println!("Report written to {}", path.display());
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Prefs {
            language,
            theme,
            toggle_theme,
        } => {
            let mut prefs = Preferences::load(&resolved.data_dir);
            let changed = language.is_some() || theme.is_some() || toggle_theme;
            if let Some(language) = language {
                prefs.language = language;
            }
            if let Some(theme) = theme {
                prefs.theme = theme;
            }
            if toggle_theme {
                prefs.theme = prefs.theme.toggled();
            }
            if changed {
                prefs
                    .save(&resolved.data_dir)
                    .context("failed to save preferences")?;
            }
            println!("language: {}", prefs.language.as_str());
            println!("theme: {}", prefs.theme.as_str());
        }
        Commands::Config { action } => run_config(action, cli.config.as_deref(), root)?,
    }

    Ok(())
}

/// `--path` wins over the global `--config`
fn run_config(action: ConfigAction, global: Option<&Path>, root: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate { path } => {
            let resolved = config::load_and_resolve(root, path.as_deref().or(global));
            match resolved {
                Ok(config) => {
                    if let Some(ref p) = config.config_path {
                        println!("Config valid: {}", p.display());
                    } else {
                        println!("No config file found. Using defaults.");
                    }
                }
                Err(e) => {
                    eprintln!("Config validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Show { path } => {
            let resolved = config::load_and_resolve(root, path.as_deref().or(global))
                .context("failed to load configuration")?;
            print_config(&resolved);
        }
    }
    Ok(())
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("  data_dir: {}", resolved.data_dir.display());
    println!(
        "  format: {}",
        match resolved.format {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
        }
    );
    println!(
        "  report_dir: {}",
        resolved
            .report_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "none (stdout)".to_string())
    );
}

/// Load, apply `change`, save. Nothing is saved when `change` fails.
fn edit<F>(store: &mut ProjectStore<FileBackend>, change: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut ProjectRecord) -> anyhow::Result<()>,
{
    let mut record = load(store)?;
    change(&mut record)?;
    save(store, &record)
}

/// Load the record; an unreadable document is an error, never an empty record
fn load(store: &ProjectStore<FileBackend>) -> anyhow::Result<ProjectRecord> {
    store.try_load().with_context(|| {
        format!(
            "failed to load record from {}",
            store.backend().path().display()
        )
    })
}

fn save(store: &mut ProjectStore<FileBackend>, record: &ProjectRecord) -> anyhow::Result<()> {
    if !store.is_durable() {
        tracing::warn!(
            path = %store.backend().path().display(),
            "storage is not writable; changes will be lost"
        );
    }
    store.save(record).context("failed to save record")
}

/// Replace a text field when a value was given; empty text clears it
fn apply_text(field: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = workbook_core::record::normalize_text(&value);
    }
}

/// Write a report file with the atomic write pattern
fn write_report(path: &Path, contents: &str) -> anyhow::Result<()> {
    atomic_write(path, contents)
        .with_context(|| format!("failed to write report: {}", path.display()))
}
