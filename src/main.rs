use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use exam_insights::models::{KnowledgeCatalogEntry, KnowledgeMapInput};
use exam_insights::{import, normalize, pipeline, report, taxonomy, AnalysisConfig, TaxonomyIndex};

#[derive(Parser)]
#[command(name = "exam-insights", version)]
#[command(about = "Knowledge point and focus student analytics for exam score tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a score table against a question→knowledge point map
    Analyze {
        #[arg(long)]
        scores: PathBuf,
        /// JSON object of question number → labels; omitted means not yet extracted
        #[arg(long)]
        knowledge: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override full marks per question
        #[arg(long)]
        full_marks: Option<f64>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Resolve a knowledge map against the catalog and list unmatched labels
    Normalize {
        #[arg(long)]
        knowledge: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the numbered knowledge point catalog
    Catalog {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a blank score table template
    Template {
        #[arg(long, default_value_t = 10)]
        questions: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path),
        None => Ok(AnalysisConfig::default()),
    }
}

fn load_catalog(config: &AnalysisConfig) -> anyhow::Result<Vec<KnowledgeCatalogEntry>> {
    match &config.catalog_path {
        Some(path) => taxonomy::load_catalog(path),
        None => Ok(taxonomy::standard_catalog()),
    }
}

fn build_index(config: &AnalysisConfig) -> anyhow::Result<TaxonomyIndex> {
    let entries = load_catalog(config)?;
    TaxonomyIndex::build(&entries).context("invalid knowledge point catalog")
}

fn emit(content: &str, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}.", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("exam_insights=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            scores,
            knowledge,
            config,
            full_marks,
            format,
            out,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(full_marks) = full_marks {
                config.full_marks_per_question = full_marks;
                config.validate()?;
            }
            let index = build_index(&config)?;
            let table = import::read_scores_file(&scores)?;
            let knowledge_map = import::read_knowledge_map(knowledge.as_deref())?;

            let analysis = pipeline::analyze(&table, &knowledge_map, &index, &config);
            let rendered = match format {
                Format::Markdown => report::build_report(
                    &analysis,
                    report::exam_label(&table).as_deref(),
                    chrono::Utc::now().date_naive(),
                ),
                Format::Json => {
                    let mut json = serde_json::to_string_pretty(&analysis)?;
                    json.push('\n');
                    json
                }
            };
            emit(&rendered, out.as_deref())?;
        }
        Commands::Normalize { knowledge, config } => {
            let config = load_config(config.as_deref())?;
            let index = build_index(&config)?;
            let raw = match import::read_knowledge_map(Some(knowledge.as_path()))? {
                KnowledgeMapInput::Resolved(raw) => raw,
                KnowledgeMapInput::Unresolved => {
                    println!("Knowledge map is unresolved; nothing to normalize.");
                    return Ok(());
                }
            };

            let outcome = normalize::whitelist_map(&raw, &index);
            println!("Matched {} of {} questions:", outcome.cleaned.len(), raw.len());
            for (question, points) in &outcome.cleaned {
                println!("- 题{}: {}", question, points.join("、"));
            }
            if !outcome.unknown.is_empty() {
                let unknown: Vec<&str> = outcome.unknown.iter().map(String::as_str).collect();
                println!("Unmatched labels: {}", unknown.join("、"));
            }
            if !outcome.skipped_keys.is_empty() {
                println!("Skipped keys: {}", outcome.skipped_keys.join(", "));
            }
        }
        Commands::Catalog { config } => {
            let config = load_config(config.as_deref())?;
            let entries = load_catalog(&config)?;
            TaxonomyIndex::build(&entries).context("invalid knowledge point catalog")?;
            println!("{}", taxonomy::numbered_listing(&entries));
        }
        Commands::Template { questions, out } => {
            let csv = import::template_csv(questions)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Template written to {}.", path.display());
                }
                None => print!("{csv}"),
            }
        }
    }

    Ok(())
}
