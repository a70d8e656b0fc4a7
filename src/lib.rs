//! Parley: natural-language command resolution for embodied agents.
//!
//! **Parley turns one line of chat into a validated, machine-actionable
//! logical form and hands it to the right dialogue handler.**
//!
//! The guarantee that matters: malformed structure never reaches execution.
//! Every candidate parse — whether it came from the curated ground-truth
//! index or from a live semantic parsing model — passes the grammar gate
//! before anything acts on it, and a failed check degrades to the canonical
//! NOOP response instead of crashing or executing garbage.
//!
//! # Pipeline
//!
//! ```text
//! chat -> stack gate -> preprocess -> safety filter -> greeting short-circuit
//!      -> ground truth | model -> audit -> grammar gate -> span resolution
//!      -> coreference -> dispatch -> handler push
//! ```
//!
//! # Boundaries
//!
//! The semantic parsing model, the lemmatizer, and the memory/coreference
//! engine are external collaborators consumed through the traits in
//! [`core::contract`]. The crate ships detached stand-ins so the pipeline
//! runs end-to-end without them: ground-truth-only resolution, passthrough
//! lemmatization, void memory.
//!
//! # Crate structure
//!
//! - [`core`]: the resolution pipeline (ground truth, grammar, spans,
//!   resolver, audit)
//! - [`dialogue`]: stack gate, dispatcher, and the per-turn manager

pub mod core;
pub mod dialogue;

use crate::core::audit::AuditLog;
use crate::core::config::RuntimeConfig;
use crate::core::contract::{DetachedParser, IdentityLemmatizer, NullMemory};
use crate::core::error::ParleyError;
use crate::core::grammar::GrammarValidator;
use crate::core::ground_truth::GroundTruthIndex;
use crate::core::logical_form::LogicalForm;
use crate::core::resolver::CommandResolver;
use crate::dialogue::handlers::ScriptedHandlers;
use crate::dialogue::manager::{DialogueManager, TurnOutcome};

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "parley",
    version = env!("CARGO_PKG_VERSION"),
    about = "Natural-language command resolution pipeline"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one chat line through the full pipeline.
    ///
    /// Runs ground-truth-only: a command missing from the index surfaces a
    /// model-boundary error instead of inventing a parse.
    #[clap(name = "resolve", visible_alias = "r")]
    Resolve(ResolveCli),

    /// Inspect the ground-truth index
    #[clap(name = "ground-truth", visible_alias = "gt")]
    GroundTruth(GroundTruthCli),

    /// Validate logical forms against the grammar
    #[clap(name = "grammar", visible_alias = "g")]
    Grammar(GrammarCli),

    /// Audit log access
    #[clap(name = "audit", visible_alias = "a")]
    Audit(AuditCli),
}

#[derive(clap::Args, Debug)]
struct ResolveCli {
    /// The chat line to resolve.
    #[clap(long)]
    chat: String,
    /// Speaker identity passed to dispatched handlers.
    #[clap(long, default_value = "player")]
    speaker: String,
    /// Agent identity recorded in the audit log.
    #[clap(long, default_value = "parley")]
    agent_id: String,
    /// Data directory holding datasets/, safety.txt, greetings.json.
    #[clap(long, default_value = ".")]
    data_dir: PathBuf,
    /// Grammar schema directory; embedded default grammar when omitted.
    #[clap(long)]
    schema_dir: Option<PathBuf>,
    /// Audit log destination.
    #[clap(long, default_value = "nsp_outputs.csv")]
    audit_log: PathBuf,
}

#[derive(clap::Args, Debug)]
struct GroundTruthCli {
    #[clap(subcommand)]
    command: GroundTruthCommand,
}

#[derive(Subcommand, Debug)]
enum GroundTruthCommand {
    /// List indexed commands
    List {
        #[clap(long, default_value = ".")]
        data_dir: PathBuf,
        /// Maximum entries to print.
        #[clap(long, default_value = "20")]
        limit: usize,
    },
    /// Look up one command by exact text
    Lookup {
        #[clap(long)]
        text: String,
        #[clap(long, default_value = ".")]
        data_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct GrammarCli {
    #[clap(subcommand)]
    command: GrammarCommand,
}

#[derive(Subcommand, Debug)]
enum GrammarCommand {
    /// Check a logical-form JSON file against the grammar
    Check {
        #[clap(long)]
        file: PathBuf,
        /// Grammar schema directory; embedded default grammar when omitted.
        #[clap(long)]
        schema_dir: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct AuditCli {
    #[clap(subcommand)]
    command: AuditCommand,
}

#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Show the resolution audit log
    Show {
        #[clap(long, default_value = "nsp_outputs.csv")]
        path: PathBuf,
    },
}

fn load_grammar(schema_dir: Option<&Path>) -> Result<GrammarValidator, ParleyError> {
    match schema_dir {
        Some(dir) => GrammarValidator::from_dir(dir),
        None => GrammarValidator::embedded_default(),
    }
}

pub fn run() -> Result<(), ParleyError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Resolve(resolve_cli) => {
            let grammar = load_grammar(resolve_cli.schema_dir.as_deref())?;
            let ground_truth = GroundTruthIndex::load_dir(&resolve_cli.data_dir)?;
            let config = RuntimeConfig::load(&resolve_cli.data_dir)?;
            let audit = AuditLog::create(&resolve_cli.audit_log)?;

            let resolver = CommandResolver::new(
                ground_truth,
                grammar,
                Box::new(DetachedParser),
                Box::new(IdentityLemmatizer),
                audit,
                &resolve_cli.agent_id,
            );
            let mut manager = DialogueManager::new(
                resolver,
                config,
                Box::new(ScriptedHandlers),
                Box::new(NullMemory),
            );

            match manager.step(&resolve_cli.speaker, &resolve_cli.chat)? {
                TurnOutcome::Deferred => {
                    println!("{} chat deferred (top handler awaiting response)", "○".yellow());
                }
                TurnOutcome::Filtered => {
                    println!("{} chat rejected by safety filter", "✗".red());
                }
                TurnOutcome::Greeted { category } => {
                    println!("{} greeting short-circuit: {}", "✓".bright_green(), category.bold());
                }
                TurnOutcome::Dispatched {
                    dialogue_type,
                    source,
                    form,
                    node_id,
                } => {
                    println!(
                        "{} dispatched {} (source: {})",
                        "✓".bright_green(),
                        dialogue_type.to_string().bold(),
                        source.as_str()
                    );
                    if let Some(id) = node_id {
                        println!("  memory node: {}", id);
                    }
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&form.to_value()).unwrap_or_default()
                    );
                }
            }
        }
        Command::GroundTruth(gt_cli) => match gt_cli.command {
            GroundTruthCommand::List { data_dir, limit } => {
                let index = GroundTruthIndex::load_dir(&data_dir)?;
                println!("{} entries indexed", index.len());
                let mut commands: Vec<&String> = index.entries().map(|(text, _)| text).collect();
                commands.sort();
                for text in commands.into_iter().take(limit) {
                    println!("  {}", text);
                }
            }
            GroundTruthCommand::Lookup { text, data_dir } => {
                let index = GroundTruthIndex::load_dir(&data_dir)?;
                match index.lookup(&text) {
                    Some(form) => println!(
                        "{}",
                        serde_json::to_string_pretty(&form.to_value()).unwrap_or_default()
                    ),
                    None => println!("{} no ground truth for: {}", "✗".red(), text),
                }
            }
        },
        Command::Grammar(grammar_cli) => match grammar_cli.command {
            GrammarCommand::Check { file, schema_dir } => {
                let grammar = load_grammar(schema_dir.as_deref())?;
                let content = std::fs::read_to_string(&file)?;
                let form = LogicalForm::from_json_str(&content)
                    .map_err(|e| ParleyError::ConfigError(format!("{}: {}", file.display(), e)))?;
                if grammar.validate(&form) {
                    println!("{} {} conforms to the grammar", "✓".bright_green(), file.display());
                } else {
                    println!("{} {} fails grammar validation:", "✗".red(), file.display());
                    for violation in grammar.violations(&form) {
                        println!("  - {}", violation);
                    }
                    return Err(ParleyError::ConfigError(
                        "logical form failed grammar validation".to_string(),
                    ));
                }
            }
        },
        Command::Audit(audit_cli) => match audit_cli.command {
            AuditCommand::Show { path } => {
                if path.exists() {
                    let content = std::fs::read_to_string(&path)?;
                    print!("{}", content);
                } else {
                    println!("No audit log found at {}", path.display());
                }
            }
        },
    }
    Ok(())
}
