use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use folio_history::{History, HistoryConfig, HistoryMeta};
use folio_model::{Node, Schema};
use folio_transform::{Step, StepJson, Transform};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Starting document JSON
    pub doc: PathBuf,

    /// JSON array of steps to apply in order
    pub steps: PathBuf,

    /// Undo this many history events after replaying
    #[arg(long, default_value = "0")]
    pub undo: usize,

    /// Check that inverting every step restores the starting document
    #[arg(long)]
    pub verify: bool,

    /// Write the resulting document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ReplayOutcome {
    pub doc: Node,
    pub applied: usize,
    pub undone: usize,
    /// Whether the inverted steps led back to the start, when checked
    pub inverts_cleanly: Option<bool>,
}

pub fn replay(args: ReplayArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let schema = config.load_schema(cwd)?;

    let doc_source = fs::read_to_string(&args.doc)
        .with_context(|| format!("Cannot read {}", args.doc.display()))?;
    let doc = Node::from_json_str(&schema, &doc_source)?;
    doc.check()?;
    let steps = read_steps(&schema, &args.steps)?;

    let outcome = replay_steps(doc, steps, config.history_config(), args.undo, args.verify)?;

    eprintln!(
        "▶️  {} {} step(s), undid {} event(s)",
        "Replayed".green().bold(),
        outcome.applied,
        outcome.undone
    );
    match outcome.inverts_cleanly {
        Some(true) => eprintln!("   {} Inverted steps restore the start", "✓".green()),
        Some(false) => {
            return Err(anyhow::anyhow!(
                "Inverting the replayed steps did not restore the starting document"
            ))
        }
        None => {}
    }

    let json = serde_json::to_string_pretty(&outcome.doc.to_json())?;
    match args.output {
        Some(path) => {
            fs::write(&path, json)?;
            eprintln!("   Output: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub fn read_steps(schema: &Schema, path: &Path) -> Result<Vec<Step>> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let json: Vec<StepJson> = serde_json::from_str(&source)
        .with_context(|| format!("{} is not a JSON array of steps", path.display()))?;
    json.iter()
        .enumerate()
        .map(|(i, step)| Step::from_json(schema, step).with_context(|| format!("Step {} is invalid", i)))
        .collect()
}

/// Apply `steps` one by one, recording each in a history, then undo
/// `undo` events.
pub fn replay_steps(
    start: Node,
    steps: Vec<Step>,
    history_config: HistoryConfig,
    undo: usize,
    verify: bool,
) -> Result<ReplayOutcome> {
    let mut history = History::new(history_config);
    let mut doc = start.clone();
    let mut inverted = Vec::with_capacity(steps.len());
    let now = Instant::now();

    for (i, step) in steps.into_iter().enumerate() {
        let mut tr = Transform::new(doc.clone());
        tr.step(step).with_context(|| format!("Step {} failed to apply", i))?;
        inverted.extend(tr.inverted().iter().cloned());
        history.record(&tr, now, HistoryMeta::local());
        doc = tr.doc().clone();
    }
    let applied = inverted.len();
    debug!(applied, events = history.undo_depth(), "replayed steps");

    let inverts_cleanly = if verify {
        let mut tr = Transform::new(doc.clone());
        for step in inverted.iter().rev() {
            tr.step(step.clone())?;
        }
        Some(tr.doc() == &start)
    } else {
        None
    };

    let mut undone = 0;
    while undone < undo {
        let Some(tr) = history.undo(&doc) else {
            break;
        };
        doc = tr.doc().clone();
        undone += 1;
    }

    Ok(ReplayOutcome {
        doc,
        applied,
        undone,
        inverts_cleanly,
    })
}
