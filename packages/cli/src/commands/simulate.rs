use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use folio_collab::{Authority, AuthorityConfig, AuthorityService, ClientHandle};
use folio_model::{Fragment, Node, Schema};
use folio_transform::{commands, Transform};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of clients (overrides the config file)
    #[arg(short, long)]
    pub clients: Option<usize>,

    /// Editing rounds per client (overrides the config file)
    #[arg(short, long)]
    pub rounds: Option<usize>,

    /// Starting document JSON; an empty document when absent
    #[arg(short, long)]
    pub doc: Option<PathBuf>,
}

#[derive(Debug)]
pub struct SimulationReport {
    pub doc: Node,
    pub version: u64,
    pub edits: usize,
}

pub fn simulate(args: SimulateArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let schema = config.load_schema(cwd)?;
    let clients = args.clients.unwrap_or(config.simulation.clients);
    let rounds = args.rounds.unwrap_or(config.simulation.rounds);

    let start = match &args.doc {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            Node::from_json_str(&schema, &source)?
        }
        None => empty_doc(&schema)?,
    };

    println!("🤝 {} collaboration simulation", "Starting".green().bold());
    println!("   Clients: {}", clients);
    println!("   Rounds:  {}", rounds);
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(run_simulation(
        start,
        config.authority_config(),
        clients,
        rounds,
    ))?;

    println!("✨ {} All clients converged", "Done".green().bold());
    println!("   Edits:   {}", report.edits);
    println!("   Version: {}", report.version);
    println!("   Size:    {}", report.doc.content().size());
    Ok(())
}

fn empty_doc(schema: &Schema) -> Result<Node> {
    schema
        .top_node_type()
        .create_and_fill(None, Fragment::empty(), &[])?
        .ok_or_else(|| anyhow::anyhow!("The top node type cannot be created empty"))
}

/// The end of the last textblock in `doc`, if it ends with one.
fn end_of_last_block(doc: &Node) -> Option<usize> {
    let last = doc.last_child()?;
    last.is_textblock().then(|| doc.content().size() - 1)
}

/// A deterministic edit for `client` in `round`.
fn scripted_edit(doc: &Node, client: usize, round: usize) -> Option<Transform> {
    let end = end_of_last_block(doc)?;
    match (client + round) % 4 {
        0 | 1 => {
            let mut tr = Transform::new(doc.clone());
            tr.insert_text(&format!("{}.{} ", client, round), end, None).ok()?;
            Some(tr)
        }
        2 => {
            let mut tr = Transform::new(doc.clone());
            let start = doc.resolve(end).ok()?.start(1);
            tr.insert_text(&format!("[{}]", client), start, None).ok()?;
            Some(tr)
        }
        _ => commands::split_block(doc, end, end),
    }
}

/// Run `clients` concurrent clients through `rounds` of edits against one
/// authority, then check that every client ends on the authority's document.
pub async fn run_simulation(
    start: Node,
    authority_config: AuthorityConfig,
    clients: usize,
    rounds: usize,
) -> Result<SimulationReport> {
    let (service, task) = AuthorityService::spawn(Authority::new(start, authority_config));
    let mut handles = Vec::with_capacity(clients);
    for id in 0..clients {
        handles.push(ClientHandle::connect(service.clone(), format!("client-{}", id)).await?);
    }

    let mut edits = 0;
    for round in 0..rounds {
        let mut tasks = Vec::with_capacity(clients);
        for (id, handle) in handles.iter().enumerate() {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let edited = handle.edit(|doc| scripted_edit(doc, id, round)).await?;
                handle.flush().await?;
                Ok::<bool, folio_collab::CollabError>(edited)
            }));
        }
        for task in tasks {
            if task.await?? {
                edits += 1;
            }
        }
        for handle in &handles {
            handle.flush().await?;
            handle.sync().await?;
        }
        info!(round, "round complete");
    }

    let (doc, version) = service.snapshot().await?;
    for (id, handle) in handles.iter().enumerate() {
        if handle.doc().await != doc {
            return Err(anyhow::anyhow!("client-{} diverged from the authority", id));
        }
    }
    drop(handles);
    drop(service);
    task.await?;

    Ok(SimulationReport { doc, version, edits })
}
