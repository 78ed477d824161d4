//! # Authority Service
//!
//! Runs an [`Authority`] as a task. Requests arrive over an mpsc channel
//! and are handled one at a time; every accepted submission is pushed to
//! subscribers as a [`Response::Steps`] broadcast.
//!
//! [`ClientHandle`] wraps a [`CollabClient`] for use from several tasks.
//! The client sits behind a `tokio::sync::Mutex`, so a local edit issued
//! while a rebase is running waits for it and applies to the rebased
//! document.
//!
//! ## Example
//!
//! ```rust,ignore
//! let (service, _task) = AuthorityService::spawn(Authority::new(doc, AuthorityConfig::default()));
//! let alice = ClientHandle::connect(service.clone(), "alice").await?;
//! alice.edit(|doc| commands::insert_hard_break(doc, 3, 3)).await?;
//! alice.flush().await?;
//! ```

use crate::authority::Authority;
use crate::client::CollabClient;
use crate::error::{CollabError, CollabResult};
use crate::protocol::{encode_steps, ClientId, Response, Submission};
use folio_model::Node;
use folio_transform::{Step, Transform};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;
const BROADCAST_BUFFER: usize = 256;

enum Command {
    Submit {
        submission: Submission,
        reply: oneshot::Sender<Response>,
    },
    StepsSince {
        version: u64,
        reply: oneshot::Sender<CollabResult<Response>>,
    },
    Snapshot {
        reply: oneshot::Sender<(Node, u64)>,
    },
}

/// Handle to a running authority task. Cloning shares the task.
#[derive(Clone)]
pub struct AuthorityService {
    commands: mpsc::Sender<Command>,
    updates: broadcast::Sender<Response>,
}

impl AuthorityService {
    /// Start the authority task. The task ends when every handle is dropped.
    pub fn spawn(authority: Authority) -> (Self, JoinHandle<Authority>) {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (updates, _) = broadcast::channel(BROADCAST_BUFFER);
        let task = tokio::spawn(run(authority, receiver, updates.clone()));
        (Self { commands, updates }, task)
    }

    /// Receive every accepted batch of steps from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Response> {
        self.updates.subscribe()
    }

    pub async fn submit(&self, submission: Submission) -> CollabResult<Response> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Submit { submission, reply }).await?;
        response.await.map_err(|_| CollabError::ServiceClosed)
    }

    pub async fn steps_since(&self, version: u64) -> CollabResult<Response> {
        let (reply, response) = oneshot::channel();
        self.send(Command::StepsSince { version, reply }).await?;
        response.await.map_err(|_| CollabError::ServiceClosed)?
    }

    /// The current document and version.
    pub async fn snapshot(&self) -> CollabResult<(Node, u64)> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        response.await.map_err(|_| CollabError::ServiceClosed)
    }

    async fn send(&self, command: Command) -> CollabResult<()> {
        self.commands.send(command).await.map_err(|_| CollabError::ServiceClosed)
    }
}

async fn run(
    mut authority: Authority,
    mut commands: mpsc::Receiver<Command>,
    updates: broadcast::Sender<Response>,
) -> Authority {
    info!(version = authority.version(), "authority service started");
    while let Some(command) = commands.recv().await {
        match command {
            Command::Submit { submission, reply } => {
                let base = authority.version();
                let response = authority.submit(&submission);
                if let Response::Accepted { .. } = response {
                    if let Ok((steps, client_ids)) = authority.steps_since(base) {
                        // No subscribers is fine.
                        let _ = updates.send(Response::Steps {
                            version: base,
                            steps: encode_steps(&steps),
                            client_ids,
                        });
                    }
                }
                let _ = reply.send(response);
            }
            Command::StepsSince { version, reply } => {
                let _ = reply.send(authority.steps_response(version));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send((authority.doc().clone(), authority.version()));
            }
        }
    }
    info!(version = authority.version(), "authority service stopped");
    authority
}

/// A collaboration client shared between tasks.
#[derive(Clone)]
pub struct ClientHandle {
    client: Arc<Mutex<CollabClient>>,
    service: AuthorityService,
}

impl ClientHandle {
    /// Start a client from the authority's current document.
    pub async fn connect(service: AuthorityService, client_id: impl Into<ClientId>) -> CollabResult<Self> {
        let (doc, version) = service.snapshot().await?;
        Ok(Self {
            client: Arc::new(Mutex::new(CollabClient::new(client_id, doc, version))),
            service,
        })
    }

    pub async fn doc(&self) -> Node {
        self.client.lock().await.doc().clone()
    }

    pub async fn version(&self) -> u64 {
        self.client.lock().await.version()
    }

    pub async fn apply_local(&self, step: Step) -> CollabResult<()> {
        self.client.lock().await.apply_local(step)
    }

    /// Build a transform against the current local document and apply it.
    /// Returns whether `edit` produced one.
    pub async fn edit<F>(&self, edit: F) -> CollabResult<bool>
    where
        F: FnOnce(&Node) -> Option<Transform>,
    {
        let mut client = self.client.lock().await;
        match edit(client.doc()) {
            Some(tr) => {
                client.apply_transform(&tr)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply a message from the authority.
    pub async fn receive(&self, response: Response) -> CollabResult<Option<Transform>> {
        self.client.lock().await.handle_response(response)
    }

    /// Fetch and apply every confirmed step the client has not seen.
    pub async fn sync(&self) -> CollabResult<()> {
        let version = self.version().await;
        let response = self.service.steps_since(version).await?;
        self.receive(response).await?;
        Ok(())
    }

    /// Send unconfirmed steps until the authority has accepted all of them,
    /// catching up after each rejection.
    pub async fn flush(&self) -> CollabResult<()> {
        loop {
            // None also when another task has a send in flight.
            let Some(submission) = self.client.lock().await.send_steps() else {
                return Ok(());
            };
            let response = self.service.submit(submission).await?;
            let rejected = matches!(response, Response::Rejected { .. });
            self.receive(response).await?;
            if rejected {
                debug!("submission rejected, catching up");
                self.sync().await?;
            }
        }
    }
}
