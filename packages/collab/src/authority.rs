//! # Authority
//!
//! The central copy of a collaboratively edited document. Clients submit
//! steps made against a version; the authority appends them only when that
//! version is still current, so every client sees the same step order.

use crate::error::{CollabError, CollabResult};
use crate::protocol::{encode_steps, ClientId, Response, Submission};
use folio_model::Node;
use folio_transform::Step;
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityConfig {
    /// Number of confirmed steps kept for catching clients up (0 = unlimited)
    pub max_log: usize,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self { max_log: 10_000 }
    }
}

#[derive(Debug)]
pub struct Authority {
    config: AuthorityConfig,
    doc: Node,
    steps: VecDeque<(Step, ClientId)>,
    version: u64,
}

impl Authority {
    pub fn new(doc: Node, config: AuthorityConfig) -> Self {
        Self {
            config,
            doc,
            steps: VecDeque::new(),
            version: 0,
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Number of steps confirmed so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The oldest version [`Authority::steps_since`] can answer for.
    pub fn oldest_version(&self) -> u64 {
        self.version - self.steps.len() as u64
    }

    /// Append `steps` made by `client` against `version`. Fails without
    /// changing anything when `version` is not current or a step does not
    /// apply. Returns the new version.
    pub fn receive_steps(&mut self, version: u64, steps: Vec<Step>, client: &str) -> CollabResult<u64> {
        if version != self.version {
            return Err(CollabError::VersionConflict {
                expected: self.version,
                got: version,
            });
        }
        let mut doc = self.doc.clone();
        for step in &steps {
            doc = step.apply(&doc)?.doc;
        }
        let count = steps.len();
        self.doc = doc;
        self.version += count as u64;
        self.steps.extend(steps.into_iter().map(|step| (step, client.to_string())));
        self.prune();
        info!(client, version = self.version, steps = count, "accepted steps");
        Ok(self.version)
    }

    /// The confirmed steps after `version` and the client that made each.
    pub fn steps_since(&self, version: u64) -> CollabResult<(Vec<Step>, Vec<ClientId>)> {
        if version > self.version {
            return Err(CollabError::VersionConflict {
                expected: self.version,
                got: version,
            });
        }
        let oldest = self.oldest_version();
        if version < oldest {
            return Err(CollabError::HistoryPruned {
                requested: version,
                oldest,
            });
        }
        let skip = (version - oldest) as usize;
        Ok(self.steps.iter().skip(skip).map(|(s, c)| (s.clone(), c.clone())).unzip())
    }

    /// Handle a wire submission.
    pub fn submit(&mut self, submission: &Submission) -> Response {
        let rejected = Response::Rejected {
            generation: submission.generation,
            current_version: self.version,
        };
        let steps = match submission.parse_steps(self.doc.node_type().schema()) {
            Ok(steps) => steps,
            Err(e) => {
                warn!(client = %submission.client_id, error = %e, "rejecting unreadable steps");
                return rejected;
            }
        };
        match self.receive_steps(submission.version, steps, &submission.client_id) {
            Ok(version) => Response::Accepted {
                version,
                generation: submission.generation,
            },
            Err(CollabError::VersionConflict { .. }) => rejected,
            Err(e) => {
                warn!(client = %submission.client_id, error = %e, "rejecting steps");
                rejected
            }
        }
    }

    /// The wire form of [`Authority::steps_since`].
    pub fn steps_response(&self, version: u64) -> CollabResult<Response> {
        let (steps, client_ids) = self.steps_since(version)?;
        Ok(Response::Steps {
            version,
            steps: encode_steps(&steps),
            client_ids,
        })
    }

    fn prune(&mut self) {
        if self.config.max_log > 0 && self.steps.len() > self.config.max_log {
            let excess = self.steps.len() - self.config.max_log;
            self.steps.drain(..excess);
        }
    }
}
