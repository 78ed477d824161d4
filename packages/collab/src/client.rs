//! # Collaboration Client
//!
//! Tracks the last version confirmed by the authority and the local steps
//! made since. Confirmed steps from other clients are applied by rebasing:
//! the unconfirmed steps are undone, the confirmed ones applied, and the
//! unconfirmed ones mapped over them and reapplied.
//!
//! ## Design
//!
//! - One send in flight at a time, tagged with a generation; responses for
//!   a generation the client gave up on are ignored
//! - Steps at or below the confirmed version are ignored, so repeated
//!   delivery is harmless
//! - Unconfirmed steps that no longer map or apply after a rebase are
//!   dropped with a warning
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut client = CollabClient::new("alice", doc, 0);
//! client.apply_local(step)?;
//! if let Some(submission) = client.send_steps() {
//!     let response = authority.submit(&submission);
//!     client.handle_response(response)?;
//! }
//! ```

use crate::error::{CollabError, CollabResult};
use crate::protocol::{encode_steps, parse_steps, ClientId, Response, Submission};
use folio_model::Node;
use folio_transform::{Mapping, Step, Transform};
use tracing::{debug, instrument, warn};

/// A local step with its inverse against the document it was applied to.
#[derive(Debug, Clone)]
struct Rebaseable {
    step: Step,
    inverted: Step,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    generation: u64,
    version: u64,
    count: usize,
}

#[derive(Debug)]
pub struct CollabClient {
    client_id: ClientId,
    version: u64,
    doc: Node,
    unconfirmed: Vec<Rebaseable>,
    in_flight: Option<InFlight>,
    generation: u64,
}

impl CollabClient {
    /// A client starting from `doc` at authority version `version`.
    pub fn new(client_id: impl Into<ClientId>, doc: Node, version: u64) -> Self {
        Self {
            client_id: client_id.into(),
            version,
            doc,
            unconfirmed: Vec::new(),
            in_flight: None,
            generation: 0,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The last confirmed version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The local document, unconfirmed steps included.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn unconfirmed(&self) -> impl Iterator<Item = &Step> {
        self.unconfirmed.iter().map(|r| &r.step)
    }

    pub fn has_unconfirmed(&self) -> bool {
        !self.unconfirmed.is_empty()
    }

    /// Apply a local step to the document.
    pub fn apply_local(&mut self, step: Step) -> CollabResult<()> {
        let output = step.apply(&self.doc)?;
        let inverted = step.invert(&self.doc)?;
        self.doc = output.doc;
        self.unconfirmed.push(Rebaseable { step, inverted });
        Ok(())
    }

    /// Apply every step of a transform built on the current document.
    pub fn apply_transform(&mut self, tr: &Transform) -> CollabResult<()> {
        if tr.before() != &self.doc {
            return Err(CollabError::Step(folio_transform::StepFailure::new(
                "Transform was not built on the client document",
            )));
        }
        for (step, inverted) in tr.steps().iter().zip(tr.inverted()) {
            self.unconfirmed.push(Rebaseable {
                step: step.clone(),
                inverted: inverted.clone(),
            });
        }
        self.doc = tr.doc().clone();
        Ok(())
    }

    /// The unconfirmed steps to offer the authority, unless a send is
    /// already in flight or there is nothing to send.
    pub fn send_steps(&mut self) -> Option<Submission> {
        if self.in_flight.is_some() || self.unconfirmed.is_empty() {
            return None;
        }
        self.generation += 1;
        self.in_flight = Some(InFlight {
            generation: self.generation,
            version: self.version,
            count: self.unconfirmed.len(),
        });
        Some(Submission {
            client_id: self.client_id.clone(),
            version: self.version,
            generation: self.generation,
            steps: encode_steps(self.unconfirmed.iter().map(|r| &r.step)),
        })
    }

    /// Apply confirmed steps starting at `version`. Returns the transform
    /// that moved the local document, if it changed.
    #[instrument(skip(self, steps, client_ids), fields(client = %self.client_id, count = steps.len()))]
    pub fn receive_transaction(
        &mut self,
        version: u64,
        steps: Vec<Step>,
        client_ids: &[ClientId],
    ) -> CollabResult<Option<Transform>> {
        if version > self.version {
            return Err(CollabError::VersionConflict {
                expected: self.version,
                got: version,
            });
        }
        let seen = (self.version - version) as usize;
        if seen >= steps.len() {
            debug!(version, "ignoring steps already confirmed");
            return Ok(None);
        }
        let steps: Vec<Step> = steps.into_iter().skip(seen).collect();
        let client_ids = client_ids.get(seen..).unwrap_or_default();

        let ours = client_ids
            .iter()
            .take_while(|id| **id == self.client_id)
            .count()
            .min(self.unconfirmed.len());
        let remote = &steps[ours..];
        if remote.is_empty() {
            self.unconfirmed.drain(..ours);
            self.in_flight = None;
            self.version += steps.len() as u64;
            debug!(confirmed = ours, version = self.version, "own steps confirmed");
            return Ok(None);
        }

        let (tr, rebased) = rebase(&self.doc, &self.unconfirmed[ours..], remote)?;
        if self.in_flight.take().is_some() {
            debug!("abandoning in-flight send");
        }
        self.unconfirmed = rebased;
        self.version += steps.len() as u64;
        self.doc = tr.doc().clone();
        Ok(Some(tr))
    }

    /// Handle a response from the authority. Returns the transform that
    /// moved the local document, if it changed.
    pub fn handle_response(&mut self, response: Response) -> CollabResult<Option<Transform>> {
        match response {
            Response::Accepted { version, generation } => {
                let Some(in_flight) = self.in_flight.filter(|f| f.generation == generation) else {
                    debug!(generation, "ignoring stale acceptance");
                    return Ok(None);
                };
                self.in_flight = None;
                if self.version == in_flight.version {
                    self.unconfirmed.drain(..in_flight.count.min(self.unconfirmed.len()));
                    self.version = version;
                }
                Ok(None)
            }
            Response::Rejected { generation, .. } => {
                if self.in_flight.map(|f| f.generation) == Some(generation) {
                    debug!(generation, "send rejected");
                    self.in_flight = None;
                }
                Ok(None)
            }
            Response::Steps {
                version,
                steps,
                client_ids,
            } => {
                let steps = parse_steps(self.doc.node_type().schema(), &steps)?;
                self.receive_transaction(version, steps, &client_ids)
            }
        }
    }
}

fn push_last_map(tr: &Transform, mapping: &mut Mapping, mirror: Option<usize>) {
    if let Some(map) = tr.mapping().maps().last() {
        mapping.append_map(map.clone(), mirror);
    }
}

/// Undo `pending`, apply `remote`, then map `pending` over it and reapply
/// what still fits.
fn rebase(doc: &Node, pending: &[Rebaseable], remote: &[Step]) -> CollabResult<(Transform, Vec<Rebaseable>)> {
    let mut tr = Transform::new(doc.clone());
    let mut mapping = Mapping::new();
    for local in pending.iter().rev() {
        tr.maybe_step(local.inverted.clone())?;
        push_last_map(&tr, &mut mapping, None);
    }
    for step in remote {
        tr.maybe_step(step.clone())?;
        push_last_map(&tr, &mut mapping, None);
    }

    let mut rebased = Vec::with_capacity(pending.len());
    let mut map_from = pending.len();
    for local in pending {
        let mapped = local.step.map(&mapping.slice_from(map_from));
        map_from -= 1;
        let Some(mapped) = mapped else {
            warn!(step = %local.step, "dropping local step deleted by remote change");
            continue;
        };
        let before = tr.doc().clone();
        if let Err(e) = tr.maybe_step(mapped.clone()) {
            warn!(step = %mapped, error = %e, "dropping local step that no longer applies");
            continue;
        }
        push_last_map(&tr, &mut mapping, Some(map_from));
        let inverted = mapped.invert(&before)?;
        rebased.push(Rebaseable { step: mapped, inverted });
    }
    debug!(remote = remote.len(), kept = rebased.len(), "rebased local steps");
    Ok((tr, rebased))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::{Authority, AuthorityConfig};
    use folio_schema_basic::{doc, p};

    fn insert(doc: &Node, text: &str, pos: usize) -> Step {
        let mut tr = Transform::new(doc.clone());
        tr.insert_text(text, pos, None).unwrap();
        tr.steps()[0].clone()
    }

    fn catch_up(client: &mut CollabClient, authority: &Authority) {
        let response = authority.steps_response(client.version()).unwrap();
        client.handle_response(response).unwrap();
    }

    #[test]
    fn test_concurrent_inserts_converge() {
        let d = doc![p!["hello"]];
        let mut authority = Authority::new(d.doc.clone(), AuthorityConfig::default());
        let mut a = CollabClient::new("a", d.doc.clone(), 0);
        let mut b = CollabClient::new("b", d.doc.clone(), 0);

        a.apply_local(insert(a.doc(), "A", 1)).unwrap();
        b.apply_local(insert(b.doc(), "B", 6)).unwrap();

        let sent_a = a.send_steps().unwrap();
        let sent_b = b.send_steps().unwrap();
        a.handle_response(authority.submit(&sent_a)).unwrap();
        assert!(matches!(authority.submit(&sent_b), Response::Rejected { .. }));
        b.handle_response(Response::Rejected {
            generation: sent_b.generation,
            current_version: 1,
        })
        .unwrap();

        catch_up(&mut b, &authority);
        assert_eq!(b.doc().to_string(), r#"doc(paragraph("AhelloB"))"#);
        let resend = b.send_steps().unwrap();
        assert_eq!(resend.version, 1);
        b.handle_response(authority.submit(&resend)).unwrap();
        catch_up(&mut a, &authority);

        assert_eq!(a.doc(), authority.doc());
        assert_eq!(b.doc(), authority.doc());
        assert_eq!(a.version(), 2);
        assert_eq!(b.version(), 2);
        assert!(!a.has_unconfirmed() && !b.has_unconfirmed());
    }

    #[test]
    fn test_same_position_inserts_keep_authority_order() {
        let d = doc![p!["x"]];
        let mut authority = Authority::new(d.doc.clone(), AuthorityConfig::default());
        let mut a = CollabClient::new("a", d.doc.clone(), 0);
        let mut b = CollabClient::new("b", d.doc.clone(), 0);

        a.apply_local(insert(a.doc(), "A", 1)).unwrap();
        b.apply_local(insert(b.doc(), "B", 1)).unwrap();
        authority.submit(&a.send_steps().unwrap());
        let _ = b.send_steps();
        catch_up(&mut b, &authority);
        assert_eq!(b.doc().to_string(), r#"doc(paragraph("ABx"))"#);
    }

    #[test]
    fn test_duplicate_delivery_is_ignored() {
        let d = doc![p!["hello"]];
        let mut authority = Authority::new(d.doc.clone(), AuthorityConfig::default());
        authority.receive_steps(0, vec![insert(&d.doc, "!", 6)], "other").unwrap();

        let mut client = CollabClient::new("a", d.doc.clone(), 0);
        catch_up(&mut client, &authority);
        let once = client.doc().clone();
        assert_eq!(client.version(), 1);

        let again = authority.steps_response(0).unwrap();
        assert!(client.handle_response(again).unwrap().is_none());
        assert_eq!(client.doc(), &once);
        assert_eq!(client.version(), 1);
    }

    #[test]
    fn test_own_steps_confirm_without_rebase() {
        let d = doc![p!["hello"]];
        let mut authority = Authority::new(d.doc.clone(), AuthorityConfig::default());
        let mut client = CollabClient::new("a", d.doc.clone(), 0);
        client.apply_local(insert(client.doc(), "!", 6)).unwrap();
        let submission = client.send_steps().unwrap();
        let accepted = authority.submit(&submission);

        // The broadcast of our own steps arrives before the acceptance.
        let broadcast = authority.steps_response(0).unwrap();
        assert!(client.handle_response(broadcast).unwrap().is_none());
        assert!(!client.has_unconfirmed());
        assert_eq!(client.version(), 1);

        client.handle_response(accepted).unwrap();
        assert_eq!(client.version(), 1);
        assert_eq!(client.doc(), authority.doc());
    }

    #[test]
    fn test_stale_acceptance_is_ignored() {
        let d = doc![p!["hello"]];
        let mut client = CollabClient::new("a", d.doc.clone(), 0);
        client.apply_local(insert(client.doc(), "!", 6)).unwrap();
        let first = client.send_steps().unwrap();
        assert!(client.send_steps().is_none());

        // A remote step arrives; the in-flight send is abandoned.
        let remote = insert(&d.doc, "A", 1);
        client
            .receive_transaction(0, vec![remote], &["b".to_string()])
            .unwrap();
        assert_eq!(client.doc().to_string(), r#"doc(paragraph("Ahello!"))"#);

        client
            .handle_response(Response::Accepted {
                version: 1,
                generation: first.generation,
            })
            .unwrap();
        assert_eq!(client.version(), 1);
        assert!(client.has_unconfirmed());
        let second = client.send_steps().unwrap();
        assert!(second.generation > first.generation);
        assert_eq!(second.version, 1);
    }

    #[test]
    fn test_local_step_deleted_remotely_is_dropped() {
        let d = doc![p!["hello"]];
        let mut client = CollabClient::new("a", d.doc.clone(), 0);
        client.apply_local(insert(client.doc(), "X", 3)).unwrap();

        let mut remote = Transform::new(d.doc.clone());
        remote.delete(1, 6).unwrap();
        client
            .receive_transaction(0, remote.steps().to_vec(), &["b".to_string()])
            .unwrap();
        assert!(!client.has_unconfirmed());
        assert_eq!(client.doc().to_string(), "doc(paragraph)");
    }

    #[test]
    fn test_gap_in_versions_is_a_conflict() {
        let d = doc![p!["hello"]];
        let mut client = CollabClient::new("a", d.doc.clone(), 0);
        let err = client
            .receive_transaction(3, vec![insert(&d.doc, "A", 1)], &["b".to_string()])
            .unwrap_err();
        assert_eq!(err, CollabError::VersionConflict { expected: 0, got: 3 });
    }
}
