//! # Folio Collab
//!
//! Central-authority collaboration. One [`Authority`] holds the document
//! and orders steps; each [`CollabClient`] keeps its own unconfirmed steps
//! and rebases them over steps confirmed for others.
//!
//! ## Design
//!
//! - The authority only appends steps made against its current version
//! - Clients recognise their own steps in the confirmed stream by client id
//! - Steps cross the wire as JSON ([`Submission`], [`Response`])
//! - [`AuthorityService`] runs the authority as a tokio task with a
//!   broadcast of every accepted batch
//!
//! ## Example
//!
//! ```rust,ignore
//! use folio_collab::{Authority, AuthorityConfig, CollabClient};
//!
//! let mut authority = Authority::new(doc.clone(), AuthorityConfig::default());
//! let mut client = CollabClient::new("alice", doc, authority.version());
//! client.apply_local(step)?;
//! if let Some(submission) = client.send_steps() {
//!     client.handle_response(authority.submit(&submission))?;
//! }
//! ```

mod authority;
mod client;
mod error;
mod protocol;
mod service;

pub use authority::{Authority, AuthorityConfig};
pub use client::CollabClient;
pub use error::{CollabError, CollabResult};
pub use protocol::{ClientId, Response, Submission};
pub use service::{AuthorityService, ClientHandle};
