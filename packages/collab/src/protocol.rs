//! Messages exchanged between clients and the authority.
//!
//! Steps travel in their JSON form and are parsed against the receiver's
//! schema.

use crate::error::CollabResult;
use folio_model::Schema;
use folio_transform::{Step, StepJson};
use serde::{Deserialize, Serialize};

pub type ClientId = String;

/// Local steps offered to the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub client_id: ClientId,

    /// The authority version the steps were made against
    pub version: u64,

    /// Identifies this send, so responses to abandoned sends can be ignored
    pub generation: u64,

    pub steps: Vec<StepJson>,
}

impl Submission {
    pub fn parse_steps(&self, schema: &Schema) -> CollabResult<Vec<Step>> {
        parse_steps(schema, &self.steps)
    }
}

/// Messages from the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    /// The submission with this generation was appended; `version` is the
    /// authority version after it.
    #[serde(rename_all = "camelCase")]
    Accepted { version: u64, generation: u64 },

    /// The submission was not based on the current version, or did not
    /// apply. The client should catch up and send again.
    #[serde(rename_all = "camelCase")]
    Rejected { generation: u64, current_version: u64 },

    /// Confirmed steps starting at `version`, with the client that made each.
    #[serde(rename_all = "camelCase")]
    Steps {
        version: u64,
        steps: Vec<StepJson>,
        client_ids: Vec<ClientId>,
    },
}

pub(crate) fn parse_steps(schema: &Schema, steps: &[StepJson]) -> CollabResult<Vec<Step>> {
    steps
        .iter()
        .map(|json| Step::from_json(schema, json).map_err(Into::into))
        .collect()
}

pub(crate) fn encode_steps<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Vec<StepJson> {
    steps.into_iter().map(Step::to_json).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_json_shape() {
        let accepted = Response::Accepted { version: 4, generation: 2 };
        let json = serde_json::to_value(&accepted).unwrap();
        assert_eq!(json, serde_json::json!({"type": "accepted", "version": 4, "generation": 2}));

        let steps: Response = serde_json::from_str(r#"{"type": "steps", "version": 1, "steps": [], "clientIds": []}"#).unwrap();
        assert_eq!(
            steps,
            Response::Steps {
                version: 1,
                steps: Vec::new(),
                client_ids: Vec::new()
            }
        );
    }

    #[test]
    fn test_submission_uses_camel_case() {
        let submission = Submission {
            client_id: "a".to_string(),
            version: 0,
            generation: 1,
            steps: Vec::new(),
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["clientId"], "a");
        assert_eq!(json["generation"], 1);
    }
}
