use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Run identifier (UUID v4), also attached to the command's log span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// JSON document printed on stdout after every command.
///
/// Field order is fixed to keep serialization deterministic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub run_id: RunId,
    pub command: &'static str,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub data: Value,
}

impl Summary {
    pub fn render(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_id_is_uuid_v4() {
        let run_id = RunId::new_v4();
        assert_eq!(run_id.0.get_version_num(), 4);
    }

    #[test]
    fn summary_fields_render_in_declaration_order() {
        let summary = Summary {
            run_id: RunId(
                Uuid::parse_str("123e4567-e89b-42d3-a456-426614174000").expect("uuid"),
            ),
            command: "lookup",
            elapsed_ms: 42,
            warnings: Vec::new(),
            errors: Vec::new(),
            data: json!({ "rows": 0 }),
        };

        let rendered = summary.render(false).expect("serializes");

        assert_eq!(
            rendered,
            r#"{"run_id":"123e4567-e89b-42d3-a456-426614174000","command":"lookup","elapsed_ms":42,"data":{"rows":0}}"#
        );
    }
}
