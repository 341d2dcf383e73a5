/*!
 * The query capability: run a GraphQL query, get back the `data` object or a classified error.
 *
 * `GraphqlClient` talks to the live endpoint and can append every response to an ndjson
 * file. `ReplayExecutor` reads such a file back, so a dashboard can be re-rendered offline.
 */

use std::{collections::HashMap, fs::{read_to_string, File, OpenOptions}, io::Write, path::Path, sync::Mutex};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::{error::{GraphqlError, QueryError}, queries::operation_name};

/// name recorded for queries that have no operation name
const ANONYMOUS: &str = "<anonymous>";

/// Anything that can execute a GraphQL query
#[async_trait]
pub trait Execute: Send + Sync {
    /// Run `query` and return its `data` object.
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, QueryError>;
}

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

/// Pull `data` out of a response body, turning an `errors` list into a `QueryError`.
fn unwrap_envelope(body: Value) -> Result<Value, QueryError> {
    let envelope: Envelope = serde_json::from_value(body)?;
    match envelope.errors {
        Some(errors) if !errors.is_empty() => Err(QueryError::from_graphql(errors)),
        _ => Ok(envelope.data.unwrap_or(Value::Null)),
    }
}

/// One line of the ndjson response log
#[derive(Serialize, Deserialize, Debug, Clone)]
struct Recorded {
    operation: String,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    response: Option<Value>,
}

/// The live GraphQL endpoint, authenticated with a bearer token
pub struct GraphqlClient {
    client: Client,
    endpoint: String,
    token: String,
    ndjson: Option<Mutex<File>>,
}

impl GraphqlClient {
    pub fn new(client: Client, endpoint: String, token: String) -> Self {
        GraphqlClient { client, endpoint, token, ndjson: None }
    }

    /// append every response to the given file
    pub fn with_ndjson<P: AsRef<Path>>(mut self, path: P) -> anyhow::Result<Self> {
        let file = OpenOptions::new().append(true).create(true).open(path.as_ref())
            .with_context(|| format!("could not open {}", path.as_ref().display()))?;
        self.ndjson = Some(Mutex::new(file));
        Ok(self)
    }

    fn record(&self, entry: &Recorded) {
        let Some(file) = &self.ndjson else {
            return;
        };
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                error!("could not serialize response for {}: {}", entry.operation, e);
                return;
            }
        };
        match file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", line) {
                    error!("could not write ndjson line: {}", e);
                }
            }
            Err(e) => error!("ndjson writer poisoned: {}", e),
        }
    }
}

#[async_trait]
impl Execute for GraphqlClient {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, QueryError> {
        let operation = operation_name(query).unwrap_or(ANONYMOUS).to_string();
        debug!("running {}", operation);

        let body = serde_json::to_string(&json!({ "query": query, "variables": variables }))?;
        let response = self.client.post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            self.record(&Recorded { operation, status: Some(status.as_u16()), body: Some(text.clone()), response: None });
            return Err(QueryError::from_status(status.as_u16(), text));
        }

        let parsed: Value = serde_json::from_str(&text)?;
        self.record(&Recorded { operation, status: None, body: None, response: Some(parsed.clone()) });
        unwrap_envelope(parsed)
    }
}

/// Replays responses from an ndjson log written by `GraphqlClient`.
/// When an operation appears more than once, the last line wins.
#[derive(Debug, Default)]
pub struct ReplayExecutor {
    responses: HashMap<String, Recorded>,
}

impl ReplayExecutor {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = read_to_string(path.as_ref()).context("error reading file to string")?;
        Self::from_ndjson(&raw)
    }

    pub fn from_ndjson(raw: &str) -> anyhow::Result<Self> {
        let mut responses = HashMap::new();
        for (idx, line) in raw.split('\n').enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: Recorded = serde_json::from_str(line)
                .with_context(|| format!("error parsing JSON on line {}", idx + 1))?;
            responses.insert(entry.operation.clone(), entry);
        }
        debug!("loaded {} recorded operations", responses.len());
        Ok(ReplayExecutor { responses })
    }

    /// the recorded operation names, sorted
    pub fn operations(&self) -> Vec<&str> {
        let mut ops: Vec<&str> = self.responses.keys().map(String::as_str).collect();
        ops.sort_unstable();
        ops
    }
}

#[async_trait]
impl Execute for ReplayExecutor {
    async fn execute(&self, query: &str, _variables: Value) -> Result<Value, QueryError> {
        let operation = operation_name(query).unwrap_or(ANONYMOUS);
        let entry = self.responses.get(operation)
            .ok_or_else(|| QueryError::MissingFixture(operation.to_string()))?;

        if let Some(status) = entry.status.filter(|s| !(200..300).contains(s)) {
            return Err(QueryError::from_status(status, entry.body.clone().unwrap_or_default()));
        }
        unwrap_envelope(entry.response.clone().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use crate::queries::{SKILLS_MINIMAL, USER_IDENTITY, XP_PROGRESS};

    use super::*;

    const LOG: &str = r#"
{"operation": "UserIdentity", "response": {"data": {"user": [{"id": 1, "login": "old"}]}}}
{"operation": "UserIdentity", "response": {"data": {"user": [{"id": 7, "login": "neo"}]}}}
{"operation": "XpTx", "response": {"errors": [{"message": "field not found", "extensions": {"code": "validation-failed"}}]}}
{"operation": "SkillsTxMinimal", "status": 401, "body": "expired"}

"#;

    #[tokio::test]
    async fn test_replay() -> anyhow::Result<()> {
        let replay = ReplayExecutor::from_ndjson(LOG)?;
        assert_eq!(replay.operations(), vec!["SkillsTxMinimal", "UserIdentity", "XpTx"]);

        let data = replay.execute(USER_IDENTITY, Value::Null).await?;
        assert_eq!(data["user"][0]["login"], "neo");

        let err = replay.execute(XP_PROGRESS, Value::Null).await.unwrap_err();
        assert!(matches!(err, QueryError::Graphql(_)));

        let err = replay.execute(SKILLS_MINIMAL, Value::Null).await.unwrap_err();
        assert!(err.is_auth());

        let err = replay.execute("query Nope { x }", Value::Null).await.unwrap_err();
        assert!(matches!(err, QueryError::MissingFixture(ref op) if op == "Nope"));
        Ok(())
    }

    #[test]
    fn test_replay_rejects_garbage() {
        assert!(ReplayExecutor::from_ndjson("{not json}\n").is_err());
    }

    #[test]
    fn test_envelope() -> anyhow::Result<()> {
        assert_eq!(unwrap_envelope(json!({"data": {"a": 1}, "errors": []}))?, json!({"a": 1}));
        assert_eq!(unwrap_envelope(json!({"data": null}))?, Value::Null);
        assert!(unwrap_envelope(json!({"errors": [{"message": "x", "extensions": {"code": "invalid-jwt"}}]})).unwrap_err().is_auth());
        Ok(())
    }
}
