use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// GraphQL error codes that mean the bearer token is no good
const AUTH_ERROR_CODES: [&str; 2] = ["invalid-jwt", "invalid-headers"];

/// A single entry from a GraphQL `errors` list
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    /// the `extensions.code` field, if the server sent one
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }
}

/// Everything that can go wrong talking to the API
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("credentials rejected (HTTP {status}), sign in again")]
    Unauthorized { status: u16 },
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("query failed: {}", first_message(.0))]
    Graphql(Vec<GraphqlError>),
    #[error("error talking to the API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("sign-in failed (HTTP {status}): {message}")]
    SignIn { status: u16, message: String },
    #[error("sign-in succeeded but the token is empty")]
    EmptyToken,
    #[error("no recorded response for operation {0}")]
    MissingFixture(String),
    #[error("response to {0} did not have the expected shape")]
    UnexpectedShape(String),
}

fn first_message(errors: &[GraphqlError]) -> &str {
    errors.first().map(|e| e.message.as_str()).filter(|m| !m.is_empty()).unwrap_or("GraphQL error")
}

impl QueryError {
    /// Classify an HTTP status: 401/403 mean the credential is invalid.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => QueryError::Unauthorized { status },
            _ => QueryError::Http { status, body },
        }
    }

    /// Classify a GraphQL error list. The engine reports expired tokens in-band.
    pub fn from_graphql(errors: Vec<GraphqlError>) -> Self {
        if errors.iter().any(|e| e.code().is_some_and(|c| AUTH_ERROR_CODES.contains(&c))) {
            QueryError::Unauthorized { status: 401 }
        } else {
            QueryError::Graphql(errors)
        }
    }

    /// returns true if the caller should send the user back to sign-in
    pub fn is_auth(&self) -> bool {
        matches!(self, QueryError::Unauthorized { .. } | QueryError::SignIn { status: 401 | 403, .. })
    }
}
