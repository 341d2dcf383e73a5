// Getting hold of a bearer token: either handed to us directly, or by signing in.

use reqwest::{header::HeaderMap, Client};
use serde_json::Value;
use tracing::{debug, info};

use crate::{error::QueryError, transaction::get_root_elem};

/// response headers that may carry the token
const TOKEN_HEADERS: [&str; 2] = ["authorization", "x-auth-token"];
/// JSON body fields that may carry the token, in dot notation
const TOKEN_FIELDS: [&str; 7] = ["token", "jwt", "access_token", "data.token", "data.jwt", "data.access_token", "data.data"];

/// How the user identifies themselves
#[derive(Debug, Clone)]
pub enum Credentials {
    Token(String),
    Basic { identifier: String, password: String },
}

impl Credentials {
    /// Resolve to a bearer token, signing in when needed.
    pub async fn bearer(self, client: &Client, signin_url: &str) -> Result<String, QueryError> {
        match self {
            Credentials::Token(token) if token.trim().is_empty() => Err(QueryError::EmptyToken),
            Credentials::Token(token) => Ok(token),
            Credentials::Basic { identifier, password } => sign_in(client, signin_url, identifier.trim(), &password).await,
        }
    }
}

/// POST basic credentials to the sign-in endpoint and pull the token out of the response.
pub async fn sign_in(client: &Client, url: &str, identifier: &str, password: &str) -> Result<String, QueryError> {
    info!("signing in as {}", identifier);
    let response = client.post(url).basic_auth(identifier, Some(password)).send().await?;

    let status = response.status();
    let headers = response.headers().clone();
    let text = response.text().await?;

    if !status.is_success() {
        debug!("sign-in rejected: {}", text);
        return Err(rejection(status.as_u16(), &text));
    }

    extract_token(&headers, &text).ok_or(QueryError::EmptyToken)
}

/// Find the token in the headers or body of a successful sign-in response.
pub fn extract_token(headers: &HeaderMap, body: &str) -> Option<String> {
    let from_header = TOKEN_HEADERS.iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok())
        .find_map(|val| val.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    if let Some(token) = from_header.filter(|t| !t.is_empty()) {
        return Some(token);
    }

    let token = match serde_json::from_str::<Value>(body) {
        Ok(Value::String(token)) => token,
        Ok(obj @ Value::Object(_)) => TOKEN_FIELDS.iter()
            .find_map(|field| get_root_elem(&obj, field)?.as_str().map(str::to_string))?,
        _ => body.trim().trim_matches('"').to_string(),
    };

    let token = token.trim().to_string();
    (!token.is_empty()).then_some(token)
}

/// A failed sign-in keeps the server's explanation; 401/403 still count as auth failures.
fn rejection(status: u16, body: &str) -> QueryError {
    QueryError::SignIn { status, message: error_message(body) }
}

/// the most useful message in a failed sign-in body
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "error"].iter().find_map(|key| v.get(*key)?.as_str().map(str::to_string))
    });
    match from_json {
        Some(msg) if !msg.is_empty() => msg,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => "Invalid credentials".to_string(),
    }
}
