/*!
 * The remote schema isn't ours, and field names differ between deployments. Rather than
 * hard-coding one query shape, callers give an ordered list of adapters: a query plus a pure
 * function that recognises its response. The first adapter whose query succeeds and whose
 * response it recognises wins.
 */

use serde_json::Value;
use tracing::{debug, warn};

use crate::{client::Execute, error::QueryError};

/// One way of asking for `T`
pub struct SchemaAdapter<T> {
    pub name: &'static str,
    pub query: String,
    /// returns None when the response doesn't look like what this adapter expects
    pub extract: fn(&Value) -> Option<T>,
}

impl<T> SchemaAdapter<T> {
    pub fn new<Q: Into<String>>(name: &'static str, query: Q, extract: fn(&Value) -> Option<T>) -> Self {
        SchemaAdapter { name, query: query.into(), extract }
    }
}

/// Try each adapter in order. Auth failures stop the chain immediately; any other failure
/// moves on to the next adapter. If none match, the last failure is returned.
pub async fn first_match<T>(executor: &dyn Execute, adapters: &[SchemaAdapter<T>], variables: Value) -> Result<T, QueryError> {
    let mut last_err: Option<QueryError> = None;

    for adapter in adapters {
        match executor.execute(&adapter.query, variables.clone()).await {
            Ok(data) => match (adapter.extract)(&data) {
                Some(found) => {
                    debug!("adapter {} matched", adapter.name);
                    return Ok(found);
                }
                None => {
                    warn!("adapter {} got an unexpected response shape", adapter.name);
                    last_err = Some(QueryError::UnexpectedShape(adapter.name.to_string()));
                }
            },
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!("adapter {} failed: {}", adapter.name, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| QueryError::UnexpectedShape("no adapters configured".to_string())))
}
