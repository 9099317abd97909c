//! Token response payload

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokenlog_common::{StreamId, TOKEN_ABORTED};

/// Response to a token request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Base of the issued range, the query result, or -1 on abort
    pub token: i64,

    /// Previous back-pointer per requested stream (-1 if none)
    pub backpointer_map: BTreeMap<StreamId, i64>,

    /// Post-grant local tail per stream where the local tail advanced
    pub stream_tokens: BTreeMap<StreamId, i64>,
}

impl TokenResponse {
    /// Response carrying an issued token (or a query result)
    pub fn new(
        token: i64,
        backpointer_map: BTreeMap<StreamId, i64>,
        stream_tokens: BTreeMap<StreamId, i64>,
    ) -> Self {
        Self {
            token,
            backpointer_map,
            stream_tokens,
        }
    }

    /// Response for a transaction that failed resolution
    pub fn aborted() -> Self {
        Self {
            token: TOKEN_ABORTED,
            backpointer_map: BTreeMap::new(),
            stream_tokens: BTreeMap::new(),
        }
    }

    /// True when this response signals a transaction abort
    pub fn is_abort(&self) -> bool {
        self.token == TOKEN_ABORTED
    }
}
