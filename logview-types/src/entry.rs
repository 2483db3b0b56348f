//! A materialized row of the DNS query log.

use crate::ids::{RowId, Timestamp};
use serde::{Deserialize, Serialize};

/// One DNS query event as stored in the log.
///
/// The sync engine never reads entries; consumers materialize them for the
/// ranges the engine reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Store-assigned row id.
    pub row_id: RowId,
    /// When the query was observed.
    pub timestamp: Timestamp,
    /// Queried domain name.
    pub domain: String,
    /// Name or address of the client that issued the query.
    pub client: String,
    /// Whether the query was blocked.
    pub blocked: bool,
}
