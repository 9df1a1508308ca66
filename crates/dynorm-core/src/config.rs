//! Client configuration.

use std::env;

use serde::{Deserialize, Serialize};

/// Defaults applied to every table handled by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Strongly consistent reads when neither the spec nor the schema says
    /// otherwise (default: false).
    pub consistent_read: bool,
    /// Records per round trip when the spec sets no page size.
    pub default_page_size: Option<usize>,
    /// Prepended to every table name sent to the gateway.
    pub table_prefix: String,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            consistent_read: env_bool(&lookup, "DYNORM_CONSISTENT_READ", false),
            default_page_size: lookup("DYNORM_PAGE_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &usize| n > 0),
            table_prefix: lookup("DYNORM_TABLE_PREFIX").unwrap_or_default(),
        }
    }

    /// The table name sent to the gateway for `table`.
    #[must_use]
    pub fn table_name(&self, table: &str) -> String {
        format!("{}{table}", self.table_prefix)
    }
}

fn env_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
