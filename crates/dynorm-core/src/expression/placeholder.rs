//! Placeholder allocation for one logical call.
//!
//! Every attribute name and literal in a compiled expression is replaced with
//! a token so reserved words and special characters never reach the
//! expression text. Tokens are deterministic: `#n0, #n1, ...` and
//! `:v0, :v1, ...` in allocation order.

use std::collections::HashMap;

use dynorm_model::AttributeValue;

/// Name and value placeholders shared by every expression of one call.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTable {
    /// Stored segment name to token.
    name_placeholders: HashMap<String, String>,
    /// Literal to token, for deduplication.
    value_tokens: HashMap<AttributeValue, String>,
    /// Token to literal.
    value_placeholders: HashMap<String, AttributeValue>,
    next_name: usize,
    next_value: usize,
}

impl PlaceholderTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for a stored segment name, allocating one on first use.
    pub fn name_token(&mut self, stored: &str) -> String {
        if let Some(token) = self.name_placeholders.get(stored) {
            return token.clone();
        }
        let token = format!("#n{}", self.next_name);
        self.next_name += 1;
        self.name_placeholders
            .insert(stored.to_owned(), token.clone());
        token
    }

    /// Token for a literal, allocating one on first use.
    pub fn value_token(&mut self, value: &AttributeValue) -> String {
        if let Some(token) = self.value_tokens.get(value) {
            return token.clone();
        }
        let token = format!(":v{}", self.next_value);
        self.next_value += 1;
        self.value_tokens.insert(value.clone(), token.clone());
        self.value_placeholders
            .insert(token.clone(), value.clone());
        token
    }

    /// Stored segment name to token.
    #[must_use]
    pub fn name_placeholders(&self) -> &HashMap<String, String> {
        &self.name_placeholders
    }

    /// Token to literal.
    #[must_use]
    pub fn value_placeholders(&self) -> &HashMap<String, AttributeValue> {
        &self.value_placeholders
    }

    /// Returns `true` if nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name_placeholders.is_empty() && self.value_placeholders.is_empty()
    }

    /// Consume the table into the two maps a request artifact carries:
    /// token to stored name, and token to literal.
    #[must_use]
    pub fn into_maps(self) -> (HashMap<String, String>, HashMap<String, AttributeValue>) {
        let names = self
            .name_placeholders
            .into_iter()
            .map(|(name, token)| (token, name))
            .collect();
        (names, self.value_placeholders)
    }
}
