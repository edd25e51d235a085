use serde::{Deserialize, Serialize};

/// Whoever pays for a chargeable entity.
///
/// Payers are referenced, never owned: many entities may share one.
pub trait Payer: Send + Sync {
    fn id(&self) -> &str;
    fn is_active(&self) -> bool;
    /// Token the processor accepts in place of card details.
    fn payment_credential(&self) -> Option<&str>;
}

/// A processor customer with a stored payment token.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Customer {
    #[serde(rename = "customer")]
    pub id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub token: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl Customer {
    pub fn new(id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: Some(token.into()),
            active: true,
        }
    }
}

impl Payer for Customer {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn payment_credential(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
