//! Generative model tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// One of the two tiers of the generative service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Higher quality, higher cost.
    Primary,
    /// Lower cost; used when the primary tier is out of quota.
    Fallback,
}

impl ModelTier {
    /// Both tiers, primary first.
    pub fn all() -> [ModelTier; 2] {
        [Self::Primary, Self::Fallback]
    }

    /// Returns the CLI name of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" | "pro" => Ok(Self::Primary),
            "fallback" | "flash" => Ok(Self::Fallback),
            other => Err(CoreError::UnknownTier(other.to_string())),
        }
    }
}

/// The endpoint and ledger resource class a tier is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBinding {
    /// Model endpoint name, e.g. `gemini-2.5-pro`.
    pub model: String,
    /// Ledger resource class charged for calls to this model.
    pub resource_class: String,
}

impl TierBinding {
    /// Creates a binding.
    pub fn new(model: impl Into<String>, resource_class: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            resource_class: resource_class.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse() {
        assert_eq!("primary".parse::<ModelTier>().unwrap(), ModelTier::Primary);
        assert_eq!("Flash".parse::<ModelTier>().unwrap(), ModelTier::Fallback);
        assert!("ultra".parse::<ModelTier>().is_err());
    }
}
