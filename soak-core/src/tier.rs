use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality-of-service class requested per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    Flex,
    Default,
    Priority,
}

impl ServiceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceTier::Flex => "flex",
            ServiceTier::Default => "default",
            ServiceTier::Priority => "priority",
        }
    }

    /// Value for the service-tier request header. The default tier is selected by omitting it.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            ServiceTier::Default => None,
            tier => Some(tier.as_str()),
        }
    }
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown service tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for ServiceTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flex" => Ok(ServiceTier::Flex),
            "default" | "standard" => Ok(ServiceTier::Default),
            "priority" => Ok(ServiceTier::Priority),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tier_sends_no_header() {
        assert_eq!(ServiceTier::Default.header_value(), None);
        assert_eq!(ServiceTier::Flex.header_value(), Some("flex"));
        assert_eq!(ServiceTier::Priority.header_value(), Some("priority"));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("FLEX".parse::<ServiceTier>().unwrap(), ServiceTier::Flex);
        assert_eq!(
            "standard".parse::<ServiceTier>().unwrap(),
            ServiceTier::Default
        );
        assert!("gold".parse::<ServiceTier>().is_err());
    }
}
