use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid chain id {value:?}: chain ids must be non-empty with no ':' or whitespace")]
pub struct ChainIdError {
    value: String,
}

/// Identifier of one chain (e.g. "AELF", "tDVV").
///
/// Chain ids are embedded in lock names and cache keys, so they may not
/// contain the `:` key separator or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    pub fn new(value: impl Into<String>) -> Result<Self, ChainIdError> {
        let value = value.into();
        if Self::is_key_safe(&value) {
            Ok(Self(value))
        } else {
            Err(ChainIdError { value })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_key_safe(value: &str) -> bool {
        !value.is_empty()
            && value != ChainScope::ALL
            && !value.chars().any(|c| c == ':' || c.is_whitespace())
    }
}

impl TryFrom<String> for ChainId {
    type Error = ChainIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for ChainId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Which chains a valuation run covers: one chain, or every chain merged per address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChainScope {
    Chain(ChainId),
    All,
}

impl ChainScope {
    pub const ALL: &'static str = "all";

    pub fn chain(&self) -> Option<&ChainId> {
        match self {
            ChainScope::Chain(chain) => Some(chain),
            ChainScope::All => None,
        }
    }

    /// True if a record on `chain` falls inside this scope.
    pub fn covers(&self, chain: &ChainId) -> bool {
        match self {
            ChainScope::Chain(own) => own == chain,
            ChainScope::All => true,
        }
    }
}

impl From<ChainId> for ChainScope {
    fn from(chain: ChainId) -> Self {
        ChainScope::Chain(chain)
    }
}

impl TryFrom<String> for ChainScope {
    type Error = ChainIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == Self::ALL {
            Ok(ChainScope::All)
        } else {
            ChainId::new(value).map(ChainScope::Chain)
        }
    }
}

impl From<ChainScope> for String {
    fn from(value: ChainScope) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ChainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainScope::Chain(chain) => chain.fmt(f),
            ChainScope::All => f.write_str(Self::ALL),
        }
    }
}
