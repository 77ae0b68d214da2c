use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Longest chain of referential actions a single statement may trigger.
pub const MAX_CASCADE_DEPTH: usize = 15;

/// How the cascade depth ceiling treats editors that sit on a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepthLimitMode {
    /// Cyclic editors trip at `depth >= 15`, every other editor at
    /// `depth > 15`. Matches MySQL.
    #[default]
    MysqlCompatible,
    /// Every editor trips at `depth > 15`.
    Strict,
}

impl DepthLimitMode {
    pub fn exceeded(self, depth: usize, cyclical: bool) -> bool {
        match self {
            DepthLimitMode::MysqlCompatible if cyclical => depth >= MAX_CASCADE_DEPTH,
            _ => depth > MAX_CASCADE_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyConfig {
    /// When off, editors mutate rows without checking or cascading.
    pub foreign_key_checks: bool,
    pub depth_limit_mode: DepthLimitMode,
}

impl Default for ForeignKeyConfig {
    fn default() -> Self {
        Self {
            foreign_key_checks: true,
            depth_limit_mode: DepthLimitMode::default(),
        }
    }
}

impl ForeignKeyConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn without_checks() -> Self {
        Self {
            foreign_key_checks: false,
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self {
            depth_limit_mode: DepthLimitMode::Strict,
            ..Self::default()
        }
    }
}
