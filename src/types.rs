use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which set of work items a benchmark batch draws from.
///
/// - `Test`: the regular item set under `levels/` (default).
/// - `Val`: the held-out item set under `val_levels/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    #[default]
    Test,
    Val,
}

impl ItemSource {
    /// Directory (relative to the workload root) holding this source's items.
    pub fn dir_name(self) -> &'static str {
        match self {
            ItemSource::Test => "levels",
            ItemSource::Val => "val_levels",
        }
    }

    /// The other item source, used as a lookup fallback.
    pub fn other(self) -> Self {
        match self {
            ItemSource::Test => ItemSource::Val,
            ItemSource::Val => ItemSource::Test,
        }
    }
}

impl fmt::Display for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemSource::Test => f.write_str("test"),
            ItemSource::Val => f.write_str("val"),
        }
    }
}

impl FromStr for ItemSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "test" => Ok(ItemSource::Test),
            "val" => Ok(ItemSource::Val),
            other => Err(format!(
                "invalid item source: {other} (expected \"test\" or \"val\")"
            )),
        }
    }
}
