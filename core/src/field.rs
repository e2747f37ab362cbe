use crate::document::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Indexed text scope. Each field has its own posting lists and field-length table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Address,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Name, Field::Address];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Address => "address",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Field::Name => 0,
            Field::Address => 1,
        }
    }

    pub fn text_of(self, doc: &Document) -> &str {
        match self {
            Field::Name => &doc.name,
            Field::Address => &doc.address,
        }
    }

    /// Name of the `n`-th intermediate segment of this field.
    pub fn segment_name(self, n: u32) -> String {
        format!("index_{}_{}", self.as_str(), n)
    }

    pub fn merged_index_name(self) -> String {
        format!("merged_{}_index", self.as_str())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Field::Name),
            "address" => Ok(Field::Address),
            other => Err(format!("unknown field `{other}`, expected `name` or `address`")),
        }
    }
}
