//! Element identifiers and their total order

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordering key attached to every element.
///
/// `site` is a stable per-participant label and `counter` a sequence number
/// minted by that site. Sites mint counters independently, so ordering comes
/// from [`Ord`] alone, never from arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub site: String,
    pub counter: i64,
}

impl Identifier {
    pub fn new(site: impl Into<String>, counter: i64) -> Self {
        Self {
            site: site.into(),
            counter,
        }
    }
}

impl Ord for Identifier {
    /// Counter ascending, then site by byte order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.counter
            .cmp(&other.counter)
            .then_with(|| self.site.as_bytes().cmp(other.site.as_bytes()))
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site, self.counter)
    }
}
