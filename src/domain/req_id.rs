//! Requirement identifiers derived from AR titles.
//!
//! AR titles embed a low-level requirement token of the form
//! `LLR_OS_<NN>_<NN>_<NN>`. The token names the AR itself, and its leading
//! groups name the owning SR (`HLR_OS_<NN>_<NN>`) and IR (`HLR_OS_<NN>`).

use std::fmt;

/// The marker that starts a low-level requirement token in an AR title.
pub const LLR_MARKER: &str = "LLR_OS_";

/// Width of a complete token, e.g. `LLR_OS_01_02_03`.
const TOKEN_LEN: usize = 15;

/// Group value used for identifiers that cannot be parsed, so they sort last.
pub const SENTINEL: u64 = u64::MAX;

/// Tie-break string for nodes that have no identifier at all.
const EMPTY_TIE_BREAK: &str = "zzz";

/// Errors produced while extracting a token from an AR title.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The title does not contain [`LLR_MARKER`].
    #[error("title '{0}' contains no LLR_OS_ token")]
    Missing(String),

    /// The candidate token does not split into `LLR`, `OS` and three groups.
    #[error("malformed requirement token '{0}'")]
    Malformed(String),
}

/// A validated `LLR_OS_<a>_<b>_<c>` token taken from an AR title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlrToken {
    raw: String,
    groups: [String; 3],
}

impl LlrToken {
    /// Extracts the token from an AR title.
    ///
    /// The 15 characters starting at the first occurrence of [`LLR_MARKER`]
    /// are taken as the candidate and must split on `_` into exactly five
    /// parts, the first two being `LLR` and `OS`. The numeric groups are not
    /// checked here; sorting coerces non-numeric groups to zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Missing`] if the marker is absent and
    /// [`Error::Malformed`] if the candidate has the wrong shape.
    pub fn from_title(title: &str) -> Result<Self, Error> {
        let start = title
            .find(LLR_MARKER)
            .ok_or_else(|| Error::Missing(title.to_string()))?;

        let raw: String = title[start..].chars().take(TOKEN_LEN).collect();

        let parts: Vec<&str> = raw.split('_').collect();
        match parts.as_slice() {
            ["LLR", "OS", a, b, c] => {
                let groups = [(*a).to_string(), (*b).to_string(), (*c).to_string()];
                Ok(Self { raw, groups })
            }
            _ => Err(Error::Malformed(raw)),
        }
    }

    /// The AR identifier: the token verbatim.
    #[must_use]
    pub fn ar_id(&self) -> &str {
        &self.raw
    }

    /// The identifier of the owning SR, `HLR_OS_<a>_<b>`.
    #[must_use]
    pub fn sr_id(&self) -> String {
        format!("HLR_OS_{}_{}", self.groups[0], self.groups[1])
    }

    /// The identifier of the owning IR, `HLR_OS_<a>`.
    #[must_use]
    pub fn ir_id(&self) -> String {
        format!("HLR_OS_{}", self.groups[0])
    }
}

impl fmt::Display for LlrToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Ordering key for a node at a given depth.
///
/// Compares the numeric groups first and the raw identifier second.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    groups: Vec<u64>,
    tie_break: String,
}

impl SortKey {
    /// Builds the key for `req_id`, reading `depth` numeric groups after the
    /// `<PREFIX>_OS_` head (1 for IR, 2 for SR, 3 for AR).
    ///
    /// An empty identifier, or one with too few parts, gets [`SENTINEL`] in
    /// every group. Groups that are not plain ASCII digits count as zero.
    #[must_use]
    pub fn new(req_id: &str, depth: usize) -> Self {
        if req_id.is_empty() {
            return Self {
                groups: vec![SENTINEL; depth],
                tie_break: EMPTY_TIE_BREAK.to_string(),
            };
        }

        let parts: Vec<&str> = req_id.split('_').collect();
        if parts.len() < 2 + depth {
            return Self {
                groups: vec![SENTINEL; depth],
                tie_break: req_id.to_string(),
            };
        }

        let groups = parts[2..2 + depth].iter().map(|p| parse_group(p)).collect();

        Self {
            groups,
            tie_break: req_id.to_string(),
        }
    }

    /// The parsed numeric groups.
    #[must_use]
    pub fn groups(&self) -> &[u64] {
        &self.groups
    }
}

fn parse_group(part: &str) -> u64 {
    if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
        part.parse().unwrap_or(0)
    } else {
        0
    }
}
