use core::fmt::Write;
use std::{
    io,
    path::{Path, PathBuf},
};

use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// One accepted user-agent string, stored exactly as scraped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserAgent(String);

impl UserAgent {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserAgent {
    #[inline]
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("cannot read snapshot {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed snapshot {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot holds {found} user agents, at least {required} required")]
    TooFew { found: usize, required: usize },
}

/// The last published list, loaded once per run and handed down explicitly.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    agents: Vec<UserAgent>,
}

impl Snapshot {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await.map_err(|source| SnapshotError::Read {
            path: path.to_owned(),
            source,
        })?;
        let agents = serde_json::from_slice::<Vec<UserAgent>>(&raw).map_err(|source| {
            SnapshotError::Parse {
                path: path.to_owned(),
                source,
            }
        })?;
        tracing::info!(target: "snapshot", "loaded {} user agents from {}", agents.len(), path.display());
        Ok(Self { agents })
    }

    #[inline]
    pub const fn from_agents(agents: Vec<UserAgent>) -> Self {
        Self { agents }
    }

    #[inline]
    pub fn agents(&self) -> &[UserAgent] {
        &self.agents
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn random_agent(&self) -> Option<&UserAgent> {
        self.agents.choose(&mut rand::rng())
    }

    pub fn ensure_min(&self, required: usize) -> Result<(), SnapshotError> {
        if self.agents.len() < required {
            return Err(SnapshotError::TooFew {
                found: self.agents.len(),
                required,
            });
        }
        Ok(())
    }

    pub fn to_canonical_json(&self) -> String {
        canonical_json(&self.agents)
    }
}

/// Serializes `agents` with 4-space indentation, non-ASCII characters and DEL escaped as
/// `\uXXXX` and exactly one trailing newline. Equal lists give equal bytes.
pub fn canonical_json(agents: &[UserAgent]) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    agents.serialize(&mut ser).unwrap();
    let pretty = String::from_utf8_lossy(&buf);

    let mut out = String::with_capacity(pretty.len() + 1);
    let mut units = [0u16; 2];
    for c in pretty.trim().chars() {
        if c.is_ascii() && c != '\x7f' {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out.push('\n');
    out
}
