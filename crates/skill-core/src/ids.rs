//! Dialog node id minting.
//!
//! Generated ids are `node_` followed by 16 lowercase hex digits. Anything
//! else found in a skill export was authored by hand.

use sha2::{Digest, Sha256};
use uuid::Uuid;

const PREFIX: &str = "node_";
const HEX_LEN: usize = 16;

/// Returns whether `id` follows the generator's id scheme.
pub fn is_generated_id(id: &str) -> bool {
    id.strip_prefix(PREFIX).is_some_and(|hex| {
        hex.len() == HEX_LEN
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    })
}

/// Source of fresh node ids.
#[derive(Debug, Clone)]
pub enum IdMinter {
    /// Random ids, different on every run.
    Random,
    /// Ids derived from a seed and a counter; identical runs mint identical ids.
    Seeded { seed: String, counter: u64 },
}

impl IdMinter {
    pub fn random() -> Self {
        Self::Random
    }

    pub fn seeded(seed: impl Into<String>) -> Self {
        Self::Seeded {
            seed: seed.into(),
            counter: 0,
        }
    }

    /// Seeded when a seed is configured, random otherwise.
    pub fn from_seed(seed: Option<&str>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::random(),
        }
    }

    /// Mint the next id.
    pub fn mint(&mut self) -> String {
        let hex = match self {
            Self::Random => Uuid::new_v4().simple().to_string(),
            Self::Seeded { seed, counter } => {
                let mut hasher = Sha256::new();
                hasher.update(seed.as_bytes());
                hasher.update(counter.to_be_bytes());
                *counter += 1;
                format!("{:x}", hasher.finalize())
            }
        };
        format!("{PREFIX}{}", &hex[..HEX_LEN])
    }
}
