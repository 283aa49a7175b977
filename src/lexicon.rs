use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};

/// AFINN-style word weights covering the vocabulary that shows up in
/// delivery reviews. A settings-provided lexicon file extends this table.
const DEFAULT_WEIGHTS: &[(&str, i32)] = &[
    ("amazing", 4),
    ("angry", -3),
    ("awesome", 4),
    ("awful", -3),
    ("bad", -3),
    ("best", 3),
    ("broken", -1),
    ("cold", -1),
    ("damaged", -3),
    ("delicious", 3),
    ("delighted", 3),
    ("disappointed", -2),
    ("disappointing", -2),
    ("excellent", 3),
    ("fantastic", 4),
    ("fine", 2),
    ("fresh", 2),
    ("friendly", 2),
    ("good", 3),
    ("great", 3),
    ("happy", 3),
    ("hate", -3),
    ("helpful", 2),
    ("horrible", -3),
    ("impressed", 3),
    ("late", -1),
    ("love", 3),
    ("loved", 3),
    ("messy", -2),
    ("missing", -2),
    ("nice", 3),
    ("outstanding", 5),
    ("perfect", 3),
    ("pleasant", 3),
    ("poor", -2),
    ("quick", 1),
    ("rude", -2),
    ("slow", -2),
    ("spilled", -1),
    ("stale", -2),
    ("superb", 5),
    ("terrible", -3),
    ("unhappy", -2),
    ("useless", -2),
    ("waste", -1),
    ("wonderful", 4),
    ("worst", -3),
    ("wrong", -2),
];

/// Word-to-weight table backing the sentiment axis. The classifier owns the
/// thresholding policy; this type only answers weight lookups.
#[derive(Clone, Debug)]
pub(crate) struct Lexicon {
    weights: HashMap<String, i32>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Lexicon {
            weights: DEFAULT_WEIGHTS
                .iter()
                .map(|(word, weight)| ((*word).to_string(), *weight))
                .collect(),
        }
    }
}

impl Lexicon {
    /// Load extra weights from a TOML file of `word = weight` entries.
    /// File entries override the built-in table on collision.
    pub(crate) fn from_file(path: &Path) -> Result<Self> {
        let doc = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read lexicon file {}", path.display()))?;
        let overrides: HashMap<String, i32> = toml::from_str(&doc)
            .with_context(|| format!("invalid lexicon file {}", path.display()))?;
        let mut lexicon = Lexicon::default();
        for (word, weight) in overrides {
            lexicon.weights.insert(word.to_lowercase(), weight);
        }
        Ok(lexicon)
    }

    /// Weight of a lowercase token; unmatched tokens contribute 0.
    pub(crate) fn weight(&self, token: &str) -> i32 {
        self.weights.get(token).copied().unwrap_or(0)
    }
}
