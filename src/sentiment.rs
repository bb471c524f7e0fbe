//! News sentiment labels as the backend emits them
//! (`"🟢 Positive News - Consider Buying"`, `"Neutral"`, `"Slightly Negative"` ...).

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Average polarity above this is positive, below its negation negative.
pub const POLARITY_THRESHOLD: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Case-insensitive substring match, Positive first, then Negative, then Neutral.
    /// Anything else is `None` (treated like a missing sentiment).
    pub fn from_label(label: &str) -> Option<Self> {
        let l = label.to_lowercase();
        if l.contains("positive") {
            Some(Self::Positive)
        } else if l.contains("negative") {
            Some(Self::Negative)
        } else if l.contains("neutral") {
            Some(Self::Neutral)
        } else {
            None
        }
    }

    pub fn from_polarity(avg: f64) -> Self {
        if avg > POLARITY_THRESHOLD {
            Self::Positive
        } else if avg < -POLARITY_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn news_label(self) -> &'static str {
        match self {
            Self::Positive => "Positive News - Consider Buying",
            Self::Neutral => "Neutral News - Hold",
            Self::Negative => "Negative News - Consider Selling",
        }
    }
}

/// Mean of per-article polarities; 0.0 when there are no articles.
pub fn average_polarity(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Drop emoji and punctuation (keeps letters, digits, `_`, whitespace, parentheses,
/// dashes), fold line breaks and trim. Combining marks such as the U+FE0F
/// emoji selector go too.
pub fn clean_label(s: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_\s()\-]").expect("static regex"));
    let out = re.replace_all(s, "");
    out.replace(['\r', '\n'], " ").trim().to_string()
}
