//! decision.rs — Final decision badge: model signal fused with news sentiment.
//!
//! The same `(decision, sentiment)` pair must always render the same label and
//! badge across dashboards and CSV exports, so everything goes through [`fuse`].

use serde::{Deserialize, Serialize};

use crate::sentiment::{clean_label, Sentiment};

/// Signal produced by the prediction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ModelDecision {
    Invest,
    Hold,
}

impl ModelDecision {
    /// Leading word of the cleaned label, case-insensitive:
    /// `"✅ Invest (Buy Opportunity)"` is Invest, `"Sell"` is unrecognized.
    pub fn from_label(label: &str) -> Option<Self> {
        let cleaned = clean_label(label);
        let head = cleaned.split_whitespace().next()?;
        if head.eq_ignore_ascii_case("invest") {
            Some(Self::Invest)
        } else if head.eq_ignore_ascii_case("hold") {
            Some(Self::Hold)
        } else {
            None
        }
    }
}

/// Badge strength, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Strong,
    Normal,
    Caution,
    Avoid,
}

impl Severity {
    /// CSS classes the dashboards use for the badge.
    pub fn badge_class(self) -> &'static str {
        match self {
            Severity::Strong => "bg-green-500 text-white",
            Severity::Normal => "bg-green-400 text-white",
            Severity::Caution => "bg-yellow-400 text-black",
            Severity::Avoid => "bg-red-500 text-white",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutput {
    pub label: String,
    pub severity: Severity,
}

impl DecisionOutput {
    fn new(label: &str, severity: Severity) -> Self {
        Self {
            label: label.to_string(),
            severity,
        }
    }

    pub fn badge_class(&self) -> &'static str {
        self.severity.badge_class()
    }
}

/// Inputs to [`fuse`]; `None` sentiment means the news lookup produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub model_decision: Option<ModelDecision>,
    pub sentiment: Option<Sentiment>,
}

impl DecisionInput {
    pub fn from_labels(model_decision: Option<&str>, sentiment: Option<&str>) -> Self {
        Self {
            model_decision: model_decision.and_then(ModelDecision::from_label),
            sentiment: sentiment.and_then(Sentiment::from_label),
        }
    }

    pub fn fuse(&self) -> DecisionOutput {
        fuse(self.model_decision, self.sentiment)
    }
}

/// Which sentiments a row accepts. `None` (missing) is listed explicitly.
type FusionRow = (ModelDecision, &'static [Option<Sentiment>], &'static str, Severity);

const FUSION_TABLE: &[FusionRow] = &[
    (
        ModelDecision::Invest,
        &[Some(Sentiment::Positive)],
        "Invest Strongly",
        Severity::Strong,
    ),
    (
        ModelDecision::Invest,
        &[Some(Sentiment::Neutral), Some(Sentiment::Negative), None],
        "Invest",
        Severity::Normal,
    ),
    (
        ModelDecision::Hold,
        &[Some(Sentiment::Positive)],
        "Hold Carefully",
        Severity::Caution,
    ),
    (
        ModelDecision::Hold,
        &[Some(Sentiment::Neutral), Some(Sentiment::Negative), None],
        "Hold",
        Severity::Caution,
    ),
];

const FALLBACK_LABEL: &str = "Avoid";

/// Pure and total: unknown or missing model decisions fall through to Avoid.
pub fn fuse(model: Option<ModelDecision>, sentiment: Option<Sentiment>) -> DecisionOutput {
    let Some(model) = model else {
        return DecisionOutput::new(FALLBACK_LABEL, Severity::Avoid);
    };
    FUSION_TABLE
        .iter()
        .find(|(m, accepts, _, _)| *m == model && accepts.contains(&sentiment))
        .map(|(_, _, label, severity)| DecisionOutput::new(label, *severity))
        .unwrap_or_else(|| DecisionOutput::new(FALLBACK_LABEL, Severity::Avoid))
}

/// String front-end for [`fuse`], for raw backend fields.
pub fn fuse_labels(model_decision: Option<&str>, sentiment: Option<&str>) -> DecisionOutput {
    DecisionInput::from_labels(model_decision, sentiment).fuse()
}
