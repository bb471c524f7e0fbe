//! Short-term prediction request/response shapes and the dashboard CSV export.

use serde::{Deserialize, Serialize};

use crate::decision::{fuse_labels, DecisionOutput};

pub const CSV_HEADER: &str = "Symbol,Current Price,Predicted Price,RSI,Volatility,Stop Loss,Take Profit,Decision,News Sentiment,Final Decision";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermRequest {
    /// Comma separated tickers, e.g. "AAPL,TSLA".
    pub symbols: String,
    pub exchange: String,
    pub asset_type: String,
    pub risk_tolerance: f64,
}

impl ShortTermRequest {
    pub fn new(symbols: &str, exchange: impl Into<String>, asset_type: impl Into<String>) -> Self {
        Self {
            symbols: normalize_symbols(symbols),
            exchange: exchange.into(),
            asset_type: asset_type.into(),
            risk_tolerance: 1.0,
        }
    }

    pub fn with_risk_tolerance(mut self, risk: f64) -> Self {
        self.risk_tolerance = risk;
        self
    }
}

/// `" aapl, tsla ,,"` → `"AAPL,TSLA"`.
pub fn normalize_symbols(raw: &str) -> String {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// One dashboard row. Rows for unknown tickers carry only `symbol` + `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortTermResult {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_sentiment: Option<String>,
    /// Whatever the backend computed; display uses [`ShortTermResult::fused`] instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<String>,
}

impl ShortTermResult {
    pub fn fused(&self) -> DecisionOutput {
        fuse_labels(self.decision.as_deref(), self.news_sentiment.as_deref())
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Price prefix for an exchange.
pub fn currency_symbol(exchange: &str) -> &'static str {
    match exchange {
        "LSE" => "£",
        "NSE" | "BSE" => "₹",
        "HKEX" => "HK$",
        _ => "$",
    }
}

/// CSV export; missing values are empty cells and the last column is the fused label.
pub fn to_csv(rows: &[ShortTermResult]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for r in rows {
        let fused = r.fused();
        let cells = [
            csv_cell(&r.symbol),
            num(r.current_price),
            num(r.predicted_price),
            num(r.rsi),
            num(r.volatility),
            num(r.stop_loss),
            num(r.take_profit),
            csv_cell(r.decision.as_deref().unwrap_or_default()),
            csv_cell(r.news_sentiment.as_deref().unwrap_or_default()),
            csv_cell(&fused.label),
        ];
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn num(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn csv_cell(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
