//! Currency conversion adapter
//!
//! Wraps a free exchange-rate service (exchangerate-api shape: one GET per
//! base currency returns the whole rate table). Pure request/response, no
//! retries; a timeout degrades to an error result.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use charla_agent::{Tool, ToolResult};
use serde::Deserialize;
use thiserror::Error;

use crate::lang;
use crate::router::CurrencyQuery;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default rate service base URL
pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com/v4/latest";

/// Currency adapter errors. Returned, never raised to the user channel.
#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("currency '{0}' not found in the rate table")]
    UnknownCurrency(String),

    #[error("currency service timed out")]
    Timeout,

    #[error("currency service unavailable: {0}")]
    Unavailable(String),
}

impl CurrencyError {
    /// User-facing error text
    pub fn user_message(&self) -> String {
        match self {
            CurrencyError::UnknownCurrency(code) => format!(
                "❌ Moneda '{}' no encontrada. Usa códigos como USD, EUR, GBP.",
                code
            ),
            CurrencyError::Timeout => {
                "❌ Tiempo de espera agotado. Intenta de nuevo.".to_string()
            }
            CurrencyError::Unavailable(_) => {
                "❌ Error de conexión con el servicio de monedas.".to_string()
            }
        }
    }
}

/// A completed conversion
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
    /// Rate rounded to 4 decimal places
    pub rate: f64,
    /// Converted amount rounded to 2 decimal places
    pub converted: f64,
    pub date: String,
}

#[derive(Debug, Deserialize)]
struct RateTable {
    rates: HashMap<String, f64>,
    #[serde(default)]
    date: Option<String>,
}

/// Client for the exchange-rate service
pub struct CurrencyConverter {
    http: reqwest::Client,
    base_url: String,
}

impl CurrencyConverter {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the service base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Convert an amount between two currencies at the current rate
    pub async fn convert(&self, query: &CurrencyQuery) -> Result<Conversion, CurrencyError> {
        let from = query.from.trim().to_uppercase();
        let to = query.to.trim().to_uppercase();

        tracing::info!(amount = query.amount, %from, %to, "converting currency");

        let url = format!("{}/{}", self.base_url, from);
        let response = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CurrencyError::UnknownCurrency(from));
        }
        if !response.status().is_success() {
            return Err(CurrencyError::Unavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let table: RateTable = response.json().await.map_err(map_reqwest_error)?;
        let rate = *table
            .rates
            .get(&to)
            .ok_or(CurrencyError::UnknownCurrency(to.clone()))?;

        Ok(build_conversion(
            query.amount,
            &from,
            &to,
            rate,
            table.date.as_deref().unwrap_or("N/A"),
        ))
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new()
    }
}

fn map_reqwest_error(e: reqwest::Error) -> CurrencyError {
    if e.is_timeout() {
        CurrencyError::Timeout
    } else {
        CurrencyError::Unavailable(e.to_string())
    }
}

/// Apply the display rounding rules: rate to 4 decimals, amount to 2.
fn build_conversion(amount: f64, from: &str, to: &str, rate: f64, date: &str) -> Conversion {
    Conversion {
        amount,
        from: from.to_string(),
        to: to.to_string(),
        rate: round_to(rate, 4),
        converted: round_to(amount * rate, 2),
        date: date.to_string(),
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Format a conversion for display
pub fn format_conversion(c: &Conversion) -> String {
    format!(
        "💱 {}{:.2} {} → {}{:.2} {}\n📊 Tasa: 1 {} = {} {}\n📅 Fecha: {}",
        lang::currency_symbol(&c.from),
        c.amount,
        c.from,
        lang::currency_symbol(&c.to),
        c.converted,
        c.to,
        c.from,
        c.rate,
        c.to,
        c.date,
    )
}

#[async_trait]
impl Tool for CurrencyConverter {
    fn name(&self) -> &str {
        "convert_currency"
    }

    fn description(&self) -> &str {
        "Convert an amount between two currencies using current exchange rates. \
         Use ISO codes such as USD, EUR, GBP, JPY, MXN."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "amount": { "type": "number", "description": "Amount to convert" },
                "from": { "type": "string", "description": "Source currency code (e.g. USD)" },
                "to": { "type": "string", "description": "Target currency code (e.g. EUR)" }
            },
            "required": ["amount", "from", "to"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> ToolResult {
        let query = match parse_args(&arguments) {
            Ok(q) => q,
            Err(msg) => return ToolResult::error(msg),
        };

        match self.convert(&query).await {
            Ok(conversion) => ToolResult::text(format_conversion(&conversion)),
            Err(e) => {
                tracing::warn!(error = %e, "currency conversion failed");
                ToolResult::error(e.user_message())
            }
        }
    }
}

fn parse_args(arguments: &serde_json::Value) -> Result<CurrencyQuery, String> {
    let amount = arguments
        .get("amount")
        .and_then(|v| v.as_f64())
        .ok_or("Missing 'amount' argument")?;
    let from = arguments
        .get("from")
        .and_then(|v| v.as_str())
        .ok_or("Missing 'from' argument")?;
    let to = arguments
        .get("to")
        .and_then(|v| v.as_str())
        .ok_or("Missing 'to' argument")?;

    Ok(CurrencyQuery {
        amount,
        from: from.to_string(),
        to: to.to_string(),
    })
}
