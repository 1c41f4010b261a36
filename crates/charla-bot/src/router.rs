//! Intent routing and parameter extraction
//!
//! Free text goes down one of three paths: a direct tool call when the
//! intent is unambiguous, the agent when the phrasing merely smells like a
//! tool request, and plain chat otherwise. The direct paths exist because
//! the agent is slower and less reliable than a straight adapter call, so
//! the router bypasses it whenever it is confident.
//!
//! Everything here is best-effort pattern matching over fixed
//! vocabularies, not language understanding. Ambiguous phrasing outside
//! the documented examples may be misrouted, and that is accepted.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::lang;

/// Where a message should be handled. Computed fresh per message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Direct currency conversion (tool adapter, no agent)
    Currency { text: String },
    /// Direct translation (tool adapter, no agent)
    Translation { text: String },
    /// Tool-flavored but ambiguous: let the agent pick
    Agent { text: String },
    /// Plain contextual chat
    Chat { text: String },
}

/// Extraction failures. User-facing and recoverable by rephrasing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no amount found in the message")]
    MissingAmount,
    #[error("could not determine the source and target currencies")]
    CurrencyPair,
}

impl ExtractError {
    /// User-facing error text
    pub fn user_message(&self) -> String {
        match self {
            ExtractError::MissingAmount => {
                "❌ No encontré una cantidad en tu mensaje. Ejemplo: '100 USD a EUR'".to_string()
            }
            ExtractError::CurrencyPair => {
                "❌ No pude determinar las monedas origen y destino. Usa: '100 USD a EUR'"
                    .to_string()
            }
        }
    }
}

/// Extracted parameters for a direct currency conversion
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyQuery {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

/// Extracted parameters for a direct translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationQuery {
    pub text: String,
    pub source: String,
    pub target: String,
}

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:[.,][0-9]+)?").unwrap());

/// Trailing "al/a/to/in/en <language>" marker, tolerating end punctuation
static TARGET_LANG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:al|a|to|in|en)\s+([\p{L}]+)\s*[?!.¿¡]*\s*$").unwrap()
});

/// First single- or double-quoted substring
static QUOTED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());

/// Decide which path handles a message. Priority ordered; first match wins.
pub fn classify(text: &str) -> Route {
    let owned = text.to_string();

    if NUMBER_PATTERN.is_match(text) && lang::contains_currency_keyword(text) {
        return Route::Currency { text: owned };
    }
    if lang::contains_translation_marker(text) {
        return Route::Translation { text: owned };
    }
    if lang::contains_agent_keyword(text) {
        return Route::Agent { text: owned };
    }
    Route::Chat { text: owned }
}

/// Extract amount and currency pair from a direct-currency message.
///
/// The first numeric token is the amount. Two ISO codes win outright
/// (first = from, second = to); otherwise currency names are resolved by
/// position: source is the first mention at or after the amount, target is
/// the next distinct mention (usually across an "a"/"to"/"en" connective).
pub fn parse_currency_query(text: &str) -> Result<CurrencyQuery, ExtractError> {
    let number = NUMBER_PATTERN
        .find(text)
        .ok_or(ExtractError::MissingAmount)?;
    let amount: f64 = number
        .as_str()
        .replace(',', ".")
        .parse()
        .map_err(|_| ExtractError::MissingAmount)?;

    let codes = lang::currency_code_mentions(text);
    if codes.len() >= 2 {
        return Ok(CurrencyQuery {
            amount,
            from: codes[0].1.to_string(),
            to: codes[1].1.to_string(),
        });
    }

    let mut mentions = codes;
    mentions.extend(lang::currency_name_mentions(text));
    mentions.sort_by_key(|(pos, _)| *pos);

    if mentions.len() < 2 {
        return Err(ExtractError::CurrencyPair);
    }

    let from_idx = mentions
        .iter()
        .position(|(pos, _)| *pos >= number.end())
        .unwrap_or(0);
    let from = mentions[from_idx].1;

    let to = mentions
        .iter()
        .enumerate()
        .find(|(i, (pos, _))| *i != from_idx && *pos > mentions[from_idx].0)
        .or_else(|| {
            mentions
                .iter()
                .enumerate()
                .find(|(i, _)| *i != from_idx)
        })
        .map(|(_, (_, code))| *code)
        .ok_or(ExtractError::CurrencyPair)?;

    Ok(CurrencyQuery {
        amount,
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// Extract the text-to-translate and target language from a
/// direct-translation message. Never fails; ambiguity resolves to
/// deterministic defaults (source "auto", target "es").
pub fn parse_translation_query(text: &str) -> TranslationQuery {
    let mut remainder = text.to_string();

    // Explicit trailing target language, e.g. "... al español"
    let explicit_target = TARGET_LANG_PATTERN.captures(text).and_then(|caps| {
        let code = lang::language_code_for_name(&caps[1])?;
        if let Some(m) = caps.get(0) {
            remainder.replace_range(m.range(), "");
        }
        Some(code.to_string())
    });

    // Quoted text wins; otherwise strip the marker phrasing
    let to_translate = match QUOTED_PATTERN.captures(text) {
        Some(caps) => caps[1].to_string(),
        None => strip_markers(&remainder),
    };

    let target = explicit_target.unwrap_or_else(|| {
        match lang::detect_language(&to_translate) {
            Some(source) => source.opposite().code().to_string(),
            None => "es".to_string(),
        }
    });

    TranslationQuery {
        text: to_translate,
        source: "auto".to_string(),
        target,
    }
}

/// Remove translation-intent phrasing, leaving the payload text
fn strip_markers(text: &str) -> String {
    static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)\b(?:cómo se dice|como se dice|how do you say|how to say|traducción de|traduccion de|translate|translation|traducir|traductor|traduce)\b",
        )
        .unwrap()
    });

    MARKER_PATTERN
        .replace_all(text, "")
        .trim()
        .trim_matches(|c: char| c == ':' || c == ',' || c == '?' || c == '¿')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- classify ----

    #[test]
    fn test_classify_currency_with_codes() {
        let route = classify("convierte 100 USD EUR");
        assert_eq!(
            route,
            Route::Currency {
                text: "convierte 100 USD EUR".to_string()
            }
        );
    }

    #[test]
    fn test_classify_currency_with_names() {
        assert!(matches!(
            classify("cuánto son 100 dólares en euros"),
            Route::Currency { .. }
        ));
    }

    #[test]
    fn test_classify_translation() {
        assert!(matches!(
            classify("traduce 'hello world' al español"),
            Route::Translation { .. }
        ));
    }

    #[test]
    fn test_classify_currency_wins_over_translation() {
        // Has a number + currency keyword, so the currency fast lane wins
        // even though "al" phrasing could read as translation.
        assert!(matches!(
            classify("convierte 100 dólares a euros"),
            Route::Currency { .. }
        ));
    }

    #[test]
    fn test_classify_agent_for_lyrics() {
        // Lyrics have no direct fast lane; keyword match goes to the agent.
        assert!(matches!(
            classify("letra de Bohemian Rhapsody"),
            Route::Agent { .. }
        ));
    }

    #[test]
    fn test_classify_agent_for_soft_currency_signal() {
        // Currency-flavored but no amount: not direct, still agent-worthy.
        assert!(matches!(
            classify("qué moneda usan en Japón"),
            Route::Agent { .. }
        ));
    }

    #[test]
    fn test_classify_chat_fallback() {
        assert!(matches!(classify("hola, cómo estás"), Route::Chat { .. }));
    }

    #[test]
    fn test_classify_chat_for_empty() {
        assert!(matches!(classify(""), Route::Chat { .. }));
    }

    // ---- parse_currency_query ----

    #[test]
    fn test_parse_currency_two_codes() {
        let q = parse_currency_query("convierte 100 USD EUR").unwrap();
        assert_eq!(q.amount, 100.0);
        assert_eq!(q.from, "USD");
        assert_eq!(q.to, "EUR");
    }

    #[test]
    fn test_parse_currency_names_with_connective() {
        let q = parse_currency_query("convierte 100 dólares a euros").unwrap();
        assert_eq!(q.amount, 100.0);
        assert_eq!(q.from, "USD");
        assert_eq!(q.to, "EUR");
    }

    #[test]
    fn test_parse_currency_names_en_connective() {
        let q = parse_currency_query("cuánto es 100 dólares en euros").unwrap();
        assert_eq!(q.from, "USD");
        assert_eq!(q.to, "EUR");
    }

    #[test]
    fn test_parse_currency_decimal_comma() {
        let q = parse_currency_query("50,5 EUR a MXN").unwrap();
        assert_eq!(q.amount, 50.5);
        assert_eq!(q.from, "EUR");
        assert_eq!(q.to, "MXN");
    }

    #[test]
    fn test_parse_currency_mixed_code_and_name() {
        let q = parse_currency_query("100 USD a pesos").unwrap();
        assert_eq!(q.from, "USD");
        assert_eq!(q.to, "MXN");
    }

    #[test]
    fn test_parse_currency_missing_amount() {
        assert_eq!(
            parse_currency_query("dólares a euros"),
            Err(ExtractError::MissingAmount)
        );
    }

    #[test]
    fn test_parse_currency_single_currency_fails() {
        assert_eq!(
            parse_currency_query("convierte 100 dólares"),
            Err(ExtractError::CurrencyPair)
        );
    }

    // ---- parse_translation_query ----

    #[test]
    fn test_parse_translation_quoted_with_target() {
        let q = parse_translation_query("traduce 'hello world' al español");
        assert_eq!(q.text, "hello world");
        assert_eq!(q.source, "auto");
        assert_eq!(q.target, "es");
    }

    #[test]
    fn test_parse_translation_double_quoted() {
        let q = parse_translation_query(r#"translate "buenos días" to english"#);
        assert_eq!(q.text, "buenos días");
        assert_eq!(q.target, "en");
    }

    #[test]
    fn test_parse_translation_unquoted_strips_markers() {
        let q = parse_translation_query("cómo se dice gato in english");
        assert_eq!(q.text, "gato");
        assert_eq!(q.target, "en");
    }

    #[test]
    fn test_parse_translation_defaults_to_opposite_of_detected() {
        // English text, no explicit target: translate into Spanish.
        let q = parse_translation_query("translate the weather is nice today");
        assert_eq!(q.target, "es");

        // Spanish text, no explicit target: translate into English.
        let q = parse_translation_query("traduce el clima está muy agradable");
        assert_eq!(q.target, "en");
    }

    #[test]
    fn test_parse_translation_default_target_es() {
        // Nothing detectable: fall back to Spanish.
        let q = parse_translation_query("translate pizza");
        assert_eq!(q.text, "pizza");
        assert_eq!(q.target, "es");
    }
}
