//! Keyword vocabularies and language heuristics
//!
//! Fixed word lists drive intent detection and parameter extraction. The
//! tables cover the bot's documented examples plus the common cases around
//! them; they are deliberately not exhaustive over all world currencies
//! and languages.

use std::sync::LazyLock;

use regex::Regex;

/// Currency codes the converter understands well enough to match in text
pub const KNOWN_CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "JPY", "CNY", "MXN", "CAD", "AUD", "BRL", "INR", "KRW", "CHF",
];

/// Display symbols for the common currencies
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("CNY", "¥"),
    ("MXN", "$"),
    ("CAD", "C$"),
    ("AUD", "A$"),
    ("BRL", "R$"),
    ("INR", "₹"),
    ("KRW", "₩"),
    ("CHF", "Fr"),
];

/// Natural-language currency names (es + en), lowercase, mapped to codes
const CURRENCY_NAMES: &[(&str, &str)] = &[
    ("dolar", "USD"),
    ("dolares", "USD"),
    ("dólar", "USD"),
    ("dólares", "USD"),
    ("dollar", "USD"),
    ("dollars", "USD"),
    ("euro", "EUR"),
    ("euros", "EUR"),
    ("libra", "GBP"),
    ("libras", "GBP"),
    ("pound", "GBP"),
    ("pounds", "GBP"),
    ("yen", "JPY"),
    ("yenes", "JPY"),
    ("peso", "MXN"),
    ("pesos", "MXN"),
    ("yuan", "CNY"),
    ("renminbi", "CNY"),
    ("real", "BRL"),
    ("reales", "BRL"),
    ("rupia", "INR"),
    ("rupias", "INR"),
    ("franco", "CHF"),
    ("francos", "CHF"),
];

/// Phrases that mark an explicit translation request (direct path)
const TRANSLATION_MARKERS: &[&str] = &[
    "translate",
    "translation",
    "traduce",
    "traducir",
    "traducción",
    "traduccion",
    "traductor",
    "cómo se dice",
    "como se dice",
    "how to say",
    "how do you say",
    "al español",
    "al espanol",
    "al inglés",
    "al ingles",
    "al francés",
    "al frances",
    "al alemán",
    "al aleman",
    "al italiano",
    "al portugués",
    "al portugues",
    "to english",
    "to spanish",
    "to french",
    "to german",
    "to italian",
    "to portuguese",
];

/// Looser keyword union for the agent-eligible check: anything that smells
/// like currency, translation, or lyrics
const AGENT_KEYWORDS: &[&str] = &[
    // currency
    "convertir",
    "conversion",
    "conversión",
    "conversor",
    "convierte",
    "convert",
    "currency",
    "moneda",
    "monedas",
    "cuanto es",
    "cuánto es",
    "dolar",
    "dólar",
    "euro",
    "peso",
    "libra",
    // translation
    "traducir",
    "traducción",
    "traduccion",
    "traductor",
    "traduce",
    "translate",
    "translation",
    "en ingles",
    "en inglés",
    "en español",
    "en espanol",
    "al ingles",
    "al inglés",
    "al español",
    "al espanol",
    "cómo se dice",
    "como se dice",
    // lyrics
    "letra",
    "letras",
    "cancion",
    "canción",
    "song",
    "lyric",
    "lyrics",
    "musica",
    "música",
    "artista",
    "banda",
];

/// Language names (es + en), lowercase, mapped to ISO 639-1 codes
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("español", "es"),
    ("espanol", "es"),
    ("castellano", "es"),
    ("spanish", "es"),
    ("inglés", "en"),
    ("ingles", "en"),
    ("english", "en"),
    ("francés", "fr"),
    ("frances", "fr"),
    ("french", "fr"),
    ("alemán", "de"),
    ("aleman", "de"),
    ("german", "de"),
    ("italiano", "it"),
    ("italian", "it"),
    ("portugués", "pt"),
    ("portugues", "pt"),
    ("portuguese", "pt"),
    ("ruso", "ru"),
    ("russian", "ru"),
    ("chino", "zh"),
    ("chinese", "zh"),
    ("japonés", "ja"),
    ("japones", "ja"),
    ("japanese", "ja"),
    ("coreano", "ko"),
    ("korean", "ko"),
];

/// Display names for supported language codes
const LANGUAGE_DISPLAY: &[(&str, &str)] = &[
    ("es", "Español"),
    ("en", "English"),
    ("fr", "Français"),
    ("de", "Deutsch"),
    ("it", "Italiano"),
    ("pt", "Português"),
    ("ru", "Русский"),
    ("zh", "中文"),
    ("ja", "日本語"),
    ("ko", "한국어"),
];

static CURRENCY_CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = KNOWN_CURRENCY_CODES.join("|");
    Regex::new(&format!(r"(?i)\b({})\b", alternation)).unwrap()
});

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}]+").unwrap());

/// Map a currency name token to its ISO code
pub fn currency_code_for_name(word: &str) -> Option<&'static str> {
    let word = word.to_lowercase();
    CURRENCY_NAMES
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, code)| *code)
}

/// Display symbol for a currency code, empty when unknown
pub fn currency_symbol(code: &str) -> &'static str {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, symbol)| *symbol)
        .unwrap_or("")
}

/// ISO-code mentions in the text, as (byte offset, canonical code)
pub fn currency_code_mentions(text: &str) -> Vec<(usize, &'static str)> {
    CURRENCY_CODE_PATTERN
        .find_iter(text)
        .filter_map(|m| {
            KNOWN_CURRENCY_CODES
                .iter()
                .find(|code| code.eq_ignore_ascii_case(m.as_str()))
                .map(|code| (m.start(), *code))
        })
        .collect()
}

/// Currency-name mentions in the text, as (byte offset, mapped code)
pub fn currency_name_mentions(text: &str) -> Vec<(usize, &'static str)> {
    WORD_PATTERN
        .find_iter(text)
        .filter_map(|m| currency_code_for_name(m.as_str()).map(|code| (m.start(), code)))
        .collect()
}

/// True iff the text mentions a currency by code or by name
pub fn contains_currency_keyword(text: &str) -> bool {
    if CURRENCY_CODE_PATTERN.is_match(text) {
        return true;
    }
    let lower = text.to_lowercase();
    CURRENCY_NAMES.iter().any(|(name, _)| lower.contains(name))
}

/// True iff the text contains an explicit translation marker
pub fn contains_translation_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRANSLATION_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

/// True iff the text contains any tool-flavored keyword (the broad set)
pub fn contains_agent_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    AGENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
        || CURRENCY_CODE_PATTERN.is_match(text)
}

/// Map a language name to its ISO code
pub fn language_code_for_name(word: &str) -> Option<&'static str> {
    let word = word.to_lowercase();
    LANGUAGE_NAMES
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, code)| *code)
}

/// Display name for a language code; falls back to the code itself
pub fn language_name(code: &str) -> &str {
    LANGUAGE_DISPLAY
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// Languages the detection heuristic can tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Es,
    En,
}

impl Lang {
    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Es => "es",
            Lang::En => "en",
        }
    }

    /// The other supported language
    pub fn opposite(&self) -> Lang {
        match self {
            Lang::Es => Lang::En,
            Lang::En => Lang::Es,
        }
    }
}

const ES_STOP_WORDS: &[&str] = &[
    "el", "la", "los", "las", "de", "del", "que", "es", "un", "una", "por", "con", "para",
    "como", "esta", "está", "hola", "gracias", "buenos", "buenas", "dónde", "donde", "quiero",
];

const EN_STOP_WORDS: &[&str] = &[
    "the", "is", "are", "of", "and", "to", "it", "you", "that", "for", "on", "with", "this",
    "hello", "hi", "thanks", "please", "where", "what", "how",
];

/// Best-effort source language detection.
///
/// Spanish-only characters decide immediately; otherwise a small stop-word
/// count wins. Returns `None` when nothing is conclusive.
pub fn detect_language(text: &str) -> Option<Lang> {
    if text
        .chars()
        .any(|c| "áéíóúñü¿¡ÁÉÍÓÚÑ".contains(c))
    {
        return Some(Lang::Es);
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    let es_hits = words.iter().filter(|w| ES_STOP_WORDS.contains(w)).count();
    let en_hits = words.iter().filter(|w| EN_STOP_WORDS.contains(w)).count();

    match es_hits.cmp(&en_hits) {
        std::cmp::Ordering::Greater => Some(Lang::Es),
        std::cmp::Ordering::Less => Some(Lang::En),
        std::cmp::Ordering::Equal => None,
    }
}
