//! Tool adapters: currency conversion, translation, lyrics lookup

mod currency;
mod lyrics;
mod translator;

pub use currency::{Conversion, CurrencyConverter, CurrencyError, format_conversion};
pub use lyrics::{Lyrics, LyricsClient, LyricsError, MAX_DISPLAY_LINES, format_lyrics};
pub use translator::{
    BackendError, LibreBackend, MAX_TEXT_LEN, MyMemoryBackend, TranslateError, Translation,
    TranslationBackend, Translator, format_translation,
};
