//! SSML serialization of synthesis requests

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use super::query::{Script, SynthesisRequest, TextFragment};

/// Provider flavour of SSML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Azure neural TTS (`mstts` extensions for exact trailing silence)
    Azure,
    /// Google Cloud TTS (plain `<break>` elements)
    Google,
}

/// Serialize a request into one SSML document
///
/// Each fragment becomes one `<voice>` block per rendering, each block on its
/// own line.
#[must_use]
pub fn render(request: &SynthesisRequest, dialect: Dialect) -> String {
    let mut body = String::new();
    for fragment in &request.fragments {
        let rate = request.rate_for(fragment.script);
        for text in renderings(fragment) {
            render_block(&mut body, fragment, &text, rate, dialect);
        }
    }

    match dialect {
        Dialect::Azure => format!(
            r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xmlns:mstts="https://www.w3.org/2001/mstts" xml:lang="zh-CN">
{body}</speak>"#
        ),
        Dialect::Google => format!("<speak>\n{body}</speak>"),
    }
}

/// Texts to voice for one fragment, in order
///
/// Target-language text is spoken continuously (whitespace removed). A split
/// fragment with internal whitespace is additionally spoken with whitespace
/// intact, which the provider renders as short pauses between words.
#[must_use]
pub fn renderings(fragment: &TextFragment) -> Vec<String> {
    let primary = if fragment.script == Script::Target || fragment.split_rendering {
        fragment.continuous_text()
    } else {
        fragment.text.clone()
    };

    if fragment.renders_twice() {
        vec![primary, fragment.text.clone()]
    } else {
        vec![primary]
    }
}

fn render_block(out: &mut String, fragment: &TextFragment, text: &str, rate: f32, dialect: Dialect) {
    let name = escape(&fragment.voice.name);
    let text = escape(text);
    let pause = fragment.pause_after;

    // writing into a String cannot fail
    let _ = match dialect {
        Dialect::Azure => writeln!(
            out,
            r#"<voice name="{name}"><mstts:silence type="Tailing-exact" value="{pause}ms"/><prosody rate="{rate}">{text}</prosody></voice>"#
        ),
        Dialect::Google => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let percent = (rate * 100.0).round() as u32;
            writeln!(
                out,
                r#"<voice name="{name}"><prosody rate="{percent}%">{text}</prosody><break time="{pause}ms"/></voice>"#
            )
        }
    };
}

/// Escape text for use inside SSML
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

static TRAILING_ARTIFACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</voice>[^\n]*").expect("valid regex"));

/// Remove stray text between a closing `</voice>` and the next line break
///
/// Documents from [`render`] never contain such text; this only matters for
/// markup assembled by hand.
#[must_use]
pub fn strip_trailing_markup_artifacts(markup: &str) -> String {
    TRAILING_ARTIFACT.replace_all(markup, "</voice>").into_owned()
}
