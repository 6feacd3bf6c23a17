//! Study material loaders
//!
//! Sentences and dialogs are plain text; words, clozes and grammar patterns
//! are JSON exported from the flashcard tooling.

pub mod text;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Line separating dialogs in a dialog file
pub const DIALOG_SEPARATOR: &str = "---";

/// Speaker used for dialog lines without a `speaker:` prefix
pub const DEFAULT_SPEAKER: &str = "A";

/// One line of a dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogLine {
    /// Speaker label as written in the source
    pub speaker: String,
    /// Spoken text
    pub text: String,
}

/// A dialog between one or more speakers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dialog {
    /// Lines in order
    pub lines: Vec<DialogLine>,
    /// Distinct speakers in order of first appearance
    pub speakers: Vec<String>,
}

impl Dialog {
    fn push(&mut self, line: DialogLine) {
        if !self.speakers.contains(&line.speaker) {
            self.speakers.push(line.speaker.clone());
        }
        self.lines.push(line);
    }

    /// Spoken text of all lines joined by spaces
    #[must_use]
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spoken text of all lines run together, as sent for translation
    #[must_use]
    pub fn continuous_text(&self) -> String {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

/// CC-CEDICT gloss
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CedictEntry {
    /// English definition
    #[serde(rename = "cedict_en", default)]
    pub english: String,
}

/// HSK word-list gloss
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HskEntry {
    /// English definition
    #[serde(rename = "hsk_en", default)]
    pub english: String,
}

/// Example sentence with its translation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    /// Chinese sentence
    #[serde(default)]
    pub chinese: String,
    /// English translation
    #[serde(rename = "hsk_en", default)]
    pub english: String,
}

/// Vocabulary record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Word {
    /// Headword
    pub chinese: String,
    /// Short English label
    pub english: String,
    /// CC-CEDICT glosses
    pub cedict: Vec<CedictEntry>,
    /// HSK glosses
    pub hsk: Vec<HskEntry>,
    /// Free-form usage note, may mix scripts
    pub note: String,
    /// Translation from the external translations file
    pub translation: String,
    /// Example sentences
    pub examples: Vec<Example>,
    /// Tone names per syllable, e.g. "third tone"
    pub tones: Vec<String>,
}

impl Word {
    /// Ensure the word carries at least one dictionary gloss
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteVocabularyEntry`] when neither HSK nor
    /// CEDICT glosses are present.
    pub fn require_gloss(&self) -> Result<()> {
        if self.hsk.is_empty() && self.cedict.is_empty() {
            return Err(Error::IncompleteVocabularyEntry(self.chinese.clone()));
        }
        Ok(())
    }

    /// Glosses joined with "or"; HSK glosses win over CEDICT
    #[must_use]
    pub fn gloss_text(&self) -> String {
        let glosses: Vec<&str> = if self.hsk.is_empty() {
            self.cedict.iter().map(|c| c.english.as_str()).collect()
        } else {
            self.hsk.iter().map(|h| h.english.as_str()).collect()
        };
        glosses.join(" or ")
    }

    /// "The tone is the ..." / "The tones are ..., followed by ..."
    #[must_use]
    pub fn tones_sentence(&self) -> Option<String> {
        match self.tones.as_slice() {
            [] => None,
            [tone] => Some(format!("The tone is the {tone}")),
            tones => Some(format!("The tones are {}", tones.join(", followed by "))),
        }
    }
}

/// Cloze card: a sentence with the studied word blanked out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cloze {
    /// Full Chinese sentence (back of the card)
    #[serde(rename = "chinese")]
    pub sentence_back: String,
    /// English translation of the sentence
    pub english: String,
    /// Grammar reference
    pub grammar: String,
    /// Usage note
    pub note: String,
    /// The studied word
    pub word: Word,
}

/// Grammar pattern card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Grammar {
    /// Example sentence on the back of the card
    pub sentence_back: String,
    /// English translation of that sentence
    pub sentence_english: String,
    /// The pattern itself, e.g. "就"
    pub pattern: String,
    /// Explanation, may mix scripts
    pub note: String,
    /// Structure notation, e.g. "Subj. + 就 + Verb"
    pub structure: String,
    /// Example sentences
    pub examples: Vec<Example>,
    /// Key points, one per entry
    pub summary: Vec<String>,
}

/// Load sentences, one per non-blank line
///
/// A trailing ` 。` is dropped and each line is trimmed.
///
/// # Errors
///
/// Returns an error if the file cannot be read
pub fn load_sentences(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_sentences(&content))
}

fn parse_sentences(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.replace(" 。", "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Load dialogs separated by `---` lines
///
/// # Errors
///
/// Returns an error if the file cannot be read
pub fn load_dialogs(path: &Path) -> Result<Vec<Dialog>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_dialogs(&content))
}

fn parse_dialogs(content: &str) -> Vec<Dialog> {
    let mut dialogs = Vec::new();
    let mut current = Dialog::default();

    for raw in content.lines() {
        if raw.trim() == DIALOG_SEPARATOR {
            if !current.lines.is_empty() {
                dialogs.push(std::mem::take(&mut current));
            }
            continue;
        }
        if raw.trim().is_empty() {
            continue;
        }
        current.push(split_speaker(raw));
    }

    if !current.lines.is_empty() {
        dialogs.push(current);
    }
    dialogs
}

/// Split `speaker: text` on an ASCII or full-width colon
fn split_speaker(line: &str) -> DialogLine {
    let split = line.split_once(':').or_else(|| line.split_once('：'));
    match split {
        Some((speaker, text)) => DialogLine {
            speaker: speaker.trim().to_string(),
            text: text.trim().to_string(),
        },
        None => DialogLine {
            speaker: DEFAULT_SPEAKER.to_string(),
            text: line.trim().to_string(),
        },
    }
}

/// Load every `*.json` grammar file in `dir`, sorted by file name
///
/// # Errors
///
/// Returns an error if the directory cannot be read or a file is not valid
/// grammar JSON
pub fn load_patterns(dir: &Path) -> Result<Vec<Grammar>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    files
        .iter()
        .map(|path| {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str(&data).map_err(|e| {
                Error::Input(format!("failed to parse {}: {e}", path.display()))
            })
        })
        .collect()
}

/// Load a JSON array of words
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn load_words(path: &Path) -> Result<Vec<Word>> {
    load_json_array(path)
}

/// Load a JSON array of clozes
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed
pub fn load_clozes(path: &Path) -> Result<Vec<Cloze>> {
    load_json_array(path)
}

fn load_json_array<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|e| Error::Input(format!("failed to parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // -- sentences -------------------------------------------------------------

    #[test]
    fn sentences_skip_blank_lines_and_strip_stop() {
        let sentences = parse_sentences("我喜欢茶 。\n\n  你好  \n");
        assert_eq!(sentences, vec!["我喜欢茶", "你好"]);
    }

    // -- dialogs ---------------------------------------------------------------

    #[test]
    fn dialogs_split_on_separator() {
        let dialogs = parse_dialogs("A: 你好\nB：你好吗\n---\n我很好\n---\n");

        assert_eq!(dialogs.len(), 2);
        assert_eq!(dialogs[0].speakers, vec!["A", "B"]);
        assert_eq!(dialogs[0].lines[1].text, "你好吗");
        assert_eq!(dialogs[1].lines[0].speaker, DEFAULT_SPEAKER);
        assert_eq!(dialogs[1].lines[0].text, "我很好");
    }

    #[test]
    fn speakers_keep_first_appearance_order() {
        let dialogs = parse_dialogs("王: 一\n李: 二\n王: 三\n张: 四\n");
        assert_eq!(dialogs[0].speakers, vec!["王", "李", "张"]);
    }

    #[test]
    fn dialog_text_forms() {
        let dialogs = parse_dialogs("A: 你好\nB: 再见\n");
        assert_eq!(dialogs[0].text(), "你好 再见");
        assert_eq!(dialogs[0].continuous_text(), "你好再见");
    }

    #[test]
    fn only_first_colon_separates_speaker() {
        let line = split_speaker("A: 时间: 三点");
        assert_eq!(line.speaker, "A");
        assert_eq!(line.text, "时间: 三点");
    }

    // -- words -----------------------------------------------------------------

    #[test]
    fn hsk_gloss_wins_over_cedict() {
        let word: Word = serde_json::from_str(
            r#"{"chinese":"茶","hsk":[{"hsk_en":"tea"},{"hsk_en":"tea leaves"}],"cedict":[{"cedict_en":"tea plant"}]}"#,
        )
        .unwrap();
        assert_eq!(word.gloss_text(), "tea or tea leaves");
    }

    #[test]
    fn cedict_gloss_is_fallback() {
        let word: Word =
            serde_json::from_str(r#"{"chinese":"茶","cedict":[{"cedict_en":"tea"}]}"#).unwrap();
        assert_eq!(word.gloss_text(), "tea");
        assert!(word.require_gloss().is_ok());
    }

    #[test]
    fn word_without_gloss_is_incomplete() {
        let word: Word = serde_json::from_str(r#"{"chinese":"茶"}"#).unwrap();
        assert!(matches!(
            word.require_gloss(),
            Err(Error::IncompleteVocabularyEntry(ref w)) if w == "茶"
        ));
    }

    #[test]
    fn tones_sentence_forms() {
        let mut word = Word::default();
        assert_eq!(word.tones_sentence(), None);

        word.tones = vec!["second tone".into()];
        assert_eq!(word.tones_sentence().unwrap(), "The tone is the second tone");

        word.tones = vec!["first tone".into(), "fourth tone".into()];
        assert_eq!(
            word.tones_sentence().unwrap(),
            "The tones are first tone, followed by fourth tone"
        );
    }

    #[test]
    fn example_english_uses_hsk_key() {
        let example: Example =
            serde_json::from_str(r#"{"chinese":"我喝茶","hsk_en":"I drink tea"}"#).unwrap();
        assert_eq!(example.english, "I drink tea");
    }

    // -- files -----------------------------------------------------------------

    #[test]
    fn clozes_load_from_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clozes.json");
        std::fs::write(
            &path,
            r#"[{"chinese":"我喝茶","english":"I drink tea","word":{"chinese":"茶"}}]"#,
        )
        .unwrap();

        let clozes = load_clozes(&path).unwrap();
        assert_eq!(clozes[0].sentence_back, "我喝茶");
        assert_eq!(clozes[0].word.chinese, "茶");
    }

    #[test]
    fn patterns_load_json_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"pattern":"就","sentenceBack":"我就来","summary":["one"]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"pattern":"了"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let patterns = load_patterns(dir.path()).unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].pattern, "了");
        assert_eq!(patterns[1].sentence_back, "我就来");
        assert_eq!(patterns[1].summary, vec!["one"]);
    }

    #[test]
    fn malformed_json_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_words(&path).unwrap_err();
        assert!(matches!(err, Error::Input(ref m) if m.contains("words.json")));
    }
}
