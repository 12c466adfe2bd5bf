use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::handle::LanguageId;

/// A run of uniformly formatted characters inside a [`RichText`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRun {
    /// Character offset one past the end of this run.
    pub limit: usize,
    /// Writing system of the run.
    pub language: LanguageId,
    /// Named character style, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl TextRun {
    pub fn new(limit: usize, language: LanguageId) -> Self {
        Self {
            limit,
            language,
            style: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Text carrying per-run writing system and style.
///
/// Runs partition the text by character offset: limits are strictly
/// increasing and the last limit equals the character count. An empty text
/// still carries one zero-length run so that it remembers its language.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RichTextParts")]
pub struct RichText {
    text: String,
    runs: Vec<TextRun>,
}

#[derive(Deserialize)]
struct RichTextParts {
    text: String,
    runs: Vec<TextRun>,
}

impl TryFrom<RichTextParts> for RichText {
    type Error = TypeError;

    fn try_from(parts: RichTextParts) -> Result<Self, Self::Error> {
        Self::from_runs(parts.text, parts.runs)
    }
}

impl RichText {
    /// Single-run text in one language.
    pub fn plain(text: impl Into<String>, language: LanguageId) -> Self {
        let text = text.into();
        let limit = text.chars().count();
        Self {
            text,
            runs: vec![TextRun::new(limit, language)],
        }
    }

    /// Empty text in the given language.
    pub fn empty(language: LanguageId) -> Self {
        Self::plain(String::new(), language)
    }

    /// Build from text and explicit runs.
    pub fn from_runs(text: impl Into<String>, runs: Vec<TextRun>) -> Result<Self, TypeError> {
        let text = text.into();
        let len = text.chars().count();
        if runs.is_empty() {
            return Err(TypeError::InvalidRuns("at least one run is required".into()));
        }
        let mut prev = 0usize;
        for (i, run) in runs.iter().enumerate() {
            if run.limit < prev || (i > 0 && run.limit == prev) {
                return Err(TypeError::InvalidRuns(format!(
                    "run {i} limit {} does not advance past {prev}",
                    run.limit
                )));
            }
            prev = run.limit;
        }
        if prev != len {
            return Err(TypeError::InvalidRuns(format!(
                "last run ends at {prev}, text has {len} characters"
            )));
        }
        Ok(Self { text, runs })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Writing system of the first run.
    pub fn language(&self) -> LanguageId {
        self.runs[0].language
    }

    /// Run covering the given character offset.
    pub fn run_at(&self, offset: usize) -> Option<&TextRun> {
        self.runs.iter().find(|run| offset < run.limit)
    }
}

impl std::fmt::Display for RichText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EN: LanguageId = LanguageId::new(1);
    const FR: LanguageId = LanguageId::new(2);

    #[test]
    fn plain_has_single_run() {
        let text = RichText::plain("héllo", EN);
        assert_eq!(text.len(), 5);
        assert_eq!(text.runs().len(), 1);
        assert_eq!(text.runs()[0].limit, 5);
        assert_eq!(text.language(), EN);
    }

    #[test]
    fn empty_remembers_language() {
        let text = RichText::empty(FR);
        assert!(text.is_empty());
        assert_eq!(text.language(), FR);
        assert_eq!(text.run_at(0), None);
    }

    #[test]
    fn from_runs_accepts_partition() {
        let text = RichText::from_runs(
            "bonjour hello",
            vec![TextRun::new(8, FR), TextRun::new(13, EN).with_style("Emphasis")],
        )
        .unwrap();
        assert_eq!(text.run_at(3).unwrap().language, FR);
        assert_eq!(text.run_at(9).unwrap().style.as_deref(), Some("Emphasis"));
    }

    #[test]
    fn from_runs_rejects_short_cover() {
        let err = RichText::from_runs("abc", vec![TextRun::new(2, EN)]).unwrap_err();
        assert!(matches!(err, TypeError::InvalidRuns(_)));
    }

    #[test]
    fn from_runs_rejects_non_advancing_runs() {
        let err = RichText::from_runs("abc", vec![TextRun::new(2, EN), TextRun::new(2, FR)])
            .unwrap_err();
        assert!(matches!(err, TypeError::InvalidRuns(_)));
    }

    #[test]
    fn from_runs_rejects_no_runs() {
        assert!(RichText::from_runs("", vec![]).is_err());
    }

    #[test]
    fn deserialize_validates_runs() {
        let json = r#"{"text":"abc","runs":[]}"#;
        assert!(serde_json::from_str::<RichText>(json).is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let text = RichText::plain("abc", EN);
        let json = serde_json::to_string(&text).unwrap();
        let parsed: RichText = serde_json::from_str(&json).unwrap();
        assert_eq!(text, parsed);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn split_points_partition_text(
                text in "\\PC{1,40}",
                cuts in proptest::collection::btree_set(1usize..40, 0..5),
            ) {
                let len = text.chars().count();
                let mut limits: Vec<usize> = cuts.into_iter().filter(|c| *c < len).collect();
                limits.push(len);
                let runs: Vec<TextRun> = limits
                    .iter()
                    .enumerate()
                    .map(|(i, limit)| TextRun::new(*limit, LanguageId::new(i as i32 + 1)))
                    .collect();
                let rich = RichText::from_runs(text, runs).unwrap();
                prop_assert_eq!(rich.len(), len);
                for offset in 0..len {
                    prop_assert!(rich.run_at(offset).is_some());
                }
                prop_assert!(rich.run_at(len).is_none());
            }
        }
    }
}
