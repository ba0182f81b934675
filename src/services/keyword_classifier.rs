//! Keyword-based task classifier.

use crate::domain::models::{Classification, Complexity, TaskType};
use crate::domain::ports::TaskClassifier;

const TYPE_KEYWORDS: &[(TaskType, &[&str])] = &[
    (
        TaskType::Development,
        &["code", "build", "implement", "program", "script", "develop", "app", "api", "function", "deploy"],
    ),
    (
        TaskType::Research,
        &["research", "search", "find", "investigate", "explore", "compare", "survey", "look up"],
    ),
    (
        TaskType::Analysis,
        &["analyze", "analyse", "analysis", "data", "statistics", "trend", "evaluate", "metrics"],
    ),
    (
        TaskType::Writing,
        &["write", "draft", "article", "essay", "report", "blog", "summarize", "presentation"],
    ),
];

const COMPLEX_MARKERS: &[&str] = &["comprehensive", "detailed", "in-depth", "multiple", "complete", "end-to-end"];
const SIMPLE_MARKERS: &[&str] = &["simple", "quick", "brief", "short", "single"];

/// Classifies descriptions by counting keyword hits per type.
///
/// Ties go to the type listed first; no hits yields `general`. Complexity
/// comes from marker words, falling back to description length.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn task_type(text: &str) -> TaskType {
        let mut best = (TaskType::General, 0);
        for (task_type, keywords) in TYPE_KEYWORDS {
            let hits = keywords.iter().filter(|k| text.contains(*k)).count();
            if hits > best.1 {
                best = (*task_type, hits);
            }
        }
        best.0
    }

    fn complexity(text: &str) -> Complexity {
        if COMPLEX_MARKERS.iter().any(|m| text.contains(m)) {
            return Complexity::Complex;
        }
        if SIMPLE_MARKERS.iter().any(|m| text.contains(m)) {
            return Complexity::Simple;
        }
        match text.split_whitespace().count() {
            0..=6 => Complexity::Simple,
            7..=25 => Complexity::Medium,
            _ => Complexity::Complex,
        }
    }
}

impl TaskClassifier for KeywordClassifier {
    fn classify(&self, description: &str) -> Classification {
        let text = description.to_lowercase();
        Classification::new(Self::task_type(&text), Self::complexity(&text))
    }
}
