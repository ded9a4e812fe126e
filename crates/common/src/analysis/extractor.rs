//! Field extraction strategies
//!
//! Two shallow heuristics share one output shape:
//! - keyword window: for free-form prose, grabs text around the first anchor keyword
//! - key/value lines: for structured "Key: Value" exports
//!
//! Neither does sentence detection or clause parsing.

use super::fields::{ContractField, ContractFields, ParsedFields};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Characters kept before a keyword hit
pub const WINDOW_LEAD_CHARS: usize = 20;

/// Produces the fixed eight-field record from contract text
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, text: &str) -> ContractFields;
}

/// Anchor keywords for one field, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub field: ContractField,
    pub keywords: &'static [&'static str],
    /// Characters kept from the start of the hit
    pub context_length: usize,
}

pub const DEFAULT_RULES: [FieldRule; 8] = [
    FieldRule {
        field: ContractField::EffectiveDate,
        keywords: &["effective date", "commencement date"],
        context_length: 50,
    },
    FieldRule {
        field: ContractField::TerminationClause,
        keywords: &["termination", "contract end"],
        context_length: 100,
    },
    FieldRule {
        field: ContractField::PaymentTerms,
        keywords: &["payment terms", "payment schedule"],
        context_length: 100,
    },
    FieldRule {
        field: ContractField::LatePenalty,
        keywords: &["late penalty", "late payment", "penalty clause"],
        context_length: 100,
    },
    FieldRule {
        field: ContractField::DeliveryTimeline,
        keywords: &["delivery schedule", "delivery timeline"],
        context_length: 100,
    },
    FieldRule {
        field: ContractField::GoverningLaw,
        keywords: &["governing law", "jurisdiction"],
        context_length: 100,
    },
    FieldRule {
        field: ContractField::ConfidentialityClause,
        keywords: &["confidentiality", "non-disclosure"],
        context_length: 150,
    },
    FieldRule {
        field: ContractField::Arbitration,
        keywords: &["arbitration", "dispute resolution"],
        context_length: 100,
    },
];

/// Which extractor the analyzer runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    KeywordWindow,
    KeyValue,
    /// Key/value lines first, keyword window for whatever they miss
    #[default]
    Auto,
}

impl ExtractionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::KeywordWindow => "keyword_window",
            ExtractionStrategy::KeyValue => "key_value",
            ExtractionStrategy::Auto => "auto",
        }
    }

    pub fn extractor(&self) -> Box<dyn FieldExtractor> {
        match self {
            ExtractionStrategy::KeywordWindow => Box::new(KeywordWindowExtractor::default()),
            ExtractionStrategy::KeyValue => Box::new(KeyValueExtractor),
            ExtractionStrategy::Auto => Box::new(LayeredExtractor::default()),
        }
    }
}

impl From<String> for ExtractionStrategy {
    fn from(s: String) -> Self {
        match s.as_str() {
            "keyword_window" => ExtractionStrategy::KeywordWindow,
            "key_value" => ExtractionStrategy::KeyValue,
            _ => ExtractionStrategy::Auto,
        }
    }
}

// ============================================================================
// Keyword window
// ============================================================================

/// Case-insensitive keyword search with a fixed context window per field
#[derive(Debug, Clone)]
pub struct KeywordWindowExtractor {
    rules: Vec<FieldRule>,
}

impl KeywordWindowExtractor {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    /// Window around the first keyword (in rule order) found in `chars`
    fn window(chars: &[char], folded: &[char], rule: &FieldRule) -> Option<String> {
        let hit = rule.keywords.iter().find_map(|keyword| {
            let needle = fold(keyword);
            find_chars(folded, &needle)
        })?;

        let start = hit.saturating_sub(WINDOW_LEAD_CHARS);
        let end = hit.saturating_add(rule.context_length).min(chars.len());
        if start >= end {
            return None;
        }

        let window: String = chars[start..end].iter().collect();
        let window = window.trim();
        (!window.is_empty()).then(|| window.to_string())
    }
}

impl Default for KeywordWindowExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl FieldExtractor for KeywordWindowExtractor {
    fn extract(&self, text: &str) -> ContractFields {
        let mut fields = ContractFields::unspecified();
        if text.is_empty() {
            return fields;
        }

        let chars: Vec<char> = text.chars().collect();
        let folded = fold(text);

        for rule in &self.rules {
            if let Some(value) = Self::window(&chars, &folded, rule) {
                fields.set(rule.field, value);
            }
        }

        fields
    }
}

/// Lower-case char by char so folded indices line up with the original text
fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) => l,
                _ => c,
            }
        })
        .collect()
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ============================================================================
// Key/value lines
// ============================================================================

/// Parses newline-separated "Key: Value" records
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueExtractor;

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(Contract Document|Contract Number|Party A|Party B)")
            .expect("header pattern is valid")
    })
}

fn key_value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([^:]+):\s*(.+)$").expect("key/value pattern is valid"))
}

impl KeyValueExtractor {
    /// Recognised keys only; later lines overwrite earlier ones
    pub fn parse(&self, text: &str) -> ParsedFields {
        let mut parsed = ParsedFields::default();

        for line in text.split('\n') {
            let line = line.trim();
            if line.is_empty() || header_pattern().is_match(line) {
                continue;
            }

            let Some(caps) = key_value_pattern().captures(line) else {
                continue;
            };
            let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };

            let key = key.as_str().trim().to_lowercase();
            if let Some(field) = ContractField::from_key_phrase(&key) {
                parsed.set(field, value.as_str().trim());
            }
        }

        parsed
    }
}

impl FieldExtractor for KeyValueExtractor {
    fn extract(&self, text: &str) -> ContractFields {
        self.parse(text).into_fields()
    }
}

// ============================================================================
// Layered
// ============================================================================

/// Key/value parse per field, keyword window where no line matched
#[derive(Debug, Clone, Default)]
pub struct LayeredExtractor {
    key_value: KeyValueExtractor,
    keyword: KeywordWindowExtractor,
}

impl FieldExtractor for LayeredExtractor {
    fn extract(&self, text: &str) -> ContractFields {
        let parsed = self.key_value.parse(text);
        if parsed.found_count() == ContractField::ALL.len() {
            return parsed.into_fields();
        }
        let fallback = self.keyword.extract(text);
        parsed.into_fields_or(&fallback)
    }
}
