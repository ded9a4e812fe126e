//! Contract analysis
//!
//! Turns extracted contract text into the fixed eight-field record,
//! scores it, and projects stored analyses for side-by-side comparison.

pub mod comparison;
mod extractor;
mod fields;
mod scorer;

pub use extractor::{
    ExtractionStrategy, FieldExtractor, FieldRule, KeyValueExtractor, KeywordWindowExtractor,
    LayeredExtractor, DEFAULT_RULES, WINDOW_LEAD_CHARS,
};
pub use fields::{is_specified, ContractField, ContractFields, ParsedFields, NOT_SPECIFIED};
pub use scorer::ScoringPolicy;

use crate::config::AnalysisConfig;
use serde::{Deserialize, Serialize};

/// Outcome of analysing one document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub fields: ContractFields,
    pub score: u8,
    pub strategy: ExtractionStrategy,
}

/// Extraction followed by scoring, configured once and shared by reference
pub struct ContractAnalyzer {
    strategy: ExtractionStrategy,
    extractor: Box<dyn FieldExtractor>,
    scoring: ScoringPolicy,
}

impl ContractAnalyzer {
    pub fn new(strategy: ExtractionStrategy, scoring: ScoringPolicy) -> Self {
        Self {
            strategy,
            extractor: strategy.extractor(),
            scoring,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.strategy, config.scoring.clone())
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        self.strategy
    }

    pub fn scoring(&self) -> &ScoringPolicy {
        &self.scoring
    }

    /// Extract the eight fields and score them
    pub fn analyze(&self, text: &str) -> Analysis {
        let fields = self.extractor.extract(text);
        let score = self.scoring.score(&fields);

        tracing::debug!(
            strategy = self.strategy.as_str(),
            specified = fields.specified_count(),
            score,
            "Contract analysed"
        );

        Analysis {
            fields,
            score,
            strategy: self.strategy,
        }
    }
}

impl Default for ContractAnalyzer {
    fn default() -> Self {
        Self::new(ExtractionStrategy::default(), ScoringPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_scores_base() {
        let analyzer = ContractAnalyzer::default();
        let analysis = analyzer.analyze("");

        assert_eq!(analysis.fields, ContractFields::unspecified());
        assert_eq!(analysis.score, 70);
    }

    #[test]
    fn test_single_key_value_line() {
        for strategy in [ExtractionStrategy::KeyValue, ExtractionStrategy::Auto] {
            let analyzer = ContractAnalyzer::new(strategy, ScoringPolicy::default());
            let analysis = analyzer.analyze("Payment Terms: Net 30 days");

            assert_eq!(analysis.fields.payment_terms, "Net 30 days");
            assert_eq!(analysis.fields.specified_count(), 1);
            assert!(analysis.score >= 75, "score was {}", analysis.score);
        }
    }

    #[test]
    fn test_keyword_window_on_prose() {
        let analyzer = ContractAnalyzer::new(
            ExtractionStrategy::KeywordWindow,
            ScoringPolicy::default(),
        );
        let text = "This agreement is governed by the laws of Delaware. \
                    Any dispute shall be settled by binding arbitration in Wilmington.";
        let analysis = analyzer.analyze(text);

        assert!(analysis.fields.arbitration.contains("arbitration"));
        assert_eq!(analysis.fields.governing_law, NOT_SPECIFIED);
        // base + one field + arbitration bonus
        assert_eq!(analysis.score, 78);
    }
}
