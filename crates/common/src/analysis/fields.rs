//! The fixed-shape contract record

use serde::{Deserialize, Serialize};

/// Value stored for any field the extractor could not find
pub const NOT_SPECIFIED: &str = "Not specified";

/// The eight clause summaries tracked per contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractField {
    EffectiveDate,
    TerminationClause,
    PaymentTerms,
    LatePenalty,
    DeliveryTimeline,
    GoverningLaw,
    ConfidentialityClause,
    Arbitration,
}

impl ContractField {
    /// Declaration order, also the storage column order
    pub const ALL: [ContractField; 8] = [
        ContractField::EffectiveDate,
        ContractField::TerminationClause,
        ContractField::PaymentTerms,
        ContractField::LatePenalty,
        ContractField::DeliveryTimeline,
        ContractField::GoverningLaw,
        ContractField::ConfidentialityClause,
        ContractField::Arbitration,
    ];

    /// Row order of the comparison table
    pub const COMPARISON_ORDER: [ContractField; 8] = [
        ContractField::EffectiveDate,
        ContractField::PaymentTerms,
        ContractField::LatePenalty,
        ContractField::TerminationClause,
        ContractField::ConfidentialityClause,
        ContractField::Arbitration,
        ContractField::DeliveryTimeline,
        ContractField::GoverningLaw,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ContractField::EffectiveDate => "effective_date",
            ContractField::TerminationClause => "termination_clause",
            ContractField::PaymentTerms => "payment_terms",
            ContractField::LatePenalty => "late_penalty",
            ContractField::DeliveryTimeline => "delivery_timeline",
            ContractField::GoverningLaw => "governing_law",
            ContractField::ConfidentialityClause => "confidentiality_clause",
            ContractField::Arbitration => "arbitration",
        }
    }

    /// Human label, also the key phrase recognised in "Key: Value" exports
    pub fn label(&self) -> &'static str {
        match self {
            ContractField::EffectiveDate => "Effective Date",
            ContractField::TerminationClause => "Termination Clause",
            ContractField::PaymentTerms => "Payment Terms",
            ContractField::LatePenalty => "Late Penalty",
            ContractField::DeliveryTimeline => "Delivery Timeline",
            ContractField::GoverningLaw => "Governing Law",
            ContractField::ConfidentialityClause => "Confidentiality Clause",
            ContractField::Arbitration => "Arbitration",
        }
    }

    /// Match an already lower-cased, trimmed key phrase exactly
    pub fn from_key_phrase(phrase: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.label().to_lowercase() == phrase)
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Whether a field value carries extracted content
pub fn is_specified(value: &str) -> bool {
    !value.is_empty() && value != NOT_SPECIFIED
}

/// Eight extracted fields; every value is either source text or [`NOT_SPECIFIED`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFields {
    pub effective_date: String,
    pub termination_clause: String,
    pub payment_terms: String,
    pub late_penalty: String,
    pub delivery_timeline: String,
    pub governing_law: String,
    pub confidentiality_clause: String,
    pub arbitration: String,
}

impl ContractFields {
    /// All eight fields set to the sentinel
    pub fn unspecified() -> Self {
        Self {
            effective_date: NOT_SPECIFIED.to_string(),
            termination_clause: NOT_SPECIFIED.to_string(),
            payment_terms: NOT_SPECIFIED.to_string(),
            late_penalty: NOT_SPECIFIED.to_string(),
            delivery_timeline: NOT_SPECIFIED.to_string(),
            governing_law: NOT_SPECIFIED.to_string(),
            confidentiality_clause: NOT_SPECIFIED.to_string(),
            arbitration: NOT_SPECIFIED.to_string(),
        }
    }

    pub fn get(&self, field: ContractField) -> &str {
        match field {
            ContractField::EffectiveDate => &self.effective_date,
            ContractField::TerminationClause => &self.termination_clause,
            ContractField::PaymentTerms => &self.payment_terms,
            ContractField::LatePenalty => &self.late_penalty,
            ContractField::DeliveryTimeline => &self.delivery_timeline,
            ContractField::GoverningLaw => &self.governing_law,
            ContractField::ConfidentialityClause => &self.confidentiality_clause,
            ContractField::Arbitration => &self.arbitration,
        }
    }

    /// Set a field; empty values collapse to the sentinel
    pub fn set(&mut self, field: ContractField, value: impl Into<String>) {
        let mut value = value.into();
        if value.is_empty() {
            value = NOT_SPECIFIED.to_string();
        }
        let slot = match field {
            ContractField::EffectiveDate => &mut self.effective_date,
            ContractField::TerminationClause => &mut self.termination_clause,
            ContractField::PaymentTerms => &mut self.payment_terms,
            ContractField::LatePenalty => &mut self.late_penalty,
            ContractField::DeliveryTimeline => &mut self.delivery_timeline,
            ContractField::GoverningLaw => &mut self.governing_law,
            ContractField::ConfidentialityClause => &mut self.confidentiality_clause,
            ContractField::Arbitration => &mut self.arbitration,
        };
        *slot = value;
    }

    /// Fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (ContractField, &str)> + '_ {
        ContractField::ALL.into_iter().map(move |field| (field, self.get(field)))
    }

    pub fn specified_count(&self) -> usize {
        self.iter().filter(|(_, value)| is_specified(value)).count()
    }
}

impl Default for ContractFields {
    fn default() -> Self {
        Self::unspecified()
    }
}

/// Result of line-oriented parsing: fields absent from the input stay unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    values: [Option<String>; 8],
}

impl ParsedFields {
    pub fn get(&self, field: ContractField) -> Option<&str> {
        self.values[field.index()].as_deref()
    }

    pub fn set(&mut self, field: ContractField, value: impl Into<String>) {
        self.values[field.index()] = Some(value.into());
    }

    pub fn found_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.found_count() == 0
    }

    /// Apply the sentinel to every unset field
    pub fn into_fields(self) -> ContractFields {
        self.into_fields_or(&ContractFields::unspecified())
    }

    /// Take unset fields from `fallback`
    pub fn into_fields_or(self, fallback: &ContractFields) -> ContractFields {
        let mut fields = fallback.clone();
        for (field, value) in ContractField::ALL.into_iter().zip(self.values) {
            if let Some(value) = value {
                fields.set(field, value);
            }
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unspecified_has_eight_sentinels() {
        let fields = ContractFields::unspecified();
        assert_eq!(fields.iter().count(), 8);
        assert!(fields.iter().all(|(_, v)| v == NOT_SPECIFIED));
        assert_eq!(fields.specified_count(), 0);
    }

    #[test]
    fn test_key_phrase_lookup_is_exact() {
        assert_eq!(
            ContractField::from_key_phrase("payment terms"),
            Some(ContractField::PaymentTerms)
        );
        assert_eq!(ContractField::from_key_phrase("payment"), None);
        assert_eq!(ContractField::from_key_phrase("payment terms and fees"), None);
    }

    #[test]
    fn test_set_empty_collapses_to_sentinel() {
        let mut fields = ContractFields::unspecified();
        fields.set(ContractField::GoverningLaw, "");
        assert_eq!(fields.governing_law, NOT_SPECIFIED);
        fields.set(ContractField::GoverningLaw, "State of New York");
        assert_eq!(fields.get(ContractField::GoverningLaw), "State of New York");
    }

    #[test]
    fn test_parsed_fields_fallback() {
        let mut parsed = ParsedFields::default();
        parsed.set(ContractField::Arbitration, "AAA rules");

        let mut fallback = ContractFields::unspecified();
        fallback.set(ContractField::PaymentTerms, "payment terms are net 45");

        let merged = parsed.into_fields_or(&fallback);
        assert_eq!(merged.arbitration, "AAA rules");
        assert_eq!(merged.payment_terms, "payment terms are net 45");
        assert_eq!(merged.effective_date, NOT_SPECIFIED);
    }

    #[test]
    fn test_comparison_order_covers_all_fields() {
        for field in ContractField::ALL {
            assert!(ContractField::COMPARISON_ORDER.contains(&field));
        }
    }
}
