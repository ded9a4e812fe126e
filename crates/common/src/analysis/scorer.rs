//! Completeness/favorability score

use super::fields::{is_specified, ContractFields};
use serde::{Deserialize, Serialize};

/// Score weights. The result is always clamped to 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    #[serde(default = "default_base")]
    pub base: i32,

    /// Added per field that is not the sentinel
    #[serde(default = "default_field_increment")]
    pub field_increment: u32,

    /// Payment terms mention "net 30"
    #[serde(default = "default_bonus")]
    pub net_30_bonus: u32,

    /// Arbitration field mentions arbitration
    #[serde(default = "default_bonus")]
    pub arbitration_bonus: u32,

    /// Confidentiality clause longer than `confidentiality_min_len`
    #[serde(default = "default_bonus")]
    pub confidentiality_bonus: u32,

    #[serde(default = "default_confidentiality_min_len")]
    pub confidentiality_min_len: usize,
}

fn default_base() -> i32 { 70 }
fn default_field_increment() -> u32 { 3 }
fn default_bonus() -> u32 { 5 }
fn default_confidentiality_min_len() -> usize { 50 }

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base: default_base(),
            field_increment: default_field_increment(),
            net_30_bonus: default_bonus(),
            arbitration_bonus: default_bonus(),
            confidentiality_bonus: default_bonus(),
            confidentiality_min_len: default_confidentiality_min_len(),
        }
    }
}

impl ScoringPolicy {
    pub fn score(&self, fields: &ContractFields) -> u8 {
        let mut score = i64::from(self.base);

        score += fields.specified_count() as i64 * i64::from(self.field_increment);

        if fields.payment_terms.to_lowercase().contains("net 30") {
            score += i64::from(self.net_30_bonus);
        }
        if fields.arbitration.to_lowercase().contains("arbitration") {
            score += i64::from(self.arbitration_bonus);
        }
        if is_specified(&fields.confidentiality_clause)
            && fields.confidentiality_clause.chars().count() > self.confidentiality_min_len
        {
            score += i64::from(self.confidentiality_bonus);
        }

        score.clamp(0, 100) as u8
    }
}
