//! API handlers module

pub mod chat;
pub mod comparison;
pub mod documents;
pub mod health;
pub mod uploads;

use serde::Deserialize;

/// Optional `?limit=` query shared by the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u64>,
}
