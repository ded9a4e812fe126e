//! Similarity retrieval of whole-contract context blocks

use crate::db::ContractStore;
use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::metrics::record_context_failure;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// One contract's full text, formatted for the prompt
#[derive(Debug, Clone, Serialize)]
pub struct ContractContext {
    pub document_id: Uuid,
    pub name: String,
    #[serde(skip)]
    pub block: String,
}

impl ContractContext {
    pub fn new(document_id: Uuid, name: &str, text: &str) -> Self {
        Self {
            document_id,
            name: name.to_string(),
            block: format!("Contract {}:\n{}", name, text),
        }
    }
}

/// Finds the contracts whose chunks are nearest to a query
pub struct ContextRetriever {
    store: Arc<dyn ContractStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl ContextRetriever {
    pub fn new(store: Arc<dyn ContractStore>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k: top_k.max(1),
        }
    }

    /// Context blocks for the distinct documents behind the top-K chunks,
    /// in hit order. Failures are logged and yield no context.
    pub async fn retrieve(&self, query: &str, document_ids: Option<&[Uuid]>) -> Vec<ContractContext> {
        match self.try_retrieve(query, document_ids).await {
            Ok(contexts) => contexts,
            Err(e) => {
                warn!(error = %e, "Context retrieval failed, answering without context");
                record_context_failure();
                Vec::new()
            }
        }
    }

    async fn try_retrieve(
        &self,
        query: &str,
        document_ids: Option<&[Uuid]>,
    ) -> Result<Vec<ContractContext>> {
        let embedding = self.embedder.embed(query).await?;
        let filter = document_ids.filter(|ids| !ids.is_empty());
        let hits = self.store.similar_chunks(&embedding, self.top_k, filter).await?;

        let mut seen: Vec<Uuid> = Vec::with_capacity(hits.len());
        for hit in &hits {
            if !seen.contains(&hit.document_id) {
                seen.push(hit.document_id);
            }
        }

        let mut contexts = Vec::with_capacity(seen.len());
        for id in seen {
            if let Some(document) = self.store.find_document(id).await? {
                contexts.push(ContractContext::new(
                    document.id,
                    &document.original_name,
                    document.text(),
                ));
            }
        }

        debug!(hits = hits.len(), documents = contexts.len(), "Context retrieved");
        Ok(contexts)
    }
}

