//! Batch plan construction
//!
//! A plan is the ordered list of chunk operations for one run. Concatenating
//! the chunks in order gives back the queried id list exactly.

use std::num::NonZeroUsize;

use serde::Serialize;

use crate::persona::PersonaId;
use crate::store::UserId;

/// Default number of users re-saved per chunk operation.
pub const DEFAULT_CHUNK_SIZE: usize = 20;

/// One unit of work: a bounded set of user ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkOperation {
    /// Zero-based position in the plan
    pub index: usize,

    pub user_ids: Vec<UserId>,
}

impl ChunkOperation {
    pub fn len(&self) -> usize {
        self.user_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }
}

/// Ordered chunk operations for a single persona resync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    persona_id: PersonaId,
    chunk_size: usize,
    operations: Vec<ChunkOperation>,
}

impl BatchPlan {
    /// Partition `ids` into chunks of at most `chunk_size`, preserving order.
    pub fn build(persona_id: impl Into<PersonaId>, ids: &[UserId], chunk_size: NonZeroUsize) -> Self {
        let operations = ids
            .chunks(chunk_size.get())
            .enumerate()
            .map(|(index, chunk)| ChunkOperation {
                index,
                user_ids: chunk.to_vec(),
            })
            .collect();

        Self {
            persona_id: persona_id.into(),
            chunk_size: chunk_size.get(),
            operations,
        }
    }

    pub fn persona_id(&self) -> &str {
        &self.persona_id
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn operations(&self) -> &[ChunkOperation] {
        &self.operations
    }

    pub fn operation(&self, index: usize) -> Option<&ChunkOperation> {
        self.operations.get(index)
    }

    /// Number of chunk operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of user ids across all chunks.
    pub fn total_users(&self) -> usize {
        self.operations.iter().map(ChunkOperation::len).sum()
    }

    /// All user ids in plan order.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.operations
            .iter()
            .flat_map(|op| op.user_ids.iter().copied())
            .collect()
    }
}
