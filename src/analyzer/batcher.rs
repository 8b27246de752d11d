use crate::models::Criterion;

pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 20;

/// Split criteria into contiguous, order-preserving batches. `single_shot`
/// collapses everything into one batch regardless of the configured size.
pub fn chunk_criteria(criteria: &[Criterion], batch_size: usize, single_shot: bool) -> Vec<Vec<Criterion>> {
    if criteria.is_empty() {
        return Vec::new();
    }

    if single_shot {
        return vec![criteria.to_vec()];
    }

    let size = batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
    criteria.chunks(size).map(<[Criterion]>::to_vec).collect()
}
