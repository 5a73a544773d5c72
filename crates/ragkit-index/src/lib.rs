//! Vector index backends and the dispatching service.
//!
//! Backends are interchangeable behind the [`VectorStore`] capability set
//! from `ragkit-core`: a flat in-process index persisted as paired JSON
//! artifacts, and a remote managed-service index. The
//! [`service::VectorIndexService`] owns backend selection and the
//! initialized-before-use contract.

use tracing::warn;

pub mod flat;
pub mod remote;
pub mod service;

pub use flat::FlatIndex;
pub use remote::RemoteIndex;
pub use service::VectorIndexService;

/// Zero-pad or truncate `vector` to `dim`, logging when repair was
/// needed. Dimension mismatches are repaired, never rejected.
pub(crate) fn repair_dimension(mut vector: Vec<f32>, dim: usize) -> Vec<f32> {
    if vector.len() != dim {
        warn!(
            expected = dim,
            actual = vector.len(),
            "embedding dimension mismatch, repairing"
        );
        vector.resize(dim, 0.0);
    }
    vector
}
