//! # Artifact and workload traits.
//!
//! ## Ownership
//! An artifact is always owned by exactly one place: a worker's stack, the
//! [`ArtifactPool`](crate::ArtifactPool), or nobody (destroyed). Every
//! transfer is a move, so pushing the same artifact twice or touching it after
//! [`Artifact::dispose`] does not compile.
//!
//! ## Dispose vs. abandon
//! ```text
//! artifact.dispose()   explicit release (the "well-behaved caller" path)
//! drop(artifact)       abandonment; only Drop reclaims it (the finalizer path)
//! ```
//! Workers use both on purpose to stress the two reclamation paths.

use rand::rngs::StdRng;

use crate::error::OperationError;
use crate::workload::{Format, Invocation};

/// Owned, disposable resource flowing between workers and the pool.
pub trait Artifact: Send + Sized + 'static {
    /// Returns an independent copy of this artifact.
    fn duplicate(&self) -> Self;

    /// Explicitly releases the artifact.
    ///
    /// The default implementation just drops it; implementors with a
    /// distinguishable release path override this.
    fn dispose(self) {
        drop(self);
    }
}

/// Opaque operation capability consumed by workers.
///
/// Called concurrently from every worker thread. Calls may be slow, may block,
/// and may fail; none of that is allowed to affect other workers.
pub trait Workload: Send + Sync + 'static {
    /// Artifact type produced and consumed by this workload.
    type Artifact: Artifact;

    /// Creates a fresh artifact of the given size and format, filled with a constant.
    fn create(
        &self,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<Self::Artifact, OperationError>;

    /// Applies one operation to `input`, consuming it.
    ///
    /// Returns the output artifact, `None` if the operation yields nothing, or
    /// an error. On error the input is gone: the implementation either
    /// disposed or abandoned it.
    fn apply(
        &self,
        call: Invocation,
        input: Self::Artifact,
        rng: &mut StdRng,
    ) -> Result<Option<Self::Artifact>, OperationError>;
}
