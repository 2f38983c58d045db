//! Domain errors raised by the simulation core.
//!
//! Mirrors the fatal/recoverable split of the numerical error design: the
//! core only ever raises [`SimError`] for conditions that the rest of the
//! crate treats as programming invariants (§7, §4.2, §4.4 of the design
//! notes this crate grounds on). Out-of-range configuration and small rest
//! lengths are recoverable and surfaced as `tracing::warn!` call sites
//! instead, never as a `SimError` variant.

use thiserror::Error;

/// Fatal numerical or structural conditions that abort the advance loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Two deflection points (or an endpoint and a deflection point) occupy
    /// the same position, producing a zero-length sub-edge.
    #[error("segment {segment} has a zero-length sub-edge at deflection index {sub_edge}")]
    CollocatedDeflectionPoint { segment: usize, sub_edge: usize },

    /// A rest-length partition entry reached exactly zero.
    #[error("segment {segment} partition {partition} has zero rest length")]
    ZeroRestLengthPartition { segment: usize, partition: usize },

    /// The sum of a segment's rest-length partitions drifted from its
    /// stored `rest_length` by more than the numerical tolerance.
    #[error(
        "segment {segment} rest-length partitions sum to {actual}, expected {expected} (eps {eps})"
    )]
    RestLengthMismatch {
        segment: usize,
        expected: f64,
        actual: f64,
        eps: f64,
    },

    /// An interior partition (between two deflection points) exceeded
    /// `L_max`; splitting interior partitions is unsupported (§4.4 Pass B).
    #[error(
        "segment {segment} interior partition {partition} exceeds the maximum rest length; \
         splitting interior partitions is unsupported (reduce the step size or deflection count)"
    )]
    UnsupportedInteriorSplit { segment: usize, partition: usize },

    /// A rope was constructed or re-meshed down to zero segments.
    #[error("rope has no segments (deflection-point count {deflection_points})")]
    EmptyRope { deflection_points: usize },
}

pub type SimResult<T> = Result<T, SimError>;
