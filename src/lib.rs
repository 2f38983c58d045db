//! Deterministic physics core for simulating a climbing fall: a
//! stretchable rope threaded through deflection points, connecting a
//! belayer to a climber, under gravity and barrier collision.
//!
//! The crate is organised leaf-first, matching the component budget the
//! design is scoped against: [`vector`] and [`body`] are the primitive
//! types; [`barrier`] and [`geometry`] are the collision/rendering
//! helpers; [`segment`] and [`rope`] are the rope model and its
//! per-step/re-meshing logic; [`world`] drives construction and the
//! advance loop; [`snapshot`] is the output format; [`config`] and
//! [`error`] are the external configuration and error contracts.

pub mod barrier;
pub mod body;
pub mod config;
pub mod error;
pub mod geometry;
pub mod rope;
pub mod segment;
pub mod snapshot;
pub mod vector;
pub mod world;

pub use barrier::Barrier;
pub use body::{Body, BodyId, BodyKind};
pub use config::{RawConfig, SimConfig};
pub use error::{SimError, SimResult};
pub use rope::Rope;
pub use segment::{RopeParams, RopeSegment};
pub use snapshot::{BodySnapshot, Color, Snapshot, Visible};
pub use vector::Vector;
pub use world::World;
