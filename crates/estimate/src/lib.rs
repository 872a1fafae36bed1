//! `inciscope-estimate`: concentration reconstruction for declared ingredient lists.
//!
//! Pure engine crate: receives a pre-loaded formula context and an ordered
//! declaration, returns one percentage per declared position.
//! No CLI or IO dependencies.

pub mod anchor;
pub mod config;
pub mod engine;
pub mod error;
pub mod interpolate;
pub mod model;
pub mod normalize;
pub mod redistribute;
pub mod resolver;
pub mod search;
pub mod summary;
pub mod zone;

pub use config::FormulaContext;
pub use engine::{reconstruct, run};
pub use error::EstimateError;
pub use model::{EstimateRequest, KnownPercentage, PercentSource, Reconstruction, SlotEstimate};
pub use resolver::{CatalogResolver, IdentityResolver, Resolution};
