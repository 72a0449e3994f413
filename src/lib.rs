//! Provider identity and enrollment lookup.
//!
//! Combines the NPPES identity registry and the PECOS enrollment registry
//! with a local SQLite mirror of both, falling back to the mirror whenever
//! a registry stops answering.

pub mod aggregate;
pub mod breaker;
pub mod candidates;
pub mod config;
pub mod constants;
pub mod error;
pub mod merge;
pub mod mirror;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod resolver;

pub use aggregate::ResultAggregate;
pub use config::ResolverConfig;
pub use error::{ResolveError, ResolveResult};
pub use mirror::MirrorStore;
pub use model::{CanonicalRecord, EnrollmentStatus, IdentityRecord, Provenance};
pub use normalize::Query;
pub use resolver::Resolver;
