//! Shared utilities for energy-systems research software.
//!
//! The toolkit ships as a single distribution whose sub-packages expose
//! curated export surfaces (see [`registry`]), plus the helpers the group's
//! analysis pipelines keep re-implementing: layered configuration loading,
//! sample smoothing, batched result streaming, and progress/timing
//! instrumentation.

pub mod config;
/// Distribution, sub-package, and symbol export surfaces.
pub mod registry;
pub mod series;
pub mod stream;
pub mod util;

pub use registry::{Distribution, RegistryError, SubPackage, Symbol, SymbolKind};
