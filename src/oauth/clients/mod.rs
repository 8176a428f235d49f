//! OAuth client registry and startup reconciliation.

pub mod registry;

pub use registry::{ClientPersistence, ClientRegistry, reconcile};
