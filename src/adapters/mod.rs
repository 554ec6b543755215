// Adapters layer: concrete sources and document stores behind the domain ports.

pub mod sources;
pub mod store;
