// Domain layer: records, store documents and the ports the pipeline consumes.

pub mod model;
pub mod ports;
