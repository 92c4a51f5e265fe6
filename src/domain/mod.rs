// Domain layer: board data model and ports (interfaces). No I/O beyond the trait definitions.

pub mod model;
pub mod ports;
