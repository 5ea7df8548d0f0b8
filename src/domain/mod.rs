// Domain layer: build models and ports (interfaces).

pub mod model;
pub mod ports;
