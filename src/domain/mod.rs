// Domain layer: core models and ports (interfaces). Provider SDKs stay in adapters.

pub mod model;
pub mod ports;
