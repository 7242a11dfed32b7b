// Domain layer: models and ports (interfaces) shared by core, adapters and app.

pub mod model;
pub mod ports;
