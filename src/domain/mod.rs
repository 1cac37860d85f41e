// Domain layer: core models and ports (interfaces) shared by the server, the client and the adapters.

pub mod model;
pub mod ports;
