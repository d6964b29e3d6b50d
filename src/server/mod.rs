//! TCP listener and the process-wide session directory

mod listener;
mod registry;

pub use listener::Server;
pub use registry::SessionRegistry;
