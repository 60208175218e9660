pub mod model;
pub mod registry;
pub mod rules;
pub mod session;
pub mod snapshot;
