pub mod appliance;
pub mod catalog;
pub mod project;
pub mod site;
pub mod types;

pub use appliance::*;
pub use catalog::*;
pub use project::*;
pub use site::*;
pub use types::*;
