pub mod filters;
pub mod message;
pub mod session;
pub mod supervisor;
