pub mod allocation;
pub mod resolver;
pub mod scenario;
