pub mod config;
pub mod http;
pub mod hub;
pub mod observability;
pub mod pipeline;
pub mod store;
pub mod validate;

pub use pipeline::Pipeline;
pub use store::Store;
