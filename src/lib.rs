pub mod config;
pub mod detail;
pub mod dom;
pub mod extract;
pub mod fetch;
pub mod locate;
pub mod model;
pub mod patterns;
pub mod pipeline;
pub mod store;
