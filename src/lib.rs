pub mod error;
pub mod report;
pub mod schema;
pub mod search;
pub mod settings;
pub mod shell;
pub mod store;
