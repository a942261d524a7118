pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod logging;
pub mod scanner;
pub mod source;

pub use config::Config;
pub use db::Database;
pub use error::LibraryError;
pub use library::{check_existence, get_page, ExistenceReport, ItemType, MissingSource};
