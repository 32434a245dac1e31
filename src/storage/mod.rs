pub mod db;
pub mod error;
pub mod key;
pub mod objects;
pub mod records;
pub(crate) mod schema;
