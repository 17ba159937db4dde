pub mod error;
pub mod marker;
pub mod probe;
pub mod sqlite;
pub mod tree;
