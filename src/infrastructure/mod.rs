pub mod collection;
pub mod database;
