pub mod database;
pub mod filesystem;
pub mod storage;
