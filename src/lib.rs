pub mod matching;
pub mod models;
pub mod resolution;
pub mod sources;
pub mod utils;
