pub mod cancel;
pub mod constants;
pub mod db_connect;
pub mod env;
pub mod poll;
pub mod progress_bars;
pub mod resolver_config;
