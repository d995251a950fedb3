pub mod config;
pub mod engine;
pub mod game;
pub mod traits;
pub mod util;
