pub mod time;

pub use time::{MockTimeProvider, SystemTimeProvider, TimeProvider};
