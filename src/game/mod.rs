pub mod session;

pub use session::{GameSession, SessionPhase, TapOutcome};
