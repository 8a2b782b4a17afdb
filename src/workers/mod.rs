pub mod refresh_token_sweep;

pub use refresh_token_sweep::{DailySchedule, RefreshTokenSweepWorker};
