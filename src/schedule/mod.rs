pub mod eastern;
pub mod espn;
pub mod provider;

pub use espn::EspnScoreboard;
pub use provider::ScheduleProvider;
