mod dispatcher;
mod scheduler;

pub use dispatcher::{CycleReport, run_cycle, run_cycle_until};
pub use scheduler::{ReminderScheduler, SchedulerState};
