//! Cron-style time expressions that fire task run requests into the
//! runtime without the scheduler itself knowing how tasks execute.

mod scheduler;
mod timespec;

pub use scheduler::{ScheduleEntry, Scheduler, SchedulerLifecycleHook};
pub use timespec::TimeSpec;
