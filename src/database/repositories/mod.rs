pub mod attendance;
pub mod leave;
pub mod user;
pub mod work_calendar;

// Re-export all repositories for easy importing
pub use attendance::{AttendanceRepository, SessionStore};
pub use leave::{LeaveRepository, LeaveStore};
pub use user::{UserRepository, UserStore};
pub use work_calendar::{CalendarStore, WorkCalendarRepository};
