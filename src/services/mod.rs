pub mod attendance;
pub mod leave;
pub mod rules;
pub mod scheduler;
pub mod stats;
pub mod work_calendar;

pub use attendance::{AttendanceService, AttendanceUnits};
pub use leave::LeaveService;
pub use scheduler::LeaveScheduler;
pub use stats::StatsService;
pub use work_calendar::WorkCalendarService;

use crate::error::AppError;

/// Admin mutations must say why they happened.
pub fn require_reason(reason: &str) -> Result<String, AppError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation_with_details(
            "reason is required",
            serde_json::json!({ "reason": "must not be empty" }),
        ));
    }
    Ok(trimmed.to_string())
}
