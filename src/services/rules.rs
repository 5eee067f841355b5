//! Attendance policy: check-in window, half-day credit and worked-minute math.
//!
//! Every function reads times as wall-clock values in the business zone.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A policy time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTime {
    hour: u32,
    minute: u32,
}

impl PolicyTime {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.time())
    }
}

pub const WORK_START: PolicyTime = PolicyTime::new(8, 0);
pub const CHECK_IN_END: PolicyTime = PolicyTime::new(18, 0);
pub const WORK_END_CAP: PolicyTime = PolicyTime::new(19, 0);
pub const WORK_START_CALC: PolicyTime = PolicyTime::new(8, 30);
pub const WORK_END_CALC: PolicyTime = PolicyTime::new(18, 0);
pub const MORNING_CUT_OFF: PolicyTime = PolicyTime::new(9, 30);
pub const AFTERNOON_CUT_OFF: PolicyTime = PolicyTime::new(15, 30);
pub const LUNCH_START: PolicyTime = PolicyTime::new(12, 0);
pub const LUNCH_END: PolicyTime = PolicyTime::new(13, 30);

/// Minutes credited when a session spans the whole paid window.
pub const FULL_DAY_MINUTES: i32 = 480;

pub const FULL_DAY: f64 = 1.0;
pub const HALF_DAY: f64 = 0.5;
pub const NO_CREDIT: f64 = 0.0;

/// Check-ins are accepted from WORK_START through CHECK_IN_END inclusive.
pub fn is_check_in_allowed(now: NaiveDateTime) -> bool {
    let date = now.date();
    now >= WORK_START.on(date) && now <= CHECK_IN_END.on(date)
}

/// Half-day credit for a session. Afternoon credit is only awarded on close.
pub fn day_unit(check_in: NaiveDateTime, check_out: Option<NaiveDateTime>) -> f64 {
    let morning_ok = check_in <= MORNING_CUT_OFF.on(check_in.date());
    let check_in_after_cut_off = check_in > AFTERNOON_CUT_OFF.on(check_in.date());

    let afternoon_ok = match check_out {
        Some(out) => !check_in_after_cut_off && out >= AFTERNOON_CUT_OFF.on(out.date()),
        None => false,
    };

    match (morning_ok, afternoon_ok) {
        (true, true) => FULL_DAY,
        (true, false) | (false, true) => HALF_DAY,
        (false, false) => NO_CREDIT,
    }
}

/// Paid minutes inside [WORK_START_CALC, WORK_END_CALC] minus lunch, truncated to whole minutes.
/// Window and lunch boundaries are taken on the check-in date.
pub fn worked_minutes(check_in: NaiveDateTime, check_out: NaiveDateTime) -> i32 {
    if check_out < check_in {
        return 0;
    }

    let date = check_in.date();
    let start = WORK_START_CALC.on(date);
    let end = WORK_END_CALC.on(date);

    // Sub-minute tolerance on the opening edge
    if check_in <= start + chrono::Duration::minutes(1) && check_out >= end {
        return FULL_DAY_MINUTES;
    }

    let from = check_in.max(start);
    let to = check_out.min(end);
    if to <= from {
        return 0;
    }

    let total = (to - from).num_minutes();
    if total <= 0 {
        return 0;
    }

    let lunch_from = from.max(LUNCH_START.on(date));
    let lunch_to = to.min(LUNCH_END.on(date));
    let lunch = if lunch_to > lunch_from {
        (lunch_to - lunch_from).num_minutes()
    } else {
        0
    };

    (total - lunch).max(0) as i32
}
