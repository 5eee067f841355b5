pub mod auth;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;

use sqlx::PgPool;
use std::sync::Arc;

pub use config::Config;
pub use error::AppError;

use clock::Clock;
use database::repositories::{
    AttendanceRepository, CalendarStore, LeaveRepository, LeaveStore, SessionStore,
    UserRepository, UserStore, WorkCalendarRepository,
};
use services::{
    AttendanceService, AttendanceUnits, LeaveScheduler, LeaveService, StatsService,
    WorkCalendarService,
};

/// Storage seams the engines are composed from.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub units: Arc<dyn AttendanceUnits>,
    pub calendar: Arc<dyn CalendarStore>,
    pub leave: Arc<dyn LeaveStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        let attendance = Arc::new(AttendanceRepository::new(pool.clone()));

        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            sessions: attendance.clone(),
            units: attendance,
            calendar: Arc::new(WorkCalendarRepository::new(pool.clone())),
            leave: Arc::new(LeaveRepository::new(pool)),
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub users: Arc<dyn UserStore>,
    pub attendance: AttendanceService,
    pub calendar: WorkCalendarService,
    pub leave: Arc<LeaveService>,
    pub stats: StatsService,
    calendar_store: Arc<dyn CalendarStore>,
}

impl AppState {
    pub fn new(config: Config, clock: Arc<dyn Clock>, stores: Stores) -> Self {
        let leave = Arc::new(LeaveService::new(
            stores.users.clone(),
            stores.leave.clone(),
            stores.units.clone(),
            stores.calendar.clone(),
            clock.clone(),
        ));

        Self {
            attendance: AttendanceService::new(stores.sessions.clone(), clock.clone()),
            calendar: WorkCalendarService::new(stores.calendar.clone(), leave.clone()),
            stats: StatsService::new(stores.sessions, stores.calendar.clone(), clock.clone()),
            users: stores.users,
            calendar_store: stores.calendar,
            leave,
            clock,
            config,
        }
    }

    /// The background leave worker sharing this state's engines.
    pub fn leave_scheduler(&self) -> LeaveScheduler {
        LeaveScheduler::new(
            self.leave.clone(),
            self.calendar_store.clone(),
            self.clock.clone(),
        )
    }
}
