use chrono::{Datelike, Weekday};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::{clock::Clock, database::repositories::CalendarStore, services::LeaveService};

pub const DAILY: Duration = Duration::from_secs(24 * 60 * 60);

/// Background worker for the daily leave jobs. Every step is idempotent, so drift, restarts or
/// several replicas running it only cost repeated no-ops.
pub struct LeaveScheduler {
    leave: Arc<LeaveService>,
    calendar: Arc<dyn CalendarStore>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl LeaveScheduler {
    pub fn new(
        leave: Arc<LeaveService>,
        calendar: Arc<dyn CalendarStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            leave,
            calendar,
            clock,
            period: DAILY,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Runs the startup pass, then one tick per period until `shutdown` flips to true or its
    /// sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!("Leave scheduler started (period {:?})", self.period);
        self.run_startup().await;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.period) => self.run_tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Leave scheduler stopped");
    }

    pub async fn run_startup(&self) {
        self.grant().await;
        self.deduction().await;
        self.backfill().await;
        self.ensure_year().await;
    }

    pub async fn run_tick(&self) {
        self.ensure_year().await;
        self.grant().await;
        self.deduction().await;
        if self.clock.today().weekday() == Weekday::Mon {
            self.backfill().await;
        }
    }

    async fn ensure_year(&self) {
        let year = self.clock.today().year();
        match self.calendar.ensure_year(year).await {
            Ok(true) => log::info!("Seeded working calendar for {}", year),
            Ok(false) => {}
            Err(err) => log::error!("Calendar seeding for {} failed: {}", year, err),
        }
    }

    async fn grant(&self) {
        if let Err(err) = self.leave.process_current_month_grant().await {
            log::error!("Monthly leave grant failed: {}", err);
        }
    }

    async fn deduction(&self) {
        if let Err(err) = self.leave.process_previous_month_deduction().await {
            log::error!("Prior-month leave deduction failed: {}", err);
        }
    }

    async fn backfill(&self) {
        if let Err(err) = self.leave.backfill_summaries().await {
            log::error!("Leave summary backfill failed: {}", err);
        }
    }
}
