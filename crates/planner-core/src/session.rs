use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::config::Config;
use crate::datetime::{now_in, parse_date_expr, resolve_timezone, today_in};
use crate::planner::PlannerStore;
use crate::rollover::RolloverReport;

/// Everything one invocation needs: resolved config, the loaded planner and
/// the calendar day it runs on.
#[derive(Debug)]
pub struct Session {
    pub cfg: Config,
    pub planner: PlannerStore,
    pub today: NaiveDate,
    timezone: Option<Tz>,
}

impl Session {
    #[tracing::instrument(skip(cfg, planner))]
    pub fn new(
        cfg: Config,
        planner: PlannerStore,
        today_override: Option<NaiveDate>,
    ) -> anyhow::Result<Self> {
        let timezone = resolve_timezone(cfg.get("timezone").as_deref())?;
        let today = today_override.unwrap_or_else(|| today_in(timezone.as_ref()));
        debug!(%today, pinned = today_override.is_some(), "session day resolved");
        Ok(Self {
            cfg,
            planner,
            today,
            timezone,
        })
    }

    /// Runs the start-of-session rollover when `rollover.auto` is on and no
    /// pass has run yet on `today`.
    #[tracing::instrument(skip(self))]
    pub fn start(&mut self) -> anyhow::Result<Option<RolloverReport>> {
        if !self.cfg.rollover_auto() {
            debug!("automatic rollover disabled");
            return Ok(None);
        }
        if self.planner.last_rollover()? == Some(self.today) {
            debug!(today = %self.today, "rollover already ran today");
            return Ok(None);
        }
        let report = self.planner.rollover(self.today)?;
        info!(?report, "session start rollover");
        Ok(Some(report))
    }

    /// Creation timestamp; keeps the pinned day when `--today` is used.
    pub fn now(&self) -> NaiveDateTime {
        let now = now_in(self.timezone.as_ref());
        if now.date() == self.today {
            now
        } else {
            self.today.and_time(now.time())
        }
    }

    pub fn parse_date(&self, expr: &str) -> anyhow::Result<NaiveDate> {
        parse_date_expr(expr, self.today)
    }
}
