//! Week-boundary maintenance for daily records.
//!
//! An open daily record due today moves to tomorrow. An open daily record
//! due earlier this week moves to the backlog with its date cleared. Both
//! checks read the date as it was before the pass touched the record, so a
//! record advanced to tomorrow is never swept in the same pass.

use chrono::{Duration, NaiveDate};
use tracing::{debug, trace};

use crate::datetime::week_start;
use crate::record::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolloverReport {
    pub advanced: usize,
    pub backlogged: usize,
}

#[tracing::instrument(skip(active, backlog))]
pub fn roll_forward(
    active: &mut Vec<Record>,
    backlog: &mut Vec<Record>,
    today: NaiveDate,
) -> RolloverReport {
    let monday = week_start(today);
    let tomorrow = today + Duration::days(1);
    let mut report = RolloverReport::default();
    let mut kept = Vec::with_capacity(active.len());

    for mut record in active.drain(..) {
        let due = match record.due_date {
            Some(due) if record.category.is_dated() && !record.completed => due,
            _ => {
                kept.push(record);
                continue;
            }
        };

        if due == today {
            trace!(id = %record.id, %tomorrow, "advancing open task");
            record.due_date = Some(tomorrow);
            report.advanced += 1;
        }

        if due < today && due >= monday {
            trace!(id = %record.id, %due, "sweeping task into backlog");
            record.due_date = None;
            backlog.push(record);
            report.backlogged += 1;
            continue;
        }

        kept.push(record);
    }

    *active = kept;
    debug!(?report, %monday, "rollover pass finished");
    report
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{RolloverReport, roll_forward};
    use crate::record::{Category, Priority, Record};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn record(title: &str, category: Category, due: Option<NaiveDate>) -> Record {
        let created = ymd(2024, 6, 1).and_hms_opt(8, 0, 0).expect("valid time");
        Record::new(title.to_string(), category, Priority::Medium, due, created)
    }

    #[test]
    fn open_task_due_today_moves_to_tomorrow() {
        let mut active = vec![record("Write report", Category::Daily, Some(ymd(2024, 6, 12)))];
        let mut backlog = vec![];

        let report = roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));

        assert_eq!(report, RolloverReport { advanced: 1, backlogged: 0 });
        assert_eq!(active[0].due_date, Some(ymd(2024, 6, 13)));
        assert!(backlog.is_empty());
    }

    #[test]
    fn earlier_this_week_goes_to_backlog_undated() {
        let mut active = vec![record("Call bank", Category::Daily, Some(ymd(2024, 6, 11)))];
        let mut backlog = vec![];

        let report = roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));

        assert_eq!(report.backlogged, 1);
        assert!(active.is_empty());
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].due_date, None);
        assert_eq!(backlog[0].title, "Call bank");
    }

    #[test]
    fn completed_and_future_tasks_are_untouched() {
        let mut done = record("Done already", Category::Daily, Some(ymd(2024, 6, 11)));
        done.completed = true;
        let future = record("Later", Category::Daily, Some(ymd(2024, 6, 14)));
        let mut active = vec![done.clone(), future.clone()];
        let mut backlog = vec![];

        let report = roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));

        assert_eq!(report, RolloverReport::default());
        assert_eq!(active, vec![done, future]);
    }

    #[test]
    fn tasks_from_previous_weeks_stay_put() {
        let stale = record("Old", Category::Daily, Some(ymd(2024, 6, 7)));
        let mut active = vec![stale.clone()];
        let mut backlog = vec![];

        roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));

        assert_eq!(active, vec![stale]);
        assert!(backlog.is_empty());
    }

    #[test]
    fn undated_categories_are_never_touched() {
        let habit = record("Meditate", Category::Habit, None);
        let goal = record("Read a book", Category::Goal, None);
        let note = record("Wifi password on fridge", Category::Note, None);
        let mut active = vec![habit.clone(), goal.clone(), note.clone()];
        let mut backlog = vec![];

        roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));

        assert_eq!(active, vec![habit, goal, note]);
        assert!(backlog.is_empty());
    }

    #[test]
    fn second_pass_same_day_is_stable() {
        let mut active = vec![record("Gym", Category::Daily, Some(ymd(2024, 6, 12)))];
        let mut backlog = vec![];

        roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));
        let second = roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));

        // The second pass sees 06-13, which is neither today nor past.
        assert_eq!(second, RolloverReport::default());
        assert_eq!(active[0].due_date, Some(ymd(2024, 6, 13)));
    }

    #[test]
    fn monday_boundary_keeps_order_of_survivors() {
        let a = record("a", Category::Daily, Some(ymd(2024, 6, 10)));
        let b = record("b", Category::Habit, None);
        let c = record("c", Category::Daily, Some(ymd(2024, 6, 16)));
        let mut active = vec![a, b.clone(), c.clone()];
        let mut backlog = vec![];

        let report = roll_forward(&mut active, &mut backlog, ymd(2024, 6, 12));

        assert_eq!(report.backlogged, 1);
        assert_eq!(active, vec![b, c]);
        assert_eq!(backlog[0].title, "a");
    }
}
