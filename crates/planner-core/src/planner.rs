use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::datastore::{DataStore, Document};
use crate::record::{Category, Priority, Record, RecordId};
use crate::rollover::{RolloverReport, roll_forward};

/// Active and backlog lists, written through to the data store on every
/// mutation.
#[derive(Debug)]
pub struct PlannerStore {
    store: DataStore,
    active: Vec<Record>,
    backlog: Vec<Record>,
}

/// Which list currently holds a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Active,
    Backlog,
}

impl PlannerStore {
    #[instrument(skip(store))]
    pub fn load(store: DataStore) -> anyhow::Result<Self> {
        let Document { tasks, backlog } = store.load()?;
        info!(
            active = tasks.len(),
            backlog = backlog.len(),
            "loaded planner"
        );
        Ok(Self {
            store,
            active: tasks,
            backlog,
        })
    }

    pub fn active(&self) -> &[Record] {
        &self.active
    }

    pub fn backlog(&self) -> &[Record] {
        &self.backlog
    }

    /// Date of the last completed rollover pass, if any.
    pub fn last_rollover(&self) -> anyhow::Result<Option<NaiveDate>> {
        self.store.last_rollover()
    }

    pub fn records(&self) -> impl Iterator<Item = (Placement, &Record)> {
        self.active
            .iter()
            .map(|r| (Placement::Active, r))
            .chain(self.backlog.iter().map(|r| (Placement::Backlog, r)))
    }

    pub fn get(&self, id: &RecordId) -> Option<(Placement, &Record)> {
        self.records().find(|(_, r)| &r.id == id)
    }

    pub fn document(&self) -> Document {
        Document {
            tasks: self.active.clone(),
            backlog: self.backlog.clone(),
        }
    }

    #[instrument(skip(self))]
    pub fn save(&self) -> anyhow::Result<()> {
        self.store.save(&self.document())
    }

    #[instrument(skip(self, title, now))]
    pub fn add(
        &mut self,
        title: String,
        category: Category,
        priority: Priority,
        due_date: Option<NaiveDate>,
        now: NaiveDateTime,
    ) -> anyhow::Result<RecordId> {
        let due_date = if category.is_dated() {
            due_date
        } else {
            if due_date.is_some() {
                warn!(%category, "due date ignored for undated category");
            }
            None
        };

        let mut record = Record::new(title, category, priority, due_date, now);
        while self.get(&record.id).is_some() {
            record.id = RecordId::generate();
        }
        let id = record.id.clone();
        self.active.push(record);
        self.save()?;

        info!(id = %id, %category, "record added");
        Ok(id)
    }

    /// Flips `completed`; returns false when the id is unknown.
    #[instrument(skip(self, id), fields(id = %id))]
    pub fn toggle_complete(&mut self, id: &RecordId) -> anyhow::Result<bool> {
        let Some(record) = self
            .active
            .iter_mut()
            .chain(self.backlog.iter_mut())
            .find(|r| &r.id == id)
        else {
            debug!("toggle: no such record");
            return Ok(false);
        };

        record.completed = !record.completed;
        let completed = record.completed;
        self.save()?;
        info!(completed, "record toggled");
        Ok(true)
    }

    /// Persists even when nothing was removed.
    #[instrument(skip(self, id), fields(id = %id))]
    pub fn delete(&mut self, id: &RecordId) -> anyhow::Result<bool> {
        let before = self.active.len() + self.backlog.len();
        self.active.retain(|r| &r.id != id);
        self.backlog.retain(|r| &r.id != id);
        let removed = before != self.active.len() + self.backlog.len();
        self.save()?;
        info!(removed, "record delete");
        Ok(removed)
    }

    /// Only records in the active list move; backlog and unknown ids are
    /// left alone.
    #[instrument(skip(self, id), fields(id = %id))]
    pub fn move_to_backlog(&mut self, id: &RecordId) -> anyhow::Result<bool> {
        let Some(idx) = self.active.iter().position(|r| &r.id == id) else {
            debug!("move_to_backlog: not in active list");
            return Ok(false);
        };

        let mut record = self.active.remove(idx);
        record.due_date = None;
        self.backlog.push(record);
        self.save()?;
        info!("record moved to backlog");
        Ok(true)
    }

    /// Active records are re-dated in place; backlog records are rehomed to
    /// the end of the active list.
    #[instrument(skip(self, id), fields(id = %id))]
    pub fn move_to_date(&mut self, id: &RecordId, new_date: NaiveDate) -> anyhow::Result<bool> {
        let record = if let Some(idx) = self.backlog.iter().position(|r| &r.id == id) {
            let record = self.backlog.remove(idx);
            self.active.push(record);
            self.active.last_mut()
        } else {
            self.active.iter_mut().find(|r| &r.id == id)
        };

        let Some(record) = record else {
            debug!("move_to_date: no such record");
            return Ok(false);
        };

        if record.category.is_dated() {
            record.due_date = Some(new_date);
        } else {
            warn!(category = %record.category, "due date ignored for undated category");
        }
        self.save()?;
        info!(%new_date, "record moved to date");
        Ok(true)
    }

    /// Daily records due on `date`, in insertion order.
    pub fn tasks_for_date(&self, date: NaiveDate) -> Vec<&Record> {
        self.active.iter().filter(|r| r.is_due_on(date)).collect()
    }

    pub fn by_category(&self, category: Category) -> Vec<&Record> {
        self.active
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    /// `(completed, total)` over active goals.
    pub fn goal_progress(&self) -> (usize, usize) {
        let goals = self.by_category(Category::Goal);
        let done = goals.iter().filter(|g| g.completed).count();
        (done, goals.len())
    }

    #[instrument(skip(self))]
    pub fn rollover(&mut self, today: NaiveDate) -> anyhow::Result<RolloverReport> {
        let report = roll_forward(&mut self.active, &mut self.backlog, today);
        self.save()?;
        self.store.record_rollover(today)?;
        info!(
            advanced = report.advanced,
            backlogged = report.backlogged,
            "rollover complete"
        );
        Ok(report)
    }
}
