use std::io::{self, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::cli::Command;
use crate::datetime::{days_of_week, week_start};
use crate::planner::PlannerStore;
use crate::record::{Category, Priority, RecordId};
use crate::render::{Renderer, sort_for_display};
use crate::session::Session;

#[instrument(skip(session, renderer, command), fields(command = command.name()))]
pub fn dispatch(
    session: &mut Session,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()> {
    debug!(today = %session.today, ?command, "dispatching command");

    match command {
        Command::Add {
            title,
            category,
            priority,
            due,
        } => cmd_add(session, title, category, priority, due),
        Command::Week => cmd_week(session, renderer),
        Command::Day { date } => cmd_day(session, renderer, date.as_deref()),
        Command::Habits => cmd_category(session, renderer, Category::Habit),
        Command::Goals => cmd_goals(session, renderer),
        Command::Notes => cmd_category(session, renderer, Category::Note),
        Command::Backlog => cmd_backlog(session, renderer),
        Command::Toggle { id } => cmd_toggle(session, &id),
        Command::Delete { id } => cmd_delete(session, &id),
        Command::Shelve { id } => cmd_shelve(session, &id),
        Command::Move { id, date } => cmd_move(session, renderer, &id, &date),
        Command::Rollover => cmd_rollover(session, renderer),
        Command::Export => cmd_export(session),
    }
}

/// Exact id, else the unique record whose id starts with `token`.
pub fn resolve_id(planner: &PlannerStore, token: &str) -> anyhow::Result<Option<RecordId>> {
    let token = token.trim();
    if token.is_empty() {
        return Err(anyhow!("record id cannot be empty"));
    }

    let exact = RecordId::from(token);
    if planner.get(&exact).is_some() {
        return Ok(Some(exact));
    }

    let mut matches = planner
        .records()
        .map(|(_, r)| &r.id)
        .filter(|id| id.as_str().starts_with(token));
    let Some(first) = matches.next() else {
        return Ok(None);
    };
    let rest: Vec<&RecordId> = matches.collect();
    if rest.is_empty() {
        return Ok(Some(first.clone()));
    }

    let candidates = std::iter::once(first)
        .chain(rest)
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(anyhow!("ambiguous id prefix '{token}': {candidates}"))
}

#[instrument(skip(session, title))]
fn cmd_add(
    session: &mut Session,
    title: Vec<String>,
    category: Category,
    priority: Option<Priority>,
    due: Option<String>,
) -> anyhow::Result<()> {
    info!("command add");

    let title = title.join(" ");
    let priority = match priority {
        Some(p) => p,
        None => session.cfg.default_priority()?,
    };
    let due_date = match (category, due) {
        (Category::Daily, Some(expr)) => Some(session.parse_date(&expr)?),
        (Category::Daily, None) => Some(session.today),
        (_, Some(_)) => return Err(anyhow!("--due only applies to daily tasks")),
        (_, None) => None,
    };

    let now = session.now();
    let id = session
        .planner
        .add(title, category, priority, due_date, now)?;
    println!("Created {category} {}.", id.short());
    Ok(())
}

#[instrument(skip(session, renderer))]
fn cmd_week(session: &Session, renderer: &Renderer) -> anyhow::Result<()> {
    info!("command week");
    let days = days_of_week(session.today);
    renderer.print_week(&days, session.today, |date| {
        session.planner.tasks_for_date(date)
    })
}

#[instrument(skip(session, renderer))]
fn cmd_day(session: &Session, renderer: &Renderer, date: Option<&str>) -> anyhow::Result<()> {
    info!("command day");
    let date = match date {
        Some(expr) => session.parse_date(expr)?,
        None => session.today,
    };
    let mut tasks = session.planner.tasks_for_date(date);
    sort_for_display(&mut tasks);
    renderer.print_records(
        &format!("Tasks for {}", renderer.date(date)),
        &tasks,
        false,
        "No tasks for this day",
    )
}

#[instrument(skip(session, renderer))]
fn cmd_category(
    session: &Session,
    renderer: &Renderer,
    category: Category,
) -> anyhow::Result<()> {
    info!(%category, "command category listing");
    let records = session.planner.by_category(category);
    let (heading, hint) = match category {
        Category::Daily => ("Daily tasks", "No daily tasks yet."),
        Category::Habit => ("Habits", "No habits yet. Add one with `planner add -c habit`."),
        Category::Goal => ("Goals", "No goals yet. Add one with `planner add -c goal`."),
        Category::Note => ("Notes", "No notes yet. Add one with `planner add -c note`."),
    };
    renderer.print_records(heading, &records, category.is_dated(), hint)
}

#[instrument(skip(session, renderer))]
fn cmd_goals(session: &Session, renderer: &Renderer) -> anyhow::Result<()> {
    cmd_category(session, renderer, Category::Goal)?;
    let (done, total) = session.planner.goal_progress();
    if total > 0 {
        renderer.print_progress(done, total)?;
    }
    Ok(())
}

#[instrument(skip(session, renderer))]
fn cmd_backlog(session: &Session, renderer: &Renderer) -> anyhow::Result<()> {
    info!("command backlog");
    let mut records: Vec<_> = session.planner.backlog().iter().collect();
    sort_for_display(&mut records);
    let heading = if records.is_empty() {
        "Backlog".to_string()
    } else {
        format!("Backlog (total: {} items)", records.len())
    };
    renderer.print_records(&heading, &records, false, "Backlog is empty!")
}

#[instrument(skip(session))]
fn cmd_toggle(session: &mut Session, token: &str) -> anyhow::Result<()> {
    info!("command toggle");
    let Some(id) = resolve_id(&session.planner, token)? else {
        println!("No record matches '{token}'.");
        return Ok(());
    };
    session.planner.toggle_complete(&id)?;
    let state = session
        .planner
        .get(&id)
        .map(|(_, r)| if r.completed { "completed" } else { "open" })
        .unwrap_or("gone");
    println!("Record {} is now {state}.", id.short());
    Ok(())
}

#[instrument(skip(session))]
fn cmd_delete(session: &mut Session, token: &str) -> anyhow::Result<()> {
    info!("command delete");
    let Some(id) = resolve_id(&session.planner, token)? else {
        println!("No record matches '{token}'.");
        return Ok(());
    };
    if session.planner.delete(&id)? {
        println!("Deleted {}.", id.short());
    }
    Ok(())
}

#[instrument(skip(session))]
fn cmd_shelve(session: &mut Session, token: &str) -> anyhow::Result<()> {
    info!("command shelve");
    let Some(id) = resolve_id(&session.planner, token)? else {
        println!("No record matches '{token}'.");
        return Ok(());
    };
    if session.planner.move_to_backlog(&id)? {
        println!("Moved {} to the backlog.", id.short());
    } else {
        println!("Record {} is already in the backlog.", id.short());
    }
    Ok(())
}

#[instrument(skip(session, renderer))]
fn cmd_move(
    session: &mut Session,
    renderer: &Renderer,
    token: &str,
    date: &str,
) -> anyhow::Result<()> {
    info!("command move");
    let new_date = session.parse_date(date)?;
    let Some(id) = resolve_id(&session.planner, token)? else {
        println!("No record matches '{token}'.");
        return Ok(());
    };
    if !session.planner.move_to_date(&id, new_date)? {
        println!("No record matches '{token}'.");
        return Ok(());
    }
    let category = session
        .planner
        .get(&id)
        .map(|(_, r)| r.category)
        .ok_or_else(|| anyhow!("record {id} vanished after move"))?;
    println!("{}", move_summary(renderer, &id, category, new_date));
    Ok(())
}

fn move_summary(
    renderer: &Renderer,
    id: &RecordId,
    category: Category,
    new_date: NaiveDate,
) -> String {
    if category.is_dated() {
        format!("Moved {} to {}.", id.short(), renderer.date(new_date))
    } else {
        format!(
            "Record {} is a {category} and stays undated; date {} ignored.",
            id.short(),
            renderer.date(new_date)
        )
    }
}

#[instrument(skip(session, renderer))]
fn cmd_rollover(session: &mut Session, renderer: &Renderer) -> anyhow::Result<()> {
    info!(week_start = %week_start(session.today), "command rollover");
    let report = session.planner.rollover(session.today)?;
    renderer.print_rollover(&report)
}

#[instrument(skip(session))]
fn cmd_export(session: &Session) -> anyhow::Result<()> {
    info!("command export");
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &session.planner.document())?;
    writeln!(out)?;
    Ok(())
}
