use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_date;
use crate::record::{Priority, Record};
use crate::rollover::RolloverReport;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    date_format: String,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            date_format: cfg.date_format(),
        })
    }

    #[cfg(test)]
    pub fn plain(date_format: &str) -> Self {
        Self {
            color: false,
            date_format: date_format.to_string(),
        }
    }

    pub fn date(&self, date: NaiveDate) -> String {
        format_date(date, &self.date_format)
    }

    #[tracing::instrument(skip(self, days, tasks_for))]
    pub fn print_week<'a, F>(
        &self,
        days: &[NaiveDate; 7],
        today: NaiveDate,
        mut tasks_for: F,
    ) -> anyhow::Result<()>
    where
        F: FnMut(NaiveDate) -> Vec<&'a Record>,
    {
        let mut out = io::stdout().lock();
        writeln!(out, "Week of {}", self.date(days[0]))?;

        for (name, date) in DAY_NAMES.iter().zip(days.iter().copied()) {
            writeln!(out)?;
            let marker = if date == today { "*" } else { " " };
            let header = format!("{marker} {name} {}", self.date(date));
            let header = if date == today {
                self.paint(&header, "1")
            } else {
                header
            };
            writeln!(out, "{header}")?;

            let mut tasks = tasks_for(date);
            if tasks.is_empty() {
                writeln!(out, "  No tasks for this day")?;
                continue;
            }
            sort_for_display(&mut tasks);
            write_table(&mut out, self.record_headers(false), self.record_rows(&tasks, false))?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, records))]
    pub fn print_records(
        &self,
        heading: &str,
        records: &[&Record],
        with_due: bool,
        empty_hint: &str,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{heading}")?;
        if records.is_empty() {
            writeln!(out, "  {empty_hint}")?;
            return Ok(());
        }
        write_table(
            &mut out,
            self.record_headers(with_due),
            self.record_rows(records, with_due),
        )?;
        Ok(())
    }

    pub fn print_progress(&self, done: usize, total: usize) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", progress_line(done, total))?;
        Ok(())
    }

    pub fn print_rollover(&self, report: &RolloverReport) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "Rolled {} task(s) to tomorrow, moved {} to the backlog.",
            report.advanced, report.backlogged
        )?;
        Ok(())
    }

    fn record_headers(&self, with_due: bool) -> Vec<String> {
        let mut headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Pri".to_string(),
            "Title".to_string(),
        ];
        if with_due {
            headers.push("Due".to_string());
        }
        headers
    }

    fn record_rows(&self, records: &[&Record], with_due: bool) -> Vec<Vec<String>> {
        records
            .iter()
            .map(|record| {
                let done = if record.completed { "[x]" } else { "[ ]" };
                let priority = self.paint_priority(record.priority);
                let title = if record.completed {
                    self.paint(&record.title, "2")
                } else {
                    record.title.clone()
                };
                let mut row = vec![
                    self.paint(record.id.short(), "33"),
                    done.to_string(),
                    priority,
                    title,
                ];
                if with_due {
                    row.push(record.due_date.map(|d| self.date(d)).unwrap_or_default());
                }
                row
            })
            .collect()
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let code = match priority {
            Priority::High => "31",
            Priority::Medium => "33",
            Priority::Low => "32",
        };
        self.paint(priority.label(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// High priority first; ties keep insertion order.
pub fn sort_for_display(records: &mut [&Record]) {
    records.sort_by_key(|r| r.priority);
}

pub fn progress_line(done: usize, total: usize) -> String {
    if total == 0 {
        return "0/0 completed".to_string();
    }
    let pct = done * 100 / total;
    format!("{done}/{total} completed ({pct}%)")
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    write!(writer, "  ")?;
    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    write!(writer, "  ")?;
    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        write!(writer, "  ")?;
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
