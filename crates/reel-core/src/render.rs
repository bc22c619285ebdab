use std::io::{self, IsTerminal, Write};

use anyhow::Context;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::store::{StoreSnapshot, TaskStore};
use crate::task::{RATING_LABELS, Task};

const TITLE: &str = "Movie List";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.color()? && io::stdout().is_terminal();
        Ok(Self { color })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Redraws the whole screen: top bar, then the list.
    pub fn print_screen<W: Write>(&self, out: &mut W, store: &TaskStore) -> anyhow::Result<()> {
        self.print_top_bar(out, store)?;
        self.print_task_table(out, store.tasks())
    }

    pub fn print_top_bar<W: Write>(&self, out: &mut W, store: &TaskStore) -> anyhow::Result<()> {
        let restore = if store.has_archived_tasks() {
            self.paint(&format!("restore ({})", store.archived().len()), "32")
        } else {
            self.paint("restore", "2")
        };

        writeln!(
            out,
            "== {} == {} movie(s) | {}",
            self.paint(TITLE, "1"),
            store.tasks().len(),
            restore
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, tasks), fields(count = tasks.len()))]
    pub fn print_task_table<W: Write>(&self, out: &mut W, tasks: &[Task]) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(out, "(no movies)")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            "Title".to_string(),
            "Runtime. Rating".to_string(),
        ];

        let rows = tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| {
                vec![
                    self.paint(&(idx + 1).to_string(), "33"),
                    task.title.clone(),
                    task.card_detail(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    /// The add/edit form with the values it starts from.
    pub fn print_edit_form<W: Write>(
        &self,
        out: &mut W,
        row: usize,
        task: &Task,
    ) -> anyhow::Result<()> {
        writeln!(out, "editing row {row}")?;
        writeln!(out, "  title    {}", task.title)?;
        writeln!(out, "  runtime  {}", task.runtime)?;
        writeln!(out, "  rating   {}", task.rating)?;
        writeln!(
            out,
            "submit with: edit {row} TITLE | RUNTIME | RATING  (blank keeps the value)"
        )?;
        Ok(())
    }

    pub fn print_snapshot_json<W: Write>(
        &self,
        out: &mut W,
        snapshot: &StoreSnapshot,
    ) -> anyhow::Result<()> {
        let json =
            serde_json::to_string_pretty(snapshot).context("failed to encode snapshot as JSON")?;
        writeln!(out, "{json}")?;
        Ok(())
    }

    pub fn print_help<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "commands:")?;
        writeln!(out, "  add TITLE | RUNTIME | RATING    add a movie")?;
        writeln!(out, "  edit N                          show row N in the form")?;
        writeln!(out, "  edit N TITLE | RUNTIME | RATING update row N")?;
        writeln!(out, "                                  (a blank field keeps its value; it cannot be cleared)")?;
        writeln!(out, "  delete N (archive, rm)          archive row N")?;
        writeln!(out, "  restore (undo)                  bring back the last archived movie")?;
        writeln!(out, "  demo                            add sample movies")?;
        writeln!(out, "  list, export, help, quit")?;
        writeln!(out, "ratings: {}", RATING_LABELS.join(" "))?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    writer: &mut W,
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

    let mut header_line = String::new();
    let mut rule_line = String::new();
    for idx in 0..column_count {
        header_line.push_str(&format!("{:width$} ", headers[idx], width = widths[idx]));
        rule_line.push_str(&format!("{:-<width$} ", "", width = widths[idx]));
    }
    writeln!(writer, "{}", header_line.trim_end())?;
    writeln!(writer, "{}", rule_line.trim_end())?;

    for row in rows {
        let mut line = String::new();
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push_str(cell);
            line.push_str(&" ".repeat(padding + 1));
        }
        writeln!(writer, "{}", line.trim_end())?;
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

#[cfg(test)]
mod tests {
    use super::{Renderer, strip_ansi};
    use crate::store::TaskStore;

    fn render(store: &TaskStore) -> String {
        let mut out = Vec::new();
        Renderer::plain()
            .print_screen(&mut out, store)
            .expect("render screen");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn empty_list_placeholder() {
        let text = render(&TaskStore::new());
        assert_eq!(text, "== Movie List == 0 movie(s) | restore\n(no movies)\n");
    }

    #[test]
    fn rows_are_aligned_and_numbered() {
        let mut store = TaskStore::new();
        store.add("Heat", "170 min", "(R)");
        store.add("Up", "96 min", "(PG)");

        let text = render(&store);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "# Title Runtime. Rating");
        assert_eq!(lines[2], "- ----- ---------------");
        assert_eq!(lines[3], "1 Heat  170 min. (R)");
        assert_eq!(lines[4], "2 Up    96 min. (PG)");
    }

    #[test]
    fn top_bar_counts_archived() {
        let mut store = TaskStore::new();
        let id = store.add("Heat", "170 min", "(R)");
        store.delete(id);

        let text = render(&store);
        assert!(text.starts_with("== Movie List == 0 movie(s) | restore (1)\n"));
    }

    #[test]
    fn help_says_blank_fields_are_kept() {
        let mut out = Vec::new();
        Renderer::plain().print_help(&mut out).expect("render help");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("a blank field keeps its value; it cannot be cleared"));
    }

    #[test]
    fn strip_ansi_removes_sequences() {
        assert_eq!(strip_ansi("\x1b[33m12\x1b[0m"), "12");
    }
}
