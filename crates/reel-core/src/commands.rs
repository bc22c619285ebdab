use std::io::{BufRead, Write};

use anyhow::Context;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cli::{Command, FormInput};
use crate::render::Renderer;
use crate::store::TaskStore;
use crate::task::{RATING_LABELS, normalize_rating};

/// Whether the session keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[instrument(skip(store, renderer, out))]
pub fn dispatch<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
) -> anyhow::Result<Flow> {
    match command {
        Command::Add(input) => cmd_add(store, renderer, out, input)?,
        Command::Edit { row, input } => cmd_edit(store, renderer, out, row, input)?,
        Command::Delete { row } => cmd_delete(store, renderer, out, row)?,
        Command::Restore => cmd_restore(store, renderer, out)?,
        Command::Demo => {
            info!("command demo");
            store.seed_demo();
            renderer.print_screen(out, store)?;
        }
        Command::List => renderer.print_screen(out, store)?,
        Command::Export => renderer.print_snapshot_json(out, &store.snapshot())?,
        Command::Help => renderer.print_help(out)?,
        Command::Quit => return Ok(Flow::Quit),
    }

    Ok(Flow::Continue)
}

/// Parses and runs one line. Input mistakes are reported to `out` and do not
/// end the session.
pub fn execute_line<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    line: &str,
) -> anyhow::Result<Flow> {
    if line.trim().is_empty() {
        return Ok(Flow::Continue);
    }

    match Command::parse(line) {
        Ok(command) => dispatch(store, renderer, out, command),
        Err(err) => {
            debug!(error = %err, "rejected session line");
            writeln!(out, "{err}")?;
            Ok(Flow::Continue)
        }
    }
}

/// Draws the screen, then runs lines from `input` until `quit` or EOF.
///
/// `prompt` is printed before each read when set.
#[instrument(skip_all)]
pub fn run_session<R: BufRead, W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    mut input: R,
    out: &mut W,
    prompt: Option<&str>,
) -> anyhow::Result<()> {
    renderer.print_screen(out, store)?;

    let mut line = String::new();
    loop {
        if let Some(prompt) = prompt {
            write!(out, "{prompt}")?;
            out.flush()?;
        }

        line.clear();
        let read = input
            .read_line(&mut line)
            .context("failed to read session input")?;
        if read == 0 {
            debug!("end of input");
            break;
        }

        if execute_line(store, renderer, out, &line)? == Flow::Quit {
            break;
        }
    }

    info!(active = store.tasks().len(), "session finished");
    Ok(())
}

/// Runs the command-line lines first, then the interactive session unless
/// `batch` is set. A `quit` among the lines ends everything.
#[instrument(skip(store, renderer, input, out, prompt))]
pub fn run_startup<R: BufRead, W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    lines: &[String],
    batch: bool,
    input: R,
    out: &mut W,
    prompt: Option<&str>,
) -> anyhow::Result<()> {
    for line in lines {
        if execute_line(store, renderer, out, line)? == Flow::Quit {
            debug!("quit before the session started");
            return Ok(());
        }
    }

    if batch {
        debug!("batch mode; stdin not read");
        return Ok(());
    }

    run_session(store, renderer, input, out, prompt).context("watch-list session failed")
}

fn cmd_add<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    input: FormInput,
) -> anyhow::Result<()> {
    info!("command add");

    let Some(rating) = checked_rating(out, &input.rating)? else {
        return Ok(());
    };

    store.add(input.title, input.runtime, rating);
    renderer.print_screen(out, store)
}

fn cmd_edit<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    row: usize,
    input: Option<FormInput>,
) -> anyhow::Result<()> {
    info!(row, "command edit");

    let Some(id) = id_at_row(store, row) else {
        return no_such_row(out, row);
    };
    let Some(current) = store.get(id).cloned() else {
        return no_such_row(out, row);
    };

    let Some(input) = input else {
        return renderer.print_edit_form(out, row, &current);
    };

    let Some(rating) = checked_rating(out, &input.rating)? else {
        return Ok(());
    };

    let title = keep_if_blank(input.title, current.title);
    let runtime = keep_if_blank(input.runtime, current.runtime);
    let rating = keep_if_blank(rating, current.rating);

    if !store.update(id, title, runtime, rating) {
        warn!(%id, "row vanished before update");
        return no_such_row(out, row);
    }

    renderer.print_screen(out, store)
}

fn cmd_delete<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
    row: usize,
) -> anyhow::Result<()> {
    info!(row, "command delete");

    let Some(id) = id_at_row(store, row) else {
        return no_such_row(out, row);
    };

    if store.delete(id) {
        writeln!(out, "Archived row {row}. Use `restore` to bring it back.")?;
    }
    renderer.print_screen(out, store)
}

fn cmd_restore<W: Write>(
    store: &mut TaskStore,
    renderer: &Renderer,
    out: &mut W,
) -> anyhow::Result<()> {
    info!("command restore");

    if !store.has_archived_tasks() {
        writeln!(out, "Nothing to restore.")?;
        return Ok(());
    }

    if let Some(id) = store.restore_last()
        && let Some(task) = store.get(id)
    {
        writeln!(out, "Restored {}.", task.title)?;
    }
    renderer.print_screen(out, store)
}

fn id_at_row(store: &TaskStore, row: usize) -> Option<Uuid> {
    row.checked_sub(1)
        .and_then(|idx| store.tasks().get(idx))
        .map(|task| task.id)
}

fn no_such_row<W: Write>(out: &mut W, row: usize) -> anyhow::Result<()> {
    writeln!(out, "No movie at row {row}.")?;
    Ok(())
}

// The form only offers the fixed rating choices.
fn checked_rating<W: Write>(out: &mut W, raw: &str) -> anyhow::Result<Option<String>> {
    match normalize_rating(raw) {
        Some(rating) => Ok(Some(rating)),
        None => {
            writeln!(
                out,
                "Unknown rating {raw:?}; pick one of {}.",
                RATING_LABELS.join(" ")
            )?;
            Ok(None)
        }
    }
}

fn keep_if_blank(value: String, current: String) -> String {
    if value.is_empty() { current } else { value }
}
