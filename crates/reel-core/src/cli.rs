use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "reel",
    version,
    about = "Reel: a movie watch-list for the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "reelrc")]
    pub reelrc: Option<PathBuf>,

    /// Start with the demo movies already in the list.
    #[arg(long = "demo")]
    pub demo: bool,

    /// Run the command words and exit without reading stdin.
    #[arg(long = "batch")]
    pub batch: bool,

    /// Session commands to run first; separate several with `;`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

impl GlobalCli {
    /// The trailing words as session lines.
    pub fn initial_lines(&self) -> Vec<String> {
        let joined = self
            .rest
            .iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(" ");

        joined
            .split(';')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.KEY=VALUE` / `rc.KEY:VALUE` words out of the argument list.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

/// Raw text typed into the add/edit form, before rating normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub title: String,
    pub runtime: String,
    pub rating: String,
}

impl FormInput {
    /// Splits `title | runtime | rating`; missing fields come back empty.
    pub fn parse(text: &str) -> Self {
        let mut parts = text.splitn(3, '|').map(|part| part.trim().to_string());
        Self {
            title: parts.next().unwrap_or_default(),
            runtime: parts.next().unwrap_or_default(),
            rating: parts.next().unwrap_or_default(),
        }
    }
}

/// One parsed session line. Rows are 1-based positions in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(FormInput),
    Edit {
        row: usize,
        input: Option<FormInput>,
    },
    Delete {
        row: usize,
    },
    Restore,
    Demo,
    List,
    Export,
    Help,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "edit", "delete", "archive", "rm", "restore", "undo", "demo", "list", "ls",
        "export", "help", "quit", "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

impl Command {
    /// Parses a non-empty session line.
    #[tracing::instrument]
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let word = word.to_ascii_lowercase();
        let name = match word.as_str() {
            "" => return Err(anyhow!("empty command")),
            "q" => "quit",
            "?" => "help",
            other => expand_command_abbrev(other, &known_command_names())
                .ok_or_else(|| anyhow!("unknown command: {other} (try `help`)"))?,
        };
        trace!(token = %word, expanded = name, "resolved command token");

        let command = match name {
            "add" => Command::Add(FormInput::parse(rest)),
            "edit" => {
                let (row, fields) = split_row(rest)?;
                let input = (!fields.is_empty()).then(|| FormInput::parse(fields));
                Command::Edit { row, input }
            }
            "delete" | "archive" | "rm" => {
                let (row, extra) = split_row(rest)?;
                if !extra.is_empty() {
                    return Err(anyhow!("{name} takes only a row number"));
                }
                Command::Delete { row }
            }
            "restore" | "undo" => Command::Restore,
            "demo" => Command::Demo,
            "list" | "ls" => Command::List,
            "export" => Command::Export,
            "help" => Command::Help,
            _ => Command::Quit,
        };

        Ok(command)
    }
}

fn split_row(rest: &str) -> anyhow::Result<(usize, &str)> {
    let (token, fields) = match rest.split_once(char::is_whitespace) {
        Some((token, fields)) => (token, fields.trim()),
        None => (rest, ""),
    };

    if token.is_empty() {
        return Err(anyhow!("expected a row number"));
    }

    match token.parse::<usize>() {
        Ok(row) if row >= 1 => Ok((row, fields)),
        _ => Err(anyhow!("invalid row number: {token}")),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, FormInput, GlobalCli, preprocess_args};

    fn form(title: &str, runtime: &str, rating: &str) -> FormInput {
        FormInput {
            title: title.to_string(),
            runtime: runtime.to_string(),
            rating: rating.to_string(),
        }
    }

    #[test]
    fn parses_add_with_all_fields() {
        let cmd = Command::parse("add Alien | 117 min | R").expect("parse add");
        assert_eq!(cmd, Command::Add(form("Alien", "117 min", "R")));
    }

    #[test]
    fn add_with_missing_fields_leaves_them_empty() {
        let cmd = Command::parse("add Heat").expect("parse add");
        assert_eq!(cmd, Command::Add(form("Heat", "", "")));

        let cmd = Command::parse("add").expect("parse bare add");
        assert_eq!(cmd, Command::Add(FormInput::default()));
    }

    #[test]
    fn parses_edit_with_and_without_fields() {
        assert_eq!(
            Command::parse("edit 2").expect("parse edit"),
            Command::Edit { row: 2, input: None }
        );
        assert_eq!(
            Command::parse("edit 3 | 130 min |").expect("parse edit"),
            Command::Edit {
                row: 3,
                input: Some(form("", "130 min", "")),
            }
        );
    }

    #[test]
    fn delete_aliases_share_one_command() {
        for line in ["delete 1", "archive 1", "rm 1", "del 1"] {
            assert_eq!(
                Command::parse(line).expect("parse delete"),
                Command::Delete { row: 1 }
            );
        }
    }

    #[test]
    fn rejects_bad_rows_and_unknown_words() {
        assert!(Command::parse("delete").is_err());
        assert!(Command::parse("delete 0").is_err());
        assert!(Command::parse("edit two").is_err());
        assert!(Command::parse("delete 1 2").is_err());
        assert!(Command::parse("launch").is_err());
        // `d` could be delete or demo
        assert!(Command::parse("d 1").is_err());
    }

    #[test]
    fn short_aliases() {
        assert_eq!(Command::parse("q").expect("quit"), Command::Quit);
        assert_eq!(Command::parse("?").expect("help"), Command::Help);
        assert_eq!(Command::parse("UNDO").expect("undo"), Command::Restore);
        assert_eq!(Command::parse("res").expect("restore"), Command::Restore);
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let raw: Vec<OsString> = ["reel", "rc.color=off", "--demo", "rc.prompt:>", "list"]
            .into_iter()
            .map(OsString::from)
            .collect();

        let pre = preprocess_args(&raw).expect("preprocess");
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.prompt".to_string(), ">".to_string()),
            ]
        );

        let cli = GlobalCli::parse_from(pre.cleaned_args);
        assert!(cli.demo);
        assert_eq!(cli.initial_lines(), vec!["list".to_string()]);
    }

    #[test]
    fn trailing_words_split_on_semicolons() {
        let cli = GlobalCli::parse_from([
            "reel", "--batch", "add", "Alien", "|", "117", "min", ";", "list",
        ]);
        assert!(cli.batch);
        assert_eq!(
            cli.initial_lines(),
            vec!["add Alien | 117 min".to_string(), "list".to_string()]
        );
    }
}
