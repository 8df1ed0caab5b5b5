// src/cli/prompt.rs

//! Where console lines come from: an interactive prompt on a terminal, or any buffered
//! reader (piped stdin, tests).

use dialoguer::{BasicHistory, Completion, Input, theme::ColorfulTheme};
use std::io::{self, BufRead, IsTerminal};

/// A source of operator input lines. `Ok(None)` means end of input.
pub trait LineSource {
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads lines from any `BufRead`, one command per line.
#[derive(Debug)]
pub struct ReaderSource<R: BufRead> {
    reader: R,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Completes the first word of the line against known command names.
#[derive(Debug, Clone, Default)]
pub struct NameCompleter {
    names: Vec<String>,
}

impl NameCompleter {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names.dedup();
        Self { names }
    }
}

impl Completion for NameCompleter {
    fn get(&self, input: &str) -> Option<String> {
        if input.is_empty() || input.contains(char::is_whitespace) {
            return None;
        }
        self.names
            .iter()
            .find(|name| name.starts_with(input) && name.as_str() != input)
            .cloned()
    }
}

/// An interactive prompt with in-session history and tab completion.
pub struct TerminalSource {
    theme: ColorfulTheme,
    history: BasicHistory,
    completer: NameCompleter,
}

impl TerminalSource {
    pub fn new(completer: NameCompleter) -> Self {
        Self {
            theme: ColorfulTheme::default(),
            history: BasicHistory::new().max_entries(200).no_duplicates(true),
            completer,
        }
    }
}

impl LineSource for TerminalSource {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let answer = Input::<String>::with_theme(&self.theme)
            .with_prompt(t!("console.prompt"))
            .allow_empty(true)
            .history_with(&mut self.history)
            .completion_with(&self.completer)
            .interact_text();

        match answer {
            Ok(line) => Ok(Some(line)),
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(dialoguer::Error::IO(e)) => Err(e),
        }
    }
}

/// Picks the interactive prompt when stdin is a terminal, plain line reading otherwise.
pub fn stdin_source(completer: NameCompleter) -> Box<dyn LineSource> {
    if io::stdin().is_terminal() {
        Box::new(TerminalSource::new(completer))
    } else {
        Box::new(ReaderSource::new(io::stdin().lock()))
    }
}
