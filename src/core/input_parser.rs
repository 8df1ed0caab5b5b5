// src/core/input_parser.rs

use crate::constants::TARGET_KEY;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key under which a reserved command stores its sub-command selector.
pub const SUBCOMMAND_KEY: &str = "cmd";

/// Key under which raw-text sub-commands receive their verbatim remainder.
pub const RAW_VALUE_KEY: &str = "value";

/// A sub-command whose arguments are free text.
///
/// Trailing `key=value` tokens whose key is in `trailing_keys` are still parsed as
/// parameters; everything before them is the text.
#[derive(Debug)]
pub struct RawTextSubcommand {
    pub name: &'static str,
    pub trailing_keys: &'static [&'static str],
}

/// A multi-word administrative command with its own grammar.
///
/// The second token is always the sub-command. For the sub-commands listed in
/// `raw_text_subcommands`, everything after it is kept as free text instead of being
/// parsed into `key=value` pairs.
#[derive(Debug)]
pub struct ReservedCommand {
    pub name: &'static str,
    pub raw_text_subcommands: &'static [RawTextSubcommand],
}

const FLAG_KEYS: &[&str] = &["challenge", "category"];

/// Every reserved multi-word command the parser knows about.
pub static RESERVED_COMMANDS: &[ReservedCommand] = &[ReservedCommand {
    name: "ctf",
    raw_text_subcommands: &[
        RawTextSubcommand {
            name: "flag",
            trailing_keys: FLAG_KEYS,
        },
        RawTextSubcommand {
            name: "capture",
            trailing_keys: FLAG_KEYS,
        },
        RawTextSubcommand {
            name: "note",
            trailing_keys: &[],
        },
    ],
}];

fn find_reserved(name: &str) -> Option<&'static ReservedCommand> {
    RESERVED_COMMANDS.iter().find(|cmd| cmd.name == name)
}

impl ReservedCommand {
    fn raw_text(&'static self, sub: &str) -> Option<&'static RawTextSubcommand> {
        self.raw_text_subcommands.iter().find(|raw| raw.name == sub)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Input could not be tokenized (unbalanced quotes?): {0}")]
    Tokenize(String),
}

/// One line of operator input, split into a command name and its parameters.
/// `name` is `None` only for blank input, in which case `params` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInput {
    pub name: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl ParsedInput {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The sub-command selector of a reserved command, if any.
    pub fn subcommand(&self) -> Option<&str> {
        self.param(SUBCOMMAND_KEY)
    }
}

/// Parses one line of operator text.
///
/// # Grammar
/// - Tokens are split on whitespace with shell-style quoting, so a quoted phrase is one token.
/// - The first token is the command name.
/// - `key=value` tokens are split on the first `=`; the last occurrence of a key wins.
/// - The first bare token becomes `target` unless `target` is already set; later bare
///   tokens are ignored.
/// - Reserved commands capture their second token as `cmd`. Whitelisted sub-commands get
///   the rest of the line, re-joined with single spaces, as `value`.
pub fn parse_input(line: &str) -> Result<ParsedInput, ParseError> {
    let tokens = shlex::split(&escape_comment_markers(line))
        .ok_or_else(|| ParseError::Tokenize(line.to_string()))?;

    let Some((name, rest)) = tokens.split_first() else {
        return Ok(ParsedInput::default());
    };

    let mut params = BTreeMap::new();
    let mut remaining = rest;

    if let Some(reserved) = find_reserved(name) {
        if let Some((sub, after_sub)) = rest.split_first() {
            params.insert(SUBCOMMAND_KEY.to_string(), sub.clone());
            remaining = after_sub;

            if let Some(raw) = reserved.raw_text(sub) {
                let mut text = after_sub;
                while let Some((last, before)) = text.split_last() {
                    let Some((key, value)) = last.split_once('=') else {
                        break;
                    };
                    if !raw.trailing_keys.contains(&key) {
                        break;
                    }
                    // Peeling from the end: the last occurrence is seen first.
                    params
                        .entry(key.to_string())
                        .or_insert_with(|| value.to_string());
                    text = before;
                }
                if !text.is_empty() {
                    params.insert(RAW_VALUE_KEY.to_string(), text.join(" "));
                }
                return Ok(ParsedInput {
                    name: Some(name.clone()),
                    params,
                });
            }
        }
    }

    for token in remaining {
        if let Some((key, value)) = token.split_once('=') {
            params.insert(key.to_string(), value.to_string());
        } else if !params.contains_key(TARGET_KEY) {
            params.insert(TARGET_KEY.to_string(), token.clone());
        } else {
            log::trace!("Ignoring extra positional token '{}'", token);
        }
    }

    Ok(ParsedInput {
        name: Some(name.clone()),
        params,
    })
}

/// Escapes every unquoted `#` so the tokenizer keeps it as text instead of starting a
/// comment there.
fn escape_comment_markers(line: &str) -> String {
    let mut escaped_line = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
        } else {
            match (quote, c) {
                (None, '#') => escaped_line.push('\\'),
                (None, '\\') | (Some('"'), '\\') => escaped = true,
                (None, '\'' | '"') => quote = Some(c),
                (Some(open), _) if open == c => quote = None,
                _ => {}
            }
        }
        escaped_line.push(c);
    }
    escaped_line
}
