// src/cli/dispatcher.rs

//! The console: owns every engine component and routes one line of input at a time.
//!
//! Built-in commands are looked up first, then the shortcut registry. An unknown name
//! ends the turn with a fuzzy proposal (never an automatic substitution).

use anyhow::{Context, Result};
use colored::*;
use std::io::Write;
use std::time::Duration;

use crate::{
    cli::{
        handlers,
        prompt::{LineSource, NameCompleter},
    },
    constants::FLAG_LOG_FILENAME,
    core::{
        advisor::Advisor,
        flag_log::FlagNotebook,
        fuzzy,
        gateway::{ExecutionGateway, GatewayPolicy},
        input_parser::{self, ParsedInput},
        learner::LearningStore,
        paths,
        registry::ShortcutRegistry,
    },
    models::ResolvedConfig,
    system::executor::{ProcessRunner, ShellRunner},
};

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

type BuiltinHandler = fn(&mut Console, &ParsedInput, &mut dyn Write) -> Result<Flow>;

/// A console command that is not a shortcut.
pub struct BuiltinCommand {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    handler: BuiltinHandler,
}

/// The single source of truth for built-in commands. They take precedence over shortcuts.
static BUILTIN_COMMANDS: &[BuiltinCommand] = &[
    BuiltinCommand {
        name: "ctf",
        aliases: &[],
        handler: handlers::ctf::handle,
    },
    BuiltinCommand {
        name: "exit",
        aliases: &["quit"],
        handler: handle_exit,
    },
    BuiltinCommand {
        name: "help",
        aliases: &[],
        handler: handlers::help::handle,
    },
    BuiltinCommand {
        name: "level",
        aliases: &[],
        handler: handlers::learning::handle_level,
    },
    BuiltinCommand {
        name: "next",
        aliases: &[],
        handler: handlers::learning::handle_next,
    },
    BuiltinCommand {
        name: "shortcuts",
        aliases: &["ls"],
        handler: handlers::catalog::handle,
    },
    BuiltinCommand {
        name: "stats",
        aliases: &[],
        handler: handlers::learning::handle_stats,
    },
    BuiltinCommand {
        name: "tips",
        aliases: &[],
        handler: handlers::learning::handle_tips,
    },
    BuiltinCommand {
        name: "top",
        aliases: &[],
        handler: handlers::learning::handle_top,
    },
];

/// Finds a built-in by its name or alias.
pub fn find_builtin(name: &str) -> Option<&'static BuiltinCommand> {
    BUILTIN_COMMANDS
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Every name and alias a built-in answers to.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_COMMANDS
        .iter()
        .flat_map(|cmd| std::iter::once(cmd.name).chain(cmd.aliases.iter().copied()))
}

fn handle_exit(_: &mut Console, _: &ParsedInput, _: &mut dyn Write) -> Result<Flow> {
    Ok(Flow::Exit)
}

/// Presentation knobs of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleSettings {
    pub preview_chars: usize,
    pub suggestion_count: usize,
}

#[derive(Debug)]
pub struct Console {
    pub registry: ShortcutRegistry,
    pub gateway: ExecutionGateway,
    pub advisor: Advisor,
    pub learner: LearningStore,
    pub notebook: FlagNotebook,
    pub settings: ConsoleSettings,
}

impl Console {
    /// Builds a console from resolved configuration, with a real shell runner.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        Self::with_runner(config, Box::new(ShellRunner))
    }

    pub fn with_runner(config: &ResolvedConfig, runner: Box<dyn ProcessRunner>) -> Result<Self> {
        paths::ensure_dir(&config.workspace).with_context(|| {
            format!(
                "Failed to prepare workspace '{}'",
                config.workspace.display()
            )
        })?;

        let registry = ShortcutRegistry::load_from_dir(&config.shortcuts_dir).with_context(|| {
            format!(
                "Failed to load shortcuts from '{}'",
                config.shortcuts_dir.display()
            )
        })?;
        log::debug!(
            "Loaded {} shortcut(s) from '{}'",
            registry.len(),
            config.shortcuts_dir.display()
        );

        let policy = GatewayPolicy {
            dry_run: config.dry_run,
            require_force_for_unsafe: config.require_force_for_unsafe,
            timeout: Duration::from_secs(config.timeout_secs),
        };

        Ok(Self {
            registry,
            gateway: ExecutionGateway::new(runner, policy, config.workspace.clone()),
            advisor: Advisor::new(),
            learner: LearningStore::load(&config.learner_db),
            notebook: FlagNotebook::load(&config.workspace.join(FLAG_LOG_FILENAME)),
            settings: ConsoleSettings {
                preview_chars: config.output_preview_chars,
                suggestion_count: config.suggestion_count,
            },
        })
    }

    /// Problems found in the loaded setup that do not prevent the console from running.
    pub fn startup_warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .registry
            .names()
            .into_iter()
            .filter(|name| find_builtin(name).is_some())
            .map(|name| format!(t!("console.warning.shadowed_shortcut"), name = name))
            .collect();
        warnings.extend(
            self.advisor
                .unbound_rules(&self.registry)
                .into_iter()
                .map(|name| format!(t!("console.warning.unbound_rule"), name = name)),
        );
        warnings
    }

    /// Names offered by tab completion.
    pub fn completer(&self) -> NameCompleter {
        NameCompleter::new(
            builtin_names()
                .map(str::to_string)
                .chain(self.registry.names().into_iter().map(str::to_string)),
        )
    }

    /// Handles one line of operator input.
    pub fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let parsed = match input_parser::parse_input(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                writeln!(out, "{} {}", "[error]".red(), e)?;
                return Ok(Flow::Continue);
            }
        };
        let Some(name) = parsed.name.clone() else {
            return Ok(Flow::Continue);
        };
        log::debug!("Dispatching '{}' with {:?}", name, parsed.params);

        if let Some(builtin) = find_builtin(&name) {
            return (builtin.handler)(self, &parsed, out);
        }
        if self.registry.contains(&name) {
            return handlers::shortcut::handle(self, &name, &parsed, out);
        }

        match fuzzy::propose(&name, self.registry.names()) {
            Some(found) => writeln!(
                out,
                "{} {}",
                "[did you mean]".yellow(),
                format!(t!("console.did_you_mean"), name = found.name, score = found.score)
            )?,
            None => writeln!(out, "{} {}", "[unknown]".red(), name)?,
        }
        Ok(Flow::Continue)
    }

    /// Prints the banner, then reads and handles lines until `exit`/`quit` or end of input.
    pub fn run(&mut self, source: &mut dyn LineSource, out: &mut dyn Write) -> Result<()> {
        let mode = if self.gateway.policy().dry_run {
            t!("console.banner.dry_run_on").yellow()
        } else {
            t!("console.banner.dry_run_off").red().bold()
        };
        writeln!(
            out,
            "{} {}",
            "sigil".cyan().bold(),
            format!(
                t!("console.banner"),
                mode = mode,
                level = self.learner.skill_level(),
                count = self.registry.len()
            )
        )?;
        for warning in self.startup_warnings() {
            log::warn!("{}", warning);
            writeln!(out, "{} {}", "[warn]".yellow(), warning)?;
        }

        loop {
            let line = match source.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Reading input failed, leaving the console: {}", e);
                    break;
                }
            };
            match self.handle_line(&line, out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(e) => {
                    log::debug!("Command '{}' failed: {:?}", line, e);
                    writeln!(out, "{} {:#}", "[error]".red(), e)?;
                }
            }
        }
        writeln!(out, "{}", t!("console.goodbye"))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        cli::prompt::ReaderSource,
        models::Shortcut,
        system::executor::{ProcessOutput, RunnerError},
    };
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::io::Cursor;
    use std::path::Path;
    use std::rc::Rc;

    /// Records every command line and answers with canned output.
    pub(crate) struct SpyRunner {
        pub calls: Rc<RefCell<Vec<String>>>,
        pub stdout: String,
    }

    impl ProcessRunner for SpyRunner {
        fn run(&self, command_line: &str, _: Duration) -> Result<ProcessOutput, RunnerError> {
            self.calls.borrow_mut().push(command_line.to_string());
            Ok(ProcessOutput {
                returncode: 0,
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    pub(crate) fn shortcut(name: &str, template: &str, safe: bool) -> Shortcut {
        Shortcut {
            name: name.to_string(),
            template: template.to_string(),
            description: format!("{} description", name),
            safe,
            tags: BTreeSet::from(["recon".to_string()]),
            notes: None,
        }
    }

    pub(crate) fn config(root: &Path, dry_run: bool) -> ResolvedConfig {
        ResolvedConfig {
            workspace: root.join("reports"),
            shortcuts_dir: root.join("shortcuts"),
            learner_db: root.join("reports").join("learner_db.json"),
            dry_run,
            require_force_for_unsafe: true,
            timeout_secs: 5,
            output_preview_chars: 10,
            suggestion_count: 3,
        }
    }

    /// A console over a temp directory with a spy runner and a small registry.
    pub(crate) fn console(
        root: &Path,
        dry_run: bool,
        stdout: &str,
    ) -> (Console, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let runner = SpyRunner {
            calls: Rc::clone(&calls),
            stdout: stdout.to_string(),
        };
        let mut console = Console::with_runner(&config(root, dry_run), Box::new(runner)).unwrap();
        console.registry = ShortcutRegistry::from_shortcuts(vec![
            shortcut("enum-full", "nmap -A {target}", true),
            shortcut("enum-web", "gobuster dir -u {target}", true),
            shortcut("wipe-logs", "rm -rf {workspace}/logs", false),
        ]);
        (console, calls)
    }

    pub(crate) fn run_line(console: &mut Console, line: &str) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        console.handle_line(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_unknown_name_proposes_without_executing() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, calls) = console(tmp.path(), false, "");

        let out = run_line(&mut console, "enum-ful 10.0.0.1");
        assert!(out.contains("[did you mean]"));
        assert!(out.contains("enum-full"));
        assert!(calls.borrow().is_empty());
        assert!(console.learner.history().is_empty());
    }

    #[test]
    fn test_unrelated_name_is_unknown() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, _) = console(tmp.path(), false, "");
        let out = run_line(&mut console, "zzzzqqq");
        assert!(out.contains("[unknown] zzzzqqq"));
    }

    #[test]
    fn test_blank_and_malformed_lines_continue() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, _) = console(tmp.path(), false, "");
        let mut out = Vec::new();
        assert_eq!(console.handle_line("   ", &mut out).unwrap(), Flow::Continue);
        assert_eq!(
            console.handle_line("enum-full \"unterminated", &mut out).unwrap(),
            Flow::Continue
        );
        assert!(String::from_utf8(out).unwrap().contains("[error]"));
    }

    #[test]
    fn test_exit_and_quit_stop_the_loop() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, _) = console(tmp.path(), false, "");
        let mut out = Vec::new();
        assert_eq!(console.handle_line("exit", &mut out).unwrap(), Flow::Exit);
        assert_eq!(console.handle_line("quit", &mut out).unwrap(), Flow::Exit);
    }

    #[test]
    fn test_run_stops_at_quit_and_ignores_remaining_input() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, calls) = console(tmp.path(), false, "");
        let mut source = ReaderSource::new(Cursor::new(
            "enum-full 10.0.0.1\nquit\nenum-web 10.0.0.1\n",
        ));
        let mut out = Vec::new();
        console.run(&mut source, &mut out).unwrap();

        assert_eq!(calls.borrow().as_slice(), ["nmap -A 10.0.0.1"]);
        assert_eq!(console.learner.history().len(), 1);
    }

    #[test]
    fn test_run_ends_at_end_of_input() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, _) = console(tmp.path(), true, "");
        let mut source = ReaderSource::new(Cursor::new("help\n"));
        let mut out = Vec::new();
        console.run(&mut source, &mut out).unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_startup_warnings_cover_shadowing_and_unbound_rules() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, _) = console(tmp.path(), true, "");
        console.registry.insert(shortcut("stats", "echo shadowed", true));

        let warnings = console.startup_warnings().join("\n");
        assert!(warnings.contains("stats"));
        assert!(warnings.contains("brute-ssh"));
        assert!(!warnings.contains("enum-web"));
    }

    #[test]
    fn test_builtin_aliases_resolve() {
        assert_eq!(find_builtin("ls").map(|b| b.name), Some("shortcuts"));
        assert_eq!(find_builtin("quit").map(|b| b.name), Some("exit"));
        assert!(find_builtin("enum-full").is_none());
        assert!(builtin_names().any(|n| n == "ctf"));
    }
}
