// src/core/gateway.rs

//! # Execution Gateway
//!
//! Turns a shortcut plus its context into an `ExecutionResult`:
//!
//! 1. **Template binding**: every `{placeholder}` is replaced from the context.
//! 2. **Safety gate**: unsafe shortcuts need `force=true` while the policy demands it.
//! 3. **Dry-run**: a rehearsal result is returned without touching any process.
//! 4. **Real execution**: the bound line runs through the `ProcessRunner` under a timeout,
//!    and the files present in the workspace are reported as artifacts.
//!
//! Refusals (steps 1 and 2) come back as `GatewayRefusal`. Everything that goes wrong
//! once a process is involved is folded into the returned result instead.

use crate::{
    constants::{FORCE_KEY, FORCE_SENTINEL},
    core::template::{self, TemplateError},
    models::{ExecutionContext, ExecutionResult, Shortcut},
    system::executor::{ProcessRunner, RunnerError},
};
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use walkdir::WalkDir;

/// Reasons the gateway declines to run a shortcut. None of them touch a process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayRefusal {
    #[error("Missing parameter '{0}'.")]
    MissingParameter(String),
    #[error("The command template of '{0}' contains an empty placeholder.")]
    MalformedTemplate(String),
    #[error("'{shortcut}' is destructive. Add force=true to parameters to execute.")]
    UnsafeWithoutOptIn { shortcut: String },
}

/// How the gateway treats execution requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayPolicy {
    pub dry_run: bool,
    pub require_force_for_unsafe: bool,
    pub timeout: Duration,
}

/// A completed execution attempt, real or rehearsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// The command line after template binding.
    pub command_line: String,
    /// `true` when no process was invoked.
    pub rehearsed: bool,
    pub result: ExecutionResult,
}

pub struct ExecutionGateway {
    runner: Box<dyn ProcessRunner>,
    policy: GatewayPolicy,
    workspace: PathBuf,
}

impl fmt::Debug for ExecutionGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionGateway")
            .field("policy", &self.policy)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl ExecutionGateway {
    pub fn new(runner: Box<dyn ProcessRunner>, policy: GatewayPolicy, workspace: PathBuf) -> Self {
        Self {
            runner,
            policy,
            workspace,
        }
    }

    pub fn policy(&self) -> &GatewayPolicy {
        &self.policy
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Builds the context for a shortcut: the ambient workspace overlaid with parsed params.
    pub fn context_for(&self, params: &BTreeMap<String, String>) -> ExecutionContext {
        ExecutionContext::with_workspace(&self.workspace.to_string_lossy()).merged(params)
    }

    /// Binds, checks and (unless rehearsing) runs a shortcut.
    pub fn execute(
        &self,
        shortcut: &Shortcut,
        ctx: &ExecutionContext,
    ) -> Result<Execution, GatewayRefusal> {
        // 1. Template binding.
        let command_line = template::bind(&shortcut.template, ctx).map_err(|e| match e {
            TemplateError::MissingParameter(key) => GatewayRefusal::MissingParameter(key),
            TemplateError::EmptyPlaceholder => {
                GatewayRefusal::MalformedTemplate(shortcut.name.clone())
            }
        })?;

        // 2. Safety gate.
        if !shortcut.safe
            && self.policy.require_force_for_unsafe
            && ctx.get(FORCE_KEY) != Some(FORCE_SENTINEL)
        {
            log::debug!("Refusing unsafe shortcut '{}' without opt-in.", shortcut.name);
            return Err(GatewayRefusal::UnsafeWithoutOptIn {
                shortcut: shortcut.name.clone(),
            });
        }

        // 3. Dry-run short-circuit.
        if self.policy.dry_run {
            return Ok(Execution {
                command_line,
                rehearsed: true,
                result: ExecutionResult::rehearsal(),
            });
        }

        // 4. Real execution.
        log::debug!("Executing '{}' (timeout {:?})", command_line, self.policy.timeout);
        let result = match self.runner.run(&command_line, self.policy.timeout) {
            Ok(output) => ExecutionResult {
                returncode: output.returncode,
                stdout: output.stdout,
                stderr: output.stderr,
                artifacts: collect_artifacts(&self.workspace),
            },
            Err(RunnerError::Timeout) => ExecutionResult::failure("timeout"),
            Err(e) => {
                log::debug!("Invocation of '{}' failed: {}", command_line, e);
                ExecutionResult::failure(e.to_string())
            }
        };

        Ok(Execution {
            command_line,
            rehearsed: false,
            result,
        })
    }
}

/// Every regular file currently under `workspace`, sorted. Unreadable entries are skipped.
pub fn collect_artifacts(workspace: &Path) -> Vec<String> {
    let mut artifacts: Vec<String> = WalkDir::new(workspace)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_string_lossy().into_owned())
        .collect();
    artifacts.sort();
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::executor::ProcessOutput;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::fs;
    use std::rc::Rc;

    /// Records every invocation and answers with a canned reply.
    struct SpyRunner {
        calls: Rc<RefCell<Vec<String>>>,
        reply: fn() -> Result<ProcessOutput, RunnerError>,
    }

    impl ProcessRunner for SpyRunner {
        fn run(&self, command_line: &str, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
            self.calls.borrow_mut().push(command_line.to_string());
            (self.reply)()
        }
    }

    fn ok_reply() -> Result<ProcessOutput, RunnerError> {
        Ok(ProcessOutput {
            returncode: 0,
            stdout: "22/tcp open ssh".to_string(),
            stderr: String::new(),
        })
    }

    fn shortcut(name: &str, template: &str, safe: bool) -> Shortcut {
        Shortcut {
            name: name.to_string(),
            template: template.to_string(),
            description: String::new(),
            safe,
            tags: BTreeSet::new(),
            notes: None,
        }
    }

    fn gateway(
        dry_run: bool,
        reply: fn() -> Result<ProcessOutput, RunnerError>,
        workspace: &Path,
    ) -> (ExecutionGateway, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let runner = SpyRunner {
            calls: Rc::clone(&calls),
            reply,
        };
        let policy = GatewayPolicy {
            dry_run,
            require_force_for_unsafe: true,
            timeout: Duration::from_secs(5),
        };
        (
            ExecutionGateway::new(Box::new(runner), policy, workspace.to_path_buf()),
            calls,
        )
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_parameter_never_invokes_process() {
        let tmp = tempfile::tempdir().unwrap();
        let (gw, calls) = gateway(false, ok_reply, tmp.path());
        let sc = shortcut("pair", "tool {a} {b}", true);
        let ctx = gw.context_for(&params(&[("a", "1")]));

        let outcome = gw.execute(&sc, &ctx);

        assert_eq!(outcome, Err(GatewayRefusal::MissingParameter("b".to_string())));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_dry_run_returns_empty_result_without_process() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("existing.txt"), "x").unwrap();
        let (gw, calls) = gateway(true, ok_reply, tmp.path());
        let sc = shortcut("scan", "nmap {target}", true);
        let ctx = gw.context_for(&params(&[("target", "10.0.0.1")]));

        let execution = gw.execute(&sc, &ctx).unwrap();

        assert!(execution.rehearsed);
        assert_eq!(execution.command_line, "nmap 10.0.0.1");
        assert_eq!(execution.result, ExecutionResult::rehearsal());
        assert!(execution.result.artifacts.is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_unsafe_without_opt_in_is_refused_even_in_dry_run() {
        let tmp = tempfile::tempdir().unwrap();
        let (gw, calls) = gateway(true, ok_reply, tmp.path());
        let sc = shortcut("wipe", "rm -rf {workspace}/tmp", false);

        for value in [None, Some("yes"), Some("TRUE"), Some("1")] {
            let mut p = BTreeMap::new();
            if let Some(v) = value {
                p.insert("force".to_string(), v.to_string());
            }
            let outcome = gw.execute(&sc, &gw.context_for(&p));
            assert_eq!(
                outcome,
                Err(GatewayRefusal::UnsafeWithoutOptIn {
                    shortcut: "wipe".to_string()
                })
            );
        }
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_unsafe_with_opt_in_executes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.txt"), "x").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("a.txt"), "x").unwrap();
        let (gw, calls) = gateway(false, ok_reply, tmp.path());
        let sc = shortcut("wipe", "rm -rf {workspace}/tmp", false);
        let ctx = gw.context_for(&params(&[("force", "true")]));

        let execution = gw.execute(&sc, &ctx).unwrap();

        assert!(!execution.rehearsed);
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(execution.result.returncode, 0);
        assert_eq!(execution.result.stdout, "22/tcp open ssh");
        assert_eq!(execution.result.artifacts.len(), 2);
        assert!(execution.result.artifacts[0].ends_with("b.txt"));
    }

    #[test]
    fn test_timeout_is_encoded_in_result() {
        let tmp = tempfile::tempdir().unwrap();
        let (gw, _calls) = gateway(false, || Err(RunnerError::Timeout), tmp.path());
        let sc = shortcut("slow", "sleep 999", true);

        let execution = gw.execute(&sc, &gw.context_for(&BTreeMap::new())).unwrap();

        assert_eq!(execution.result.returncode, -1);
        assert_eq!(execution.result.stderr, "timeout");
        assert!(execution.result.artifacts.is_empty());
    }

    #[test]
    fn test_spawn_failure_is_encoded_in_result() {
        let tmp = tempfile::tempdir().unwrap();
        let (gw, _calls) = gateway(
            false,
            || {
                Err(RunnerError::Spawn(
                    "x".to_string(),
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no shell"),
                ))
            },
            tmp.path(),
        );
        let sc = shortcut("x", "x", true);

        let execution = gw.execute(&sc, &gw.context_for(&BTreeMap::new())).unwrap();

        assert_eq!(execution.result.returncode, -1);
        assert!(execution.result.stderr.contains("no shell"));
    }

    #[test]
    fn test_context_always_carries_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let (gw, _calls) = gateway(true, ok_reply, tmp.path());
        let ctx = gw.context_for(&BTreeMap::new());
        assert_eq!(
            ctx.get("workspace"),
            Some(tmp.path().to_string_lossy().as_ref())
        );
    }

    #[test]
    fn test_collect_artifacts_missing_workspace_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(collect_artifacts(&tmp.path().join("absent")).is_empty());
    }
}
