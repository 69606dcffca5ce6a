//! Running one expanded command line in a shell.
//!
//! The engine only sees the `CommandExecutor` trait, so the choice of
//! shell (and the platform differences that come with it) lives here.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::errors::{BdevError, Result};

/// How often a child with a deadline is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything needed to run one step.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec<'a> {
    pub command: &'a str,
    pub cwd: Option<&'a Path>,
    /// Added on top of the inherited process environment.
    pub env: &'a [(String, String)],
    pub timeout: Option<Duration>,
}

/// What came back from the shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// stdout and stderr, in the order the chunks arrived.
    pub output: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Command line in, combined output and exit status out.
pub trait CommandExecutor: Send + Sync {
    /// `Err` means the command could not be started at all.
    fn run(&self, spec: &CommandSpec<'_>) -> io::Result<CommandOutput>;
}

/// Runs commands through `sh -c` (or `powershell -Command` on Windows).
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    program: PathBuf,
    flag: &'static str,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        if cfg!(windows) {
            Self::with_shell("powershell")
        } else {
            Self::with_shell("sh")
        }
    }
}

impl ShellExecutor {
    /// The platform's default shell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `program` as the shell; the command flag is picked from its name.
    pub fn with_shell(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let stem = program
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let flag = match stem.as_str() {
            "powershell" | "pwsh" => "-Command",
            "cmd" => "/C",
            _ => "-c",
        };
        Self { program, flag }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Find the shell binary on `PATH` and pin its absolute location.
    ///
    /// This is the one failure that stops a workflow before any step
    /// runs: without a shell nothing can execute.
    pub fn resolve(mut self) -> Result<Self> {
        self.program = find_program(&self.program)
            .ok_or_else(|| BdevError::ShellNotFound(self.program.display().to_string()))?;
        Ok(self)
    }
}

impl CommandExecutor for ShellExecutor {
    fn run(&self, spec: &CommandSpec<'_>) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.flag)
            .arg(spec.command)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = spec.cwd {
            cmd.current_dir(dir);
        }

        // A child that may have to be killed gets its own process group so
        // the kill also reaches whatever the shell started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if spec.timeout.is_some() {
                cmd.process_group(0);
            }
        }

        let mut child = cmd.spawn()?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        // Every reader holds a sender; the channel disconnects once both
        // pipes are closed, including by background children of the shell.
        let (done_tx, done_rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(drain(stdout, Arc::clone(&buffer), done_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(drain(stderr, Arc::clone(&buffer), done_tx.clone()));
        }
        drop(done_tx);

        let (status, timed_out) = match spec.timeout {
            Some(limit) => {
                let deadline = Instant::now() + limit;
                match wait_until(&mut child, deadline)? {
                    (_, false) if !drained_by(&done_rx, deadline) => {
                        // The shell is gone but something it started still
                        // holds the pipes open past the deadline.
                        kill_tree(&mut child);
                        (None, true)
                    }
                    waited => waited,
                }
            }
            None => (Some(child.wait()?), false),
        };

        for reader in readers {
            let _ = reader.join();
        }

        let bytes = std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner));

        Ok(CommandOutput {
            output: String::from_utf8_lossy(&bytes).into_owned(),
            exit_code: status.and_then(|s| s.code()),
            timed_out,
        })
    }
}

/// Copy everything from `stream` into the shared buffer as it arrives.
fn drain<R>(mut stream: R, buffer: Arc<Mutex<Vec<u8>>>, done: Sender<()>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let _done = done;
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    })
}

/// Wait for `child`, killing it once `deadline` has passed.
///
/// Returns the exit status (`None` if killed) and whether the deadline hit.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<(Option<ExitStatus>, bool)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((Some(status), false));
        }
        if Instant::now() >= deadline {
            kill_tree(child);
            let _ = child.wait();
            return Ok((None, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// True when every reader finished before `deadline`.
fn drained_by(done: &Receiver<()>, deadline: Instant) -> bool {
    let remaining = deadline.saturating_duration_since(Instant::now());
    matches!(done.recv_timeout(remaining), Err(RecvTimeoutError::Disconnected))
}

/// Kill the child's process group, which outlives the shell itself while
/// any member is still running.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = i32::try_from(child.id()) {
            // SAFETY: plain syscall; the child leads its own process group
            // (see `run`), so `-pid` names exactly that group.
            unsafe {
                libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}

/// Look `program` up on `PATH` unless it already names a file.
fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn run(command: &str, timeout: Option<Duration>) -> CommandOutput {
        let shell = ShellExecutor::new();
        shell
            .run(&CommandSpec {
                command,
                cwd: None,
                env: &[],
                timeout,
            })
            .unwrap()
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let out = run("echo out; echo err 1>&2", None);
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
        assert_eq!(out.exit_code, Some(0));
    }

    #[test]
    fn reports_exit_code() {
        assert_eq!(run("exit 3", None).exit_code, Some(3));
    }

    #[test]
    fn passes_env_and_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let env = vec![("BDEV_EXEC_TEST".to_string(), "present".to_string())];
        let out = ShellExecutor::new()
            .run(&CommandSpec {
                command: "echo $BDEV_EXEC_TEST; pwd",
                cwd: Some(dir.path()),
                env: &env,
                timeout: None,
            })
            .unwrap();
        assert!(out.output.contains("present"));
        let dir_name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(out.output.contains(&dir_name));
    }

    #[test]
    fn deadline_kills_the_child() {
        let started = Instant::now();
        let out = run("echo before; sleep 5", Some(Duration::from_millis(200)));
        assert!(out.timed_out);
        assert_eq!(out.exit_code, None);
        assert!(out.output.contains("before"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn deadline_covers_background_children_holding_the_pipes() {
        let started = Instant::now();
        let out = run("sleep 3 & echo hi", Some(Duration::from_millis(200)));
        assert!(out.timed_out);
        assert!(out.output.contains("hi"));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn finished_step_within_deadline_is_not_timed_out() {
        let out = run("echo quick", Some(Duration::from_secs(5)));
        assert!(!out.timed_out);
        assert_eq!(out.exit_code, Some(0));
    }

    #[test]
    fn resolve_finds_sh() {
        let shell = ShellExecutor::new().resolve().unwrap();
        assert!(shell.program().is_absolute());
    }

    #[test]
    fn resolve_reports_missing_shell() {
        let result = ShellExecutor::with_shell("definitely-not-a-shell-bdev").resolve();
        assert!(matches!(result, Err(BdevError::ShellNotFound(_))));
    }

    #[test]
    fn flag_follows_shell_name() {
        assert_eq!(ShellExecutor::with_shell("/bin/bash").flag, "-c");
        assert_eq!(ShellExecutor::with_shell("pwsh").flag, "-Command");
        assert_eq!(ShellExecutor::with_shell("cmd.exe").flag, "/C");
    }
}
