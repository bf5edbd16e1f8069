use crate::command::{ArgVector, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Maps a command name to the executable that should be launched for it.
///
/// The interpreter only asks "resolve(name) -> path | not found"; how the
/// lookup happens is up to the implementation.
pub trait PathResolver {
    /// Returns the executable for `name`, or `None` when it cannot be found.
    fn resolve(&self, name: &str, env: &Environment) -> Option<PathBuf>;
}

/// Resolver that searches the session's `PATH` the way a typical shell does.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchPath;

impl PathResolver for SearchPath {
    fn resolve(&self, name: &str, env: &Environment) -> Option<PathBuf> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        find_command_path(OsStr::new(search_paths), &env.current_dir, Path::new(name))
    }
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Empty path: returns `None`.
/// - Path with a separator (`/bin/sh`, `./foo`, `bin/sh`): checked directly,
///   relative paths against `cwd`.
/// - Single path component: searched in each directory of `search_paths`
///   (PATH), first executable match wins.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, path: &Path) -> Option<PathBuf> {
    let text = path.as_os_str();
    if text.is_empty() {
        return None;
    }
    if path.is_absolute() {
        return find_by_path(path);
    }
    if text.to_string_lossy().contains('/') {
        return find_by_path(&cwd.join(path));
    }
    find_in_path(search_paths, text)
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .find_map(|dir| find_by_path(&dir.join(cmd)))
}

fn find_by_path(path: &Path) -> Option<PathBuf> {
    if is_executable(path) {
        Some(path.to_path_buf())
    } else {
        None
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Build the `Command` for one resolved stage, carrying the session's
/// variables and working directory.
///
/// `argv[0]` is passed as the program so the child sees the name the user typed.
pub(crate) fn build_command(program: &Path, argv: &ArgVector, env: &Environment) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(argv.args())
        .env_clear()
        .envs(env.vars.iter())
        .current_dir(&env.current_dir);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.arg0(argv.name());
    }
    cmd
}

/// Run one external command in the foreground with the interpreter's own
/// standard streams and wait for it.
pub fn run_foreground(
    resolver: &dyn PathResolver,
    argv: &ArgVector,
    env: &Environment,
) -> Result<ExitCode, ShellError> {
    let name = argv.name();
    let program = resolver
        .resolve(name, env)
        .ok_or_else(|| ShellError::NotFound {
            command: name.to_string(),
        })?;
    tracing::debug!("running {} as {}", name, program.display());

    let mut child = build_command(&program, argv, env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| ShellError::Launch {
            command: name.to_string(),
            source,
        })?;
    let status = child.wait().map_err(|source| ShellError::Wait {
        command: name.to_string(),
        source,
    })?;
    Ok(status_code(name, status))
}

/// Exit code of a finished child, or 1 when it was ended by a signal.
pub(crate) fn status_code(name: &str, status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => code,
        None => {
            tracing::warn!("{}: {}", name, abnormal_termination(status));
            1
        }
    }
}

#[cfg(unix)]
fn abnormal_termination(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) if status.core_dumped() => format!("killed by signal {} (core dumped)", signal),
        Some(signal) => format!("killed by signal {}", signal),
        None => "terminated without an exit code".to_string(),
    }
}

#[cfg(not(unix))]
fn abnormal_termination(_status: ExitStatus) -> String {
    "terminated without an exit code".to_string()
}
