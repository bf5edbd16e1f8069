use crate::command::ExitCode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Per-session interpreter state.
///
/// The environment contains:
/// - `vars`: environment variables visible to executed commands and used for
///   `PATH` lookup and `~` expansion.
/// - `current_dir`: the working directory for command execution.
/// - `last_status`: the exit status of the most recently completed command or
///   pipeline, as reported by the `lr` builtin.
/// - `should_exit` / `exit_status`: set by the `exit` builtin so the loop can stop.
///
/// The whole value is handed explicitly to each unit of work; there is no
/// process-global mutable state.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// Status of the last completed foreground unit of work.
    pub last_status: ExitCode,
    /// When set to true, indicates that an interactive loop should exit.
    pub should_exit: bool,
    /// Status to terminate with once `should_exit` is set.
    pub exit_status: ExitCode,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(vars, current_dir)
    }

    /// Build an environment from explicit variables, without reading the process state.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            last_status: 0,
            should_exit: false,
            exit_status: 0,
        }
    }

    /// Get the value of a variable of this session.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a variable of this session.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Value of `HOME`, if set to something non-empty.
    pub fn home(&self) -> Option<&str> {
        self.get_var("HOME").filter(|h| !h.is_empty())
    }

    /// Expand a leading `~` (alone or followed by `/`) to `HOME`.
    ///
    /// Other paths, including `~user`, are returned unchanged. Returns `None`
    /// only when expansion is needed and `HOME` is not set.
    pub fn expand_home(&self, path: &str) -> Option<PathBuf> {
        if path == "~" {
            return self.home().map(PathBuf::from);
        }
        match path.strip_prefix("~/") {
            Some(rest) => self.home().map(|home| Path::new(home).join(rest)),
            None => Some(PathBuf::from(path)),
        }
    }

    /// Render `current_dir` with the home directory collapsed to `~`.
    pub fn unexpanded_cwd(&self) -> String {
        if let Some(home) = self.home() {
            if let Ok(rest) = self.current_dir.strip_prefix(home) {
                if rest.as_os_str().is_empty() {
                    return "~".to_string();
                }
                return format!("~/{}", rest.display());
            }
        }
        self.current_dir.display().to_string()
    }

    /// Ask the interactive loop to stop with `status`.
    pub fn request_exit(&mut self, status: ExitCode) {
        self.should_exit = true;
        self.exit_status = status;
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
