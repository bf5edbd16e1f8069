use crate::builtin::{Builtin, BuiltinContext};
use crate::command::{ArgVector, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{self, PathResolver, SearchPath};
use crate::io_adapters::{Input, LineReader};
use crate::lexer;
use crate::parser;
use crate::pipeline::PipelineExecutor;
use crate::prompt;
use std::io::Write;

/// A minimal shell-like interpreter that can execute builtins, external
/// commands and pipelines of external commands.
///
/// The interpreter owns the session [`Environment`], including the status of
/// the last completed line, and a [`PathResolver`] used for every command that
/// is not a builtin.
///
/// Example
/// ```
/// use pipesh::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let code = sh.process_line("echo hello world", &mut out, &mut std::io::sink());
/// assert_eq!(code, 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    resolver: Box<dyn PathResolver>,
}

impl Interpreter {
    /// Create a new interpreter with a custom session and resolver.
    pub fn new(env: Environment, resolver: Box<dyn PathResolver>) -> Self {
        Self { env, resolver }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Status of the most recently completed line.
    pub fn last_status(&self) -> ExitCode {
        self.env.last_status
    }

    /// Run one input line and record its status as the last result.
    ///
    /// Builtin output goes to `stdout`; shell diagnostics go to `stderr`.
    /// External commands always use the process's own streams. A blank line
    /// leaves the last result untouched.
    pub fn process_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> ExitCode {
        match self.execute_line(line, stdout) {
            Ok(Some(code)) => self.env.last_status = code,
            Ok(None) => {}
            Err(e) => {
                tracing::debug!("line failed: {:?}", e);
                let _ = writeln!(stderr, "{}", e);
                self.env.last_status = 1;
            }
        }
        let _ = stdout.flush();
        self.env.last_status
    }

    /// Tokenize, split and run `line`. `Ok(None)` means there was nothing to run.
    fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
    ) -> Result<Option<ExitCode>, ShellError> {
        let tokens = lexer::split_into_tokens(line)?;
        tracing::debug!("tokens: {:?}", tokens);
        let Some(pipeline) = parser::split_pipeline(tokens)? else {
            return Ok(None);
        };

        let code = match pipeline.as_single() {
            Some(argv) => self.run_single(argv, stdout)?,
            None => {
                stdout.flush()?;
                PipelineExecutor::new(self.resolver.as_ref(), &self.env).run(&pipeline)?
            }
        };
        Ok(Some(code))
    }

    fn run_single(&mut self, argv: &ArgVector, stdout: &mut dyn Write) -> Result<ExitCode, ShellError> {
        if let Some(builtin) = Builtin::lookup(argv.name()) {
            let args: Vec<&str> = argv.args().iter().map(String::as_str).collect();
            let mut ctx = BuiltinContext {
                env: &mut self.env,
                resolver: self.resolver.as_ref(),
            };
            return builtin.execute(&args, stdout, &mut ctx);
        }
        stdout.flush()?;
        external::run_foreground(self.resolver.as_ref(), argv, &self.env)
    }

    /// Read-eval-print loop over `input`.
    ///
    /// Returns the status the interpreter should terminate with: 0 at end of
    /// input, or the code given to `exit`.
    pub fn repl(&mut self, input: &mut dyn LineReader) -> anyhow::Result<ExitCode> {
        let mut stdout = std::io::stdout();
        let mut stderr = std::io::stderr();
        loop {
            let line = match input.read_line(&prompt::render(&self.env))? {
                Input::Line(line) => line,
                Input::Interrupted => continue,
                Input::Eof => return Ok(0),
            };
            self.process_line(&line, &mut stdout, &mut stderr);
            if self.env.should_exit {
                return Ok(self.env.exit_status);
            }
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter over the current process environment that finds
    /// programs on `PATH`.
    fn default() -> Self {
        Self::new(Environment::new(), Box::new(SearchPath))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::tests::lock_current_dir;
    use crate::io_adapters::StreamReader;
    use std::collections::HashMap;
    use std::fs;
    use std::io::Cursor;
    use std::path::PathBuf;

    /// Interpreter pinned to `/` so tests that move the process cwd do not interfere.
    fn shell() -> Interpreter {
        let mut env = Environment::new();
        env.current_dir = PathBuf::from("/");
        Interpreter::new(env, Box::new(SearchPath))
    }

    /// Run `line`, returning (status, stdout, stderr).
    fn run(sh: &mut Interpreter, line: &str) -> (ExitCode, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = sh.process_line(line, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_blank_line_keeps_last_result() {
        let mut sh = shell();
        run(&mut sh, "exit nope");
        assert_eq!(sh.last_status(), 1);
        let (code, out, err) = run(&mut sh, "  \t\r\n");
        assert_eq!((code, out.as_str(), err.as_str()), (1, "", ""));
    }

    #[test]
    fn test_builtin_output_and_status() {
        let mut sh = shell();
        let (code, out, err) = run(&mut sh, "echo 'a b' \"c d\"\n");
        assert_eq!(code, 0);
        assert_eq!(out, "a b \"c d\"\n");
        assert_eq!(err, "");
    }

    #[test]
    fn test_last_result_builtin() {
        let mut sh = shell();
        run(&mut sh, "sh -c 'exit 4'");
        let (code, out, _) = run(&mut sh, "lr");
        assert_eq!(code, 4);
        assert_eq!(out, "4\n");
        // querying does not change it
        let (_, out, _) = run(&mut sh, "lr");
        assert_eq!(out, "4\n");
    }

    #[test]
    fn test_command_not_found() {
        let _lock = lock_current_dir();
        let mut sh = Interpreter::default();
        let cwd = sh.env().current_dir.clone();
        let (code, out, err) = run(&mut sh, "pipesh-no-such-command --flag");
        assert_eq!(code, 1);
        assert_eq!(out, "");
        assert_eq!(err, "pipesh-no-such-command: command not found\n");
        assert_eq!(sh.env().current_dir, cwd);
        assert!(!sh.env().should_exit);
    }

    #[test]
    fn test_unterminated_quote_is_reported() {
        let mut sh = shell();
        let (code, _, err) = run(&mut sh, "echo 'oops");
        assert_eq!(code, 1);
        assert_eq!(err, "unterminated quote ' at position 5\n");
    }

    #[test]
    fn test_malformed_pipeline_is_reported() {
        let mut sh = shell();
        let (code, _, err) = run(&mut sh, "ls | | wc");
        assert_eq!(code, 1);
        assert!(err.starts_with("syntax error"), "got {:?}", err);
    }

    #[test]
    fn test_usage_error_sets_one() {
        let mut sh = shell();
        let (code, _, err) = run(&mut sh, "type");
        assert_eq!(code, 1);
        assert!(err.starts_with("type: "), "got {:?}", err);
    }

    #[test]
    fn test_builtin_operands_are_never_flags() {
        let mut sh = shell();
        assert_eq!(run(&mut sh, "echo help"), (0, "help\n".to_string(), String::new()));
        assert_eq!(run(&mut sh, "echo -e hi"), (0, "-e hi\n".to_string(), String::new()));
        assert_eq!(run(&mut sh, "echo -5"), (0, "-5\n".to_string(), String::new()));

        let (code, out, _) = run(&mut sh, "exit help");
        assert_eq!(code, 1);
        assert_eq!(out, "exit: invalid argument \"help\"\n");
        assert!(!sh.env().should_exit);

        assert_eq!(run(&mut sh, "exit -1").0, -1);
        assert!(sh.env().should_exit);
        assert_eq!(sh.env().exit_status, -1);
    }

    #[test]
    fn test_external_and_pipeline_status() {
        let mut sh = shell();
        assert_eq!(run(&mut sh, "false").0, 1);
        assert_eq!(run(&mut sh, "true").0, 0);
        assert_eq!(run(&mut sh, "true | sh -c 'exit 9'").0, 9);
        assert_eq!(run(&mut sh, "sh -c 'exit 9' | true").0, 0);
    }

    #[test]
    fn test_pipeline_with_missing_stage() {
        let mut sh = shell();
        let (code, _, err) = run(&mut sh, "true | pipesh-no-such-stage");
        assert_eq!(code, 1);
        assert_eq!(err, "pipesh-no-such-stage: command not found\n");
    }

    #[test]
    fn test_builtins_are_not_pipeline_stages() {
        let mut vars = HashMap::new();
        vars.insert("PATH".to_string(), "/pipesh/empty/path".to_string());
        let mut sh = Interpreter::new(
            Environment::with_vars(vars, std::env::current_dir().unwrap()),
            Box::new(SearchPath),
        );
        let (code, _, err) = run(&mut sh, "lr | lr");
        assert_eq!(code, 1);
        assert_eq!(err, "lr: command not found\n");
    }

    #[test]
    fn test_cd_nonexistent_keeps_directory() {
        let _lock = lock_current_dir();
        let mut sh = Interpreter::default();
        let before = std::env::current_dir().unwrap();
        let (code, out, _) = run(&mut sh, "cd /pipesh/does/not/exist");
        assert_eq!(code, 1);
        assert_eq!(out, "cd: /pipesh/does/not/exist: No such file or directory\n");
        assert_eq!(std::env::current_dir().unwrap(), before);
        assert_eq!(sh.env().current_dir, before);
    }

    #[test]
    fn test_cd_then_external_runs_in_new_directory() {
        let _lock = lock_current_dir();
        let orig = std::env::current_dir().unwrap();
        let temp = std::env::temp_dir().join(format!("pipesh_interp_cd_{}", std::process::id()));
        fs::create_dir_all(&temp).unwrap();
        let canonical = fs::canonicalize(&temp).unwrap();

        let mut sh = Interpreter::default();
        let target = canonical.to_string_lossy().to_string();
        assert_eq!(run(&mut sh, &format!("cd '{}'", target)).0, 0);
        let (_, out, _) = run(&mut sh, "pwd");
        assert_eq!(out, format!("{}\n", target));
        assert_eq!(run(&mut sh, "sh -c 'touch created-here'").0, 0);
        assert!(canonical.join("created-here").exists());

        std::env::set_current_dir(orig).expect("failed to restore cwd");
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_repl_stops_at_eof_with_zero() {
        let mut sh = Interpreter::new(
            Environment::with_vars(HashMap::new(), PathBuf::from("/")),
            Box::new(SearchPath),
        );
        let mut input = StreamReader::new(Cursor::new("exit bad\n\n"), Vec::new());
        assert_eq!(sh.repl(&mut input).unwrap(), 0);
        assert_eq!(sh.last_status(), 1);
    }

    #[test]
    fn test_repl_exit_code() {
        let mut sh = Interpreter::new(
            Environment::with_vars(HashMap::new(), PathBuf::from("/")),
            Box::new(SearchPath),
        );
        let mut input = StreamReader::new(Cursor::new("lr\nexit 3\necho unreachable\n"), Vec::new());
        assert_eq!(sh.repl(&mut input).unwrap(), 3);

        let prompts = String::from_utf8(input.into_prompt_out()).unwrap();
        assert_eq!(prompts.matches("]$ ").count(), 2);
    }

    #[test]
    fn test_custom_resolver_is_used() {
        struct Nothing;
        impl PathResolver for Nothing {
            fn resolve(&self, _name: &str, _env: &Environment) -> Option<PathBuf> {
                None
            }
        }
        let mut sh = Interpreter::new(Environment::new(), Box::new(Nothing));
        let (code, _, err) = run(&mut sh, "sh -c true");
        assert_eq!(code, 1);
        assert_eq!(err, "sh: command not found\n");
        let (_, out, _) = run(&mut sh, "type sh");
        assert_eq!(out, "sh: not found\n");
    }
}
