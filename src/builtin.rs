use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::PathResolver;
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{self, Write};

/// What a builtin may touch while it runs: the session and the resolver
/// (`type` needs the latter to report where a program lives).
pub struct BuiltinContext<'a> {
    pub env: &'a mut Environment,
    pub resolver: &'a dyn PathResolver,
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command, writing its output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode>;
}

/// The builtin handlers, looked up by name before any `PATH` search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Echo,
    Type,
    Pwd,
    Cd,
    LastResult,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Exit,
        Builtin::Echo,
        Builtin::Type,
        Builtin::Pwd,
        Builtin::Cd,
        Builtin::LastResult,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => Exit::name(),
            Builtin::Echo => Echo::name(),
            Builtin::Type => Type::name(),
            Builtin::Pwd => Pwd::name(),
            Builtin::Cd => Cd::name(),
            Builtin::LastResult => LastResult::name(),
        }
    }

    /// Find the builtin called `name`.
    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Parse `args` for this builtin and run it.
    ///
    /// Runtime failures are printed to `stdout` and reported as status 1;
    /// arguments the builtin does not accept give [`ShellError::Usage`].
    pub fn execute(
        self,
        args: &[&str],
        stdout: &mut dyn Write,
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<ExitCode, ShellError> {
        match self {
            Builtin::Exit => run_parsed::<Exit>(args, stdout, ctx),
            Builtin::Echo => run_parsed::<Echo>(args, stdout, ctx),
            Builtin::Type => run_parsed::<Type>(args, stdout, ctx),
            Builtin::Pwd => run_parsed::<Pwd>(args, stdout, ctx),
            Builtin::Cd => run_parsed::<Cd>(args, stdout, ctx),
            Builtin::LastResult => run_parsed::<LastResult>(args, stdout, ctx),
        }
    }
}

fn run_parsed<T: BuiltinCommand>(
    args: &[&str],
    stdout: &mut dyn Write,
    ctx: &mut BuiltinContext<'_>,
) -> Result<ExitCode, ShellError> {
    // Builtins take no options; `--` keeps `help` and `-x` words as operands.
    let operands: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
    match T::from_args(&[T::name()], &operands) {
        Ok(cmd) => match cmd.execute(stdout, ctx) {
            Ok(code) => Ok(code),
            Err(e) => {
                writeln!(stdout, "{:#}", e)?;
                Ok(1)
            }
        },
        Err(EarlyExit { output, .. }) => Err(ShellError::Usage {
            command: T::name().to_string(),
            message: output,
        }),
    }
}

#[derive(FromArgs)]
/// Exit the shell with the given status (0 when omitted).
pub struct Exit {
    #[argh(positional)]
    /// integer exit status; anything after it is ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        let code = match self.args.first() {
            None => 0,
            Some(arg) => arg
                .parse::<ExitCode>()
                .map_err(|_| anyhow!("exit: invalid argument \"{}\"", arg))?,
        };
        ctx.env.request_exit(code);
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Write the arguments to standard output, separated by spaces and followed
/// by a newline.
pub struct Echo {
    #[argh(positional)]
    /// values to print as-is.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Write, _ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Tell whether a name is a shell builtin or which executable it runs.
pub struct Type {
    #[argh(positional)]
    /// command name to look up.
    pub name: String,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        if Builtin::lookup(&self.name).is_some() {
            writeln!(stdout, "{} is a shell builtin", self.name)?;
            return Ok(0);
        }
        match ctx.resolver.resolve(&self.name, ctx.env) {
            Some(path) => {
                writeln!(stdout, "{} is {}", self.name, path.display())?;
                Ok(0)
            }
            None => {
                writeln!(stdout, "{}: not found", self.name)?;
                Ok(1)
            }
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        writeln!(stdout, "{}", ctx.env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute, relative to the current directory or starting with ~.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        let raw = match self.args.into_iter().next() {
            Some(t) if !t.is_empty() => t,
            _ => "~".to_string(),
        };
        let Some(expanded) = ctx.env.expand_home(&raw) else {
            bail!("cd: Couldn't expand ~, $HOME not set?");
        };

        let new_dir = ctx.env.current_dir.join(&expanded);
        match fs::metadata(&new_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => bail!("cd: {}: Not a directory", expanded.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                bail!("cd: {}: No such file or directory", expanded.display())
            }
            Err(e) => bail!("cd: {}: {}", expanded.display(), e),
        }

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        ctx.env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the exit status of the last command or pipeline.
pub struct LastResult {}

impl BuiltinCommand for LastResult {
    fn name() -> &'static str {
        "lr"
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        writeln!(stdout, "{}", ctx.env.last_status)?;
        Ok(ctx.env.last_status)
    }
}
