//! Running a chain of external commands connected by anonymous pipes.

use crate::command::{ArgVector, ExitCode, Pipeline};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{PathResolver, build_command, status_code};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};

/// A started pipeline stage: the child process plus the name it was started as.
///
/// The read end of the stage's stdout pipe stays inside `child` until the
/// next stage takes it with [`Stage::take_output`].
struct Stage<'p> {
    name: &'p str,
    child: Child,
}

impl<'p> Stage<'p> {
    /// Hand the read end of this stage's stdout to the next stage.
    fn take_output(&mut self) -> Result<Stdio, ShellError> {
        self.child
            .stdout
            .take()
            .map(Stdio::from)
            .ok_or_else(|| ShellError::Launch {
                command: self.name.to_string(),
                source: io::Error::other("stdout was not captured"),
            })
    }

    fn wait(&mut self) -> Result<ExitStatus, ShellError> {
        self.child.wait().map_err(|source| ShellError::Wait {
            command: self.name.to_string(),
            source,
        })
    }

    /// Kill and reap a stage whose pipeline cannot continue.
    fn abort(mut self) {
        tracing::debug!(command = self.name, pid = self.child.id(), "aborting stage");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Runs pipelines of external commands.
///
/// Stages are started left to right. After stage *i+1* has been started,
/// stage *i* is waited on before stage *i+2* is started, so the executor only
/// ever holds two live children and every stage is joined in source order.
pub struct PipelineExecutor<'a> {
    resolver: &'a dyn PathResolver,
    env: &'a Environment,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(resolver: &'a dyn PathResolver, env: &'a Environment) -> Self {
        Self { resolver, env }
    }

    /// Run `pipeline` with the last stage writing to the interpreter's stdout.
    ///
    /// Returns the exit code of the last stage; upstream statuses are only logged.
    pub fn run(&self, pipeline: &Pipeline) -> Result<ExitCode, ShellError> {
        self.run_with_output(pipeline, Stdio::inherit())
    }

    /// Same as [`PipelineExecutor::run`], but the last stage writes to `output`.
    pub fn run_with_output(&self, pipeline: &Pipeline, output: Stdio) -> Result<ExitCode, ShellError> {
        let stages = pipeline.stages();
        let programs = self.resolve_all(stages)?;
        tracing::debug!(stages = stages.len(), "running pipeline: {}", pipeline);

        let last = stages.len() - 1;
        let mut output = Some(output);
        let mut stdout_for = |index: usize| {
            if index == last {
                output.take().unwrap_or_else(Stdio::inherit)
            } else {
                Stdio::piped()
            }
        };

        let mut current = self.start(&stages[0], &programs[0], Stdio::inherit(), stdout_for(0))?;
        for index in 1..stages.len() {
            let input = match current.take_output() {
                Ok(input) => input,
                Err(e) => {
                    current.abort();
                    return Err(e);
                }
            };
            let next = match self.start(&stages[index], &programs[index], input, stdout_for(index)) {
                Ok(next) => next,
                Err(e) => {
                    current.abort();
                    return Err(e);
                }
            };
            match current.wait() {
                Ok(status) => tracing::debug!(command = current.name, %status, "stage finished"),
                Err(e) => {
                    next.abort();
                    current.abort();
                    return Err(e);
                }
            }
            current = next;
        }

        let status = current.wait()?;
        tracing::debug!(command = current.name, %status, "stage finished");
        Ok(status_code(current.name, status))
    }

    fn resolve_all(&self, stages: &[ArgVector]) -> Result<Vec<PathBuf>, ShellError> {
        stages
            .iter()
            .map(|argv| {
                self.resolver
                    .resolve(argv.name(), self.env)
                    .ok_or_else(|| ShellError::NotFound {
                        command: argv.name().to_string(),
                    })
            })
            .collect()
    }

    fn start<'p>(
        &self,
        argv: &'p ArgVector,
        program: &Path,
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<Stage<'p>, ShellError> {
        let mut cmd = build_command(program, argv, self.env);
        cmd.stdin(stdin).stdout(stdout).stderr(Stdio::inherit());
        // `cmd` owns the previous stage's read end; it is closed when `cmd` drops.
        let child = cmd.spawn().map_err(|source| ShellError::Launch {
            command: argv.name().to_string(),
            source,
        })?;
        tracing::debug!(command = argv.name(), pid = child.id(), "started stage");
        Ok(Stage {
            name: argv.name(),
            child,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::SearchPath;
    use crate::lexer::split_into_tokens;
    use crate::parser::split_pipeline;
    use std::fs;
    use std::fs::File;
    use std::time::{Duration, Instant};

    fn pipeline(line: &str) -> Pipeline {
        split_pipeline(split_into_tokens(line).unwrap())
            .unwrap()
            .expect("expected a pipeline")
    }

    fn root_env() -> Environment {
        let mut env = Environment::new();
        env.current_dir = PathBuf::from("/");
        env
    }

    fn output_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pipesh_pipeline_{}_{}", std::process::id(), tag))
    }

    /// Run `line` and return its status plus what the last stage wrote.
    fn run_captured(line: &str, tag: &str) -> (Result<ExitCode, ShellError>, String) {
        let env = root_env();
        let path = output_file(tag);
        let file = File::create(&path).expect("create output file");
        let res = PipelineExecutor::new(&SearchPath, &env).run_with_output(&pipeline(line), Stdio::from(file));
        let out = fs::read_to_string(&path).unwrap_or_default();
        let _ = fs::remove_file(path);
        (res, out)
    }

    #[test]
    fn test_two_stage_data_flow() {
        let (res, out) = run_captured("printf 'hello\\n' | tr a-z A-Z", "two");
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "HELLO\n");
    }

    #[test]
    fn test_three_stage_data_flow() {
        let (res, out) = run_captured(
            "printf 'go 1\\nrust 2\\ngo 3\\n' | grep go | awk '{print $1 $2}'",
            "three",
        );
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "go1\ngo3\n");
    }

    #[test]
    fn test_stage_is_joined_before_the_one_after_next_starts() {
        let log = output_file("order");
        let _ = fs::remove_file(&log);
        let log_path = log.display().to_string();
        let line = format!(
            "sh -c 'echo s0 >> {log}; sleep 0.3; echo e0 >> {log}' \
             | sh -c 'echo s1 >> {log}; cat > /dev/null' \
             | sh -c 'echo s2 >> {log}'",
            log = log_path
        );
        let (res, _) = run_captured(&line, "order_out");
        assert_eq!(res.unwrap(), 0);

        let events = fs::read_to_string(&log).unwrap();
        let _ = fs::remove_file(&log);
        let at = |event: &str| {
            events
                .lines()
                .position(|l| l == event)
                .unwrap_or_else(|| panic!("{} missing from {:?}", event, events))
        };
        assert!(at("s0") < at("e0"));
        assert!(at("e0") < at("s2"), "third stage started before the first was joined: {:?}", events);
    }

    #[test]
    fn test_status_is_last_stage_only() {
        assert_eq!(run_captured("false | true", "ft").0.unwrap(), 0);
        assert_eq!(run_captured("true | false", "tf").0.unwrap(), 1);
        assert_eq!(
            run_captured("sh -c 'exit 3' | sh -c 'exit 5'", "codes").0.unwrap(),
            5
        );
    }

    #[test]
    fn test_upstream_killed_by_sigpipe_is_not_an_error() {
        let (res, out) = run_captured("yes | head -n 3", "yes");
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, "y\ny\ny\n");
    }

    #[test]
    fn test_unresolvable_stage_starts_nothing() {
        let (res, out) = run_captured("printf started | pipesh-no-such-stage | cat", "missing");
        match res {
            Err(ShellError::NotFound { command }) => assert_eq!(command, "pipesh-no-such-stage"),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert_eq!(out, "");
    }

    #[test]
    fn test_launch_failure_kills_running_predecessor() {
        struct OneBroken;
        impl PathResolver for OneBroken {
            fn resolve(&self, name: &str, env: &Environment) -> Option<PathBuf> {
                if name == "ghost" {
                    Some(PathBuf::from("/pipesh/definitely/missing"))
                } else {
                    SearchPath.resolve(name, env)
                }
            }
        }

        let env = root_env();
        let started = Instant::now();
        let res = PipelineExecutor::new(&OneBroken, &env)
            .run_with_output(&pipeline("sleep 30 | ghost"), Stdio::null());
        assert!(matches!(res, Err(ShellError::Launch { ref command, .. }) if command == "ghost"));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_stages_run_in_session_directory() {
        let mut env = Environment::new();
        env.current_dir = std::env::temp_dir();
        let expected = fs::canonicalize(&env.current_dir).unwrap();

        let path = output_file("cwd");
        let file = File::create(&path).unwrap();
        let code = PipelineExecutor::new(&SearchPath, &env)
            .run_with_output(&pipeline("pwd -P | cat"), Stdio::from(file))
            .unwrap();
        let out = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(path);

        assert_eq!(code, 0);
        assert_eq!(out.trim_end(), expected.to_string_lossy());
    }
}
