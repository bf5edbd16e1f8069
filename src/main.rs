use anyhow::Context;
use argh::FromArgs;
use pipesh::Interpreter;
use pipesh::io_adapters::{EditorReader, LineReader, StreamReader};
use pipesh::logger;
use std::io::IsTerminal;

#[derive(FromArgs)]
/// A small interactive command interpreter with pipelines.
struct Options {
    /// run a single command line and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// log verbosity: off, error, warn, info, debug or trace (default: $PIPESH_LOG, else warn)
    #[argh(option)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();
    logger::init(logger::filter(options.log_level.as_deref())?)?;

    let mut interpreter = Interpreter::default();

    let code = match &options.command {
        Some(line) => {
            let status = interpreter.process_line(
                line,
                &mut std::io::stdout(),
                &mut std::io::stderr(),
            );
            if interpreter.env().should_exit {
                interpreter.env().exit_status
            } else {
                status
            }
        }
        None => {
            let mut reader: Box<dyn LineReader> = if std::io::stdin().is_terminal() {
                Box::new(EditorReader::new().context("failed to open terminal editor")?)
            } else {
                Box::new(StreamReader::new(std::io::stdin().lock(), std::io::stdout()))
            };
            interpreter.repl(reader.as_mut())?
        }
    };

    tracing::debug!(code, "exiting");
    std::process::exit(code);
}
