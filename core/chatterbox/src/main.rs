mod cli;
mod repl;
mod wiring;


use std::io::{self, IsTerminal};
use std::process;

use cli::{parse_args, print_completion, ParseOutcome};
use common::adapter::StdEnvResolver;
use common::config::SessionDefaults;
use common::error::Error;
use common::ports::outbound::{LogLevel, LogRecord};
use wiring::wire_app;

fn main() {
    let exit_code = match run() {
        Ok(code) => code,
        Err(e) => {
            if e.is_usage() {
                print_usage();
            }
            eprintln!("chatterbox: {}", e);
            e.exit_code()
        }
    };
    process::exit(exit_code);
}

pub fn run() -> Result<i32, Error> {
    let config = match parse_args()? {
        ParseOutcome::Config(c) => c,
        ParseOutcome::GenerateCompletion(shell) => {
            print_completion(shell);
            return Ok(0);
        }
        ParseOutcome::Help(text) => {
            print!("{}", text);
            return Ok(0);
        }
    };

    let mut defaults = SessionDefaults::from_env(&StdEnvResolver)?;
    config.apply_to(&mut defaults)?;
    let app = wire_app(config.verbose, &defaults)?;

    let _ = app.log.log(
        &LogRecord::new(LogLevel::Info, "chatterbox started")
            .layer("cli")
            .kind("lifecycle")
            .field("backend", defaults.selected.as_str())
            .field("http_timeout_secs", defaults.http_timeout.as_secs()),
    );

    let mut controller = app.start_session(&defaults);
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let result = repl::run_repl(&mut controller, stdin.lock(), &mut io::stdout(), interactive);
    controller.end();

    let code = match &result {
        Ok(()) => 0,
        Err(e) => e.exit_code(),
    };
    let _ = app.log.log(
        &LogRecord::new(LogLevel::Info, "chatterbox finished")
            .layer("cli")
            .kind("lifecycle")
            .field("exit_code", code),
    );
    if let Err(ref e) = result {
        let _ = app.log.log(
            &LogRecord::new(LogLevel::Error, e.to_string())
                .layer("cli")
                .kind("error"),
        );
    }
    result.map(|()| 0)
}

fn print_usage() {
    eprintln!("Usage: chatterbox [options]   (see --help)");
}
