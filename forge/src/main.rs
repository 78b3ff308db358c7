use std::process::ExitCode;
use std::thread;

use clap::Parser;
use forge::cli::{self, Mode};
use forge::errors::LangError;
use forge::source::SourceCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
pub struct Cli {
  /// File to run. Starts a REPL when omitted.
  #[clap(name = "file")]
  file: Option<String>,
  /// Report diagnostics without running.
  #[clap(long)]
  check: bool,
  /// Print the tokens of the program.
  #[clap(long)]
  tokens: bool,
  /// Print the syntax tree of the program.
  #[clap(long)]
  ast: bool,
  /// Evaluate the given code instead of a file.
  #[clap(short = 'e', long = "eval", value_name = "CODE")]
  eval: Option<String>,
  /// Log pipeline stages. `FORGE_LOG` takes precedence.
  #[clap(short, long)]
  verbose: bool,
}

impl Cli {
  fn mode(&self) -> Mode {
    if self.tokens {
      Mode::Tokens
    } else if self.ast {
      Mode::Ast
    } else if self.check {
      Mode::Check
    } else {
      Mode::Run
    }
  }
}

fn init_tracing(verbose: bool) {
  let fallback = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_env("FORGE_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn run(options: Cli) -> Result<(), LangError> {
  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .map_err(|error| LangError::Io {
      path: "<runtime>".to_string(),
      message: error.to_string(),
    })?;

  let mode = options.mode();

  runtime.block_on(async move {
    match (options.eval, options.file) {
      | (Some(code), _) => cli::execute(&SourceCode::from_string(code, "inline"), mode).await,
      | (None, Some(file)) => cli::read(&file, mode).await,
      | (None, None) => {
        cli::repl().await;
        Ok(())
      },
    }
  })
}

fn main() -> ExitCode {
  let options = Cli::parse();

  init_tracing(options.verbose);

  let worker = thread::Builder::new()
    .name("forge".to_string())
    .stack_size(cli::STACK_SIZE)
    .spawn(move || run(options));

  match worker.map(|handle| handle.join()) {
    | Ok(Ok(Ok(()))) => ExitCode::SUCCESS,
    | Ok(Ok(Err(error))) => {
      error.eprint();
      ExitCode::FAILURE
    },
    | Ok(Err(_)) => ExitCode::FAILURE,
    | Err(error) => {
      eprintln!("couldn't start the interpreter: {error}");
      ExitCode::FAILURE
    },
  }
}
