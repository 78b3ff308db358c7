use std::rc::Rc;

use super::{runtime_config, Mode};
use crate::errors::{LangError, Wrappable};
use crate::lexer::{tokenize, LexerOptions};
use crate::parser::parse_source;
use crate::runtime::{Runtime, StdHost};
use crate::source::SourceCode;

pub fn load(path: &str) -> Result<SourceCode, LangError> {
  std::fs::read(path)
    .map(|bytes| SourceCode::from_bytes(bytes, path))
    .map_err(|error| LangError::Io {
      path: path.to_string(),
      message: error.to_string(),
    })
}

pub async fn read(path: &str, mode: Mode) -> Result<(), LangError> {
  let source = load(path)?;

  execute(&source, mode).await
}

pub async fn execute(source: &SourceCode, mode: Mode) -> Result<(), LangError> {
  match mode {
    | Mode::Tokens => {
      let output = tokenize(source, LexerOptions::default());

      for token in &output.tokens {
        let start = token.range.start;
        println!("{}:{}\t{:?}\t{:?}", start.line, start.column, token.token, token.lexeme);
      }

      if output.errors.is_empty() {
        Ok(())
      } else {
        Err(LangError::from_list(
          output
            .errors
            .into_iter()
            .map(|error| error.wrap(source))
            .collect(),
        ))
      }
    },
    | Mode::Ast => {
      let program = parse_source(source).into_result(source)?;
      println!("{program:#?}");

      Ok(())
    },
    | Mode::Check => {
      let checked = Runtime::new().check(source)?;

      for diagnostic in &checked.analysis.diagnostics {
        LangError::Analyzer(source.clone(), diagnostic.clone()).eprint();
      }

      let errors = checked.errors(source);

      if errors.is_empty() {
        println!("{}: no errors", source.file_name());
        Ok(())
      } else {
        Err(LangError::List(errors))
      }
    },
    | Mode::Run => {
      let runtime = Runtime::with_host(Rc::new(StdHost::new()), runtime_config());

      runtime.run(source).await.map(|_| ())
    },
  }
}
