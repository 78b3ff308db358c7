use crate::errors::*;
use crate::lexer::Token;
use crate::source::Input;

pub fn expect(expected: Token, input: Input) -> Result<Input, ParseError> {
  if expected == input.read() {
    Ok(input.next())
  } else {
    Err(ParseError::expected(
      input.range(),
      format!("'{expected}'"),
      input.read(),
    ))
  }
}

pub fn expect_ident(input: Input) -> Result<(String, Input), ParseError> {
  if let Token::Ident(name) = input.read() {
    Ok((name, input.next()))
  } else {
    Err(ParseError::expected(
      input.range(),
      "identifier",
      input.read(),
    ))
  }
}

/// Like [expect], but a missing closing token is recorded instead of failing the construct.
pub fn expect_closing(expected: Token, input: Input) -> Input {
  match expect(expected, input.clone()) {
    | Ok(input) => input,
    | Err(error) => input.with_error(error),
  }
}

/// Comma separated list that tolerates a trailing comma. `closing` isn't consumed.
pub fn comma0<T, F>(func: &F, closing: &Token, input: Input) -> Result<(Vec<T>, Input), ParseError>
where
  F: Fn(Input) -> Result<(T, Input), ParseError>,
{
  let mut acc: Vec<T> = vec![];
  let mut input = input;

  while &input.read() != closing {
    let (next, rest) = func(input)?;
    acc.push(next);

    match rest.read() {
      | Token::Comma => input = rest.next(),
      | _ => {
        input = rest;
        break;
      },
    }
  }

  Ok((acc, input))
}

pub fn comma1<T, F>(func: &F, input: Input) -> Result<(Vec<T>, Input), ParseError>
where
  F: Fn(Input) -> Result<(T, Input), ParseError>,
{
  let (first, mut input): (T, Input) = func(input)?;
  let mut acc: Vec<T> = vec![first];

  while let Token::Comma = input.read() {
    let (next, rest) = func(input.next())?;

    acc.push(next);
    input = rest;
  }

  Ok((acc, input))
}

pub fn optional<T, F>(func: &F, input: Input) -> (Option<T>, Input)
where
  F: Fn(Input) -> Result<(T, Input), ParseError>,
{
  match func(input.clone()) {
    | Ok((result, input)) => (Some(result), input),
    | Err(_) => (None, input),
  }
}

/// Runs `func` and requires the whole input to be consumed.
pub fn complete<T, F>(func: &F, input: Input) -> Result<(T, Input), ParseError>
where
  F: Fn(Input) -> Result<(T, Input), ParseError>,
{
  let (result, input) = func(input)?;
  let input = input.skip_newlines();

  if input.is_eof() {
    Ok((result, input))
  } else {
    Err(ParseError::UnexpectedToken {
      range: input.range(),
      found: input.read(),
    })
  }
}

// Readers.

/// Skips blank lines and stray semicolons between statements.
pub fn skip_terminators(mut input: Input) -> Input {
  while let Token::Newline | Token::Semicolon = input.read_forced() {
    input = input.next();
  }

  input
}

/// Skips the newlines in front of a continuation keyword such as `else` or `catch`.
pub fn skip_newlines_before(keywords: &[Token], input: Input) -> Input {
  let skipped = input.skip_newlines();

  if keywords.contains(&skipped.read()) {
    skipped
  } else {
    input
  }
}

/// Error recovery: skips to the next newline, `;` or unbalanced `}`. Always consumes at least one
/// token unless already sitting on one of those.
pub fn synchronize(input: Input) -> Input {
  let mut input = input.with_nesting(0);
  let mut depth = 0u32;

  loop {
    match input.read_forced() {
      | Token::Eof => break,
      | Token::Newline | Token::Semicolon if depth == 0 => break,
      | Token::RightBrace if depth == 0 => break,
      | Token::RightBrace => depth -= 1,
      | Token::LeftBrace => depth += 1,
      | _ => {},
    }

    input = input.next();
  }

  input
}
