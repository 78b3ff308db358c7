use nom::branch::*;
use nom::bytes::complete::*;
use nom::character::complete::*;
use nom::combinator::*;
use nom::multi::*;
use nom::sequence::*;
use nom::IResult;

use super::{DurationUnit, Token};

pub type ParseResult<'a, T> = IResult<&'a str, T>;

// Primitives.

fn identifier_start(input: &str) -> ParseResult<'_, char> {
  satisfy(|ch| ch.is_ascii_alphabetic() || ch == '_')(input)
}

fn identifier_char(input: &str) -> ParseResult<'_, char> {
  satisfy(|ch| ch.is_ascii_alphanumeric() || ch == '_')(input)
}

/// A hyphen only belongs to an identifier when a letter or underscore follows it, so `n-1`
/// still reads as a subtraction.
fn identifier_hyphen(input: &str) -> ParseResult<'_, &str> {
  recognize(pair(char('-'), peek(identifier_start)))(input)
}

/// Succeeds without consuming when the next character cannot continue a word.
pub fn word_boundary(input: &str) -> ParseResult<'_, ()> {
  not(alt((identifier_char, char('-'))))(input)
}

// Non-terminals.

pub fn identifier(input: &str) -> ParseResult<'_, &str> {
  recognize(pair(
    identifier_start,
    many0(alt((recognize(identifier_char), identifier_hyphen))),
  ))(input)
}

pub fn number(input: &str) -> ParseResult<'_, &str> {
  alt((
    recognize(pair(digit1, opt(pair(char('.'), digit1)))),
    recognize(pair(char('.'), digit1)),
  ))(input)
}

pub fn duration_unit(input: &str) -> ParseResult<'_, DurationUnit> {
  terminated(
    map_opt(alt((tag("ms"), tag("s"), tag("m"), tag("h"))), DurationUnit::from_suffix),
    word_boundary,
  )(input)
}

/// `?isBoolean` / `!isBoolean` only when `isBoolean` is a complete word.
pub fn boolean_query(input: &str) -> ParseResult<'_, Token> {
  alt((
    value(
      Token::QueryIsBoolean,
      terminated(tag("?isBoolean"), word_boundary),
    ),
    value(
      Token::NegatedIsBoolean,
      terminated(tag("!isBoolean"), word_boundary),
    ),
  ))(input)
}

/// Greedy longest match: three-character operators are tried before two-character ones, which are
/// tried before single characters.
pub fn operator(input: &str) -> ParseResult<'_, Token> {
  alt((long_operator, short_operator, punctuation))(input)
}

fn long_operator(input: &str) -> ParseResult<'_, Token> {
  alt((
    value(Token::StrictEqual, tag("===")),
    value(Token::StrictNotEqual, tag("!==")),
    value(Token::EqualEqual, tag("==")),
    value(Token::NotEqual, tag("!=")),
    value(Token::LessEqual, tag("<=")),
    value(Token::GreaterEqual, tag(">=")),
    value(Token::AndAnd, tag("&&")),
    value(Token::OrOr, tag("||")),
    value(Token::FatArrow, tag("=>")),
  ))(input)
}

fn short_operator(input: &str) -> ParseResult<'_, Token> {
  alt((
    value(Token::Assign, char('=')),
    value(Token::Less, char('<')),
    value(Token::Greater, char('>')),
    value(Token::Bang, char('!')),
    value(Token::Plus, char('+')),
    value(Token::Minus, char('-')),
    value(Token::Star, char('*')),
    value(Token::Slash, char('/')),
    value(Token::Percent, char('%')),
    value(Token::Caret, char('^')),
  ))(input)
}

fn punctuation(input: &str) -> ParseResult<'_, Token> {
  alt((
    value(Token::LeftParen, char('(')),
    value(Token::RightParen, char(')')),
    value(Token::LeftBrace, char('{')),
    value(Token::RightBrace, char('}')),
    value(Token::LeftBracket, char('[')),
    value(Token::RightBracket, char(']')),
    value(Token::Comma, char(',')),
    value(Token::Semicolon, char(';')),
    value(Token::Colon, char(':')),
    value(Token::Dot, char('.')),
  ))(input)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_identifier() {
    assert_eq!(identifier("name rest"), Ok((" rest", "name")));
    assert_eq!(identifier("my-name = 1"), Ok((" = 1", "my-name")));
    assert_eq!(identifier("n-1"), Ok(("-1", "n")));
    assert_eq!(identifier("x- 1"), Ok(("- 1", "x")));
    assert_eq!(identifier("_a1"), Ok(("", "_a1")));
    assert!(identifier("1a").is_err());
  }

  #[test]
  fn test_number() {
    assert_eq!(number("42|"), Ok(("|", "42")));
    assert_eq!(number("4.25|"), Ok(("|", "4.25")));
    assert_eq!(number(".5|"), Ok(("|", ".5")));
    assert_eq!(number("1.x"), Ok((".x", "1")));
  }

  #[test]
  fn test_duration_unit() {
    assert_eq!(duration_unit("ms)"), Ok((")", DurationUnit::Milliseconds)));
    assert_eq!(duration_unit("m "), Ok((" ", DurationUnit::Minutes)));
    assert_eq!(duration_unit("s"), Ok(("", DurationUnit::Seconds)));
    assert!(duration_unit("min").is_err());
    assert!(duration_unit("sec").is_err());
  }

  #[test]
  fn test_operator() {
    assert_eq!(operator("=== "), Ok((" ", Token::StrictEqual)));
    assert_eq!(operator("== "), Ok((" ", Token::EqualEqual)));
    assert_eq!(operator("= "), Ok((" ", Token::Assign)));
    assert_eq!(operator("=> "), Ok((" ", Token::FatArrow)));
    assert_eq!(operator("!== "), Ok((" ", Token::StrictNotEqual)));
    assert_eq!(operator("! "), Ok((" ", Token::Bang)));
    assert!(operator("@").is_err());
  }

  #[test]
  fn test_boolean_query() {
    assert_eq!(boolean_query("?isBoolean.t"), Ok((".t", Token::QueryIsBoolean)));
    assert_eq!(boolean_query("!isBoolean"), Ok(("", Token::NegatedIsBoolean)));
    assert!(boolean_query("?isBooleanish").is_err());
    assert!(boolean_query("!isBoolean-x").is_err());
  }
}
