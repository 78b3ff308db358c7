use std::fmt;

use crate::source::Range;

#[derive(PartialEq, Debug, Clone)]
pub struct SpannedToken {
  pub range: Range,
  /// Raw source text of the token.
  pub lexeme: String,
  pub token: Token,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Token {
  // Terminals.
  LeftParen,
  RightParen,
  LeftBrace,
  RightBrace,
  LeftBracket,
  RightBracket,
  Comma,
  Semicolon,
  Colon,
  Dot,
  Plus,
  Minus,
  Star,
  Slash,
  Percent,
  Caret,
  Assign,
  EqualEqual,
  StrictEqual,
  NotEqual,
  StrictNotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
  AndAnd,
  OrOr,
  Bang,
  FatArrow,
  QueryIsBoolean,
  NegatedIsBoolean,
  Newline,
  Eof,

  // Trivia.
  Whitespace,
  LineComment,
  BlockComment,

  // Non-terminals.
  Ident(String),
  LitNumber(f64),
  LitString(StringLiteral),
  LitDuration(Duration),
  Error(String),

  // Keywords.
  LetKw,
  VarKw,
  ConstKw,
  FuncKw,
  AsyncKw,
  ReturnKw,
  IfKw,
  ElifKw,
  ElseKw,
  WhileKw,
  ForKw,
  ForEachKw,
  InKw,
  BreakKw,
  ContinueKw,
  TryKw,
  CatchKw,
  FinallyKw,
  ThrowKw,
  DisableKw,
  AbleKw,
  TrueKw,
  FalseKw,
  NullKw,
  IsBooleanKw,
}

/// Decoded string literal. Unescaped `{...}` pairs are kept as holes so the parser can turn the
/// literal into a template.
#[derive(PartialEq, Debug, Clone)]
pub struct StringLiteral {
  pub value: String,
  pub pieces: Vec<StringPiece>,
}

impl StringLiteral {
  pub fn plain(value: String) -> Self {
    StringLiteral {
      pieces: vec![StringPiece::Text(value.clone())],
      value,
    }
  }

  pub fn has_holes(&self) -> bool {
    self
      .pieces
      .iter()
      .any(|piece| matches!(piece, StringPiece::Hole(_)))
  }
}

#[derive(PartialEq, Debug, Clone)]
pub enum StringPiece {
  Text(String),
  /// Absolute range of the expression source between the braces.
  Hole(Range),
}

#[derive(PartialEq, Debug, Clone, Copy, Eq, Hash)]
pub enum DurationUnit {
  Milliseconds,
  Seconds,
  Minutes,
  Hours,
}

impl DurationUnit {
  pub fn from_suffix(suffix: &str) -> Option<Self> {
    match suffix {
      | "ms" => Some(DurationUnit::Milliseconds),
      | "s" => Some(DurationUnit::Seconds),
      | "m" => Some(DurationUnit::Minutes),
      | "h" => Some(DurationUnit::Hours),
      | _ => None,
    }
  }

  pub fn factor(&self) -> f64 {
    match self {
      | DurationUnit::Milliseconds => 1.0,
      | DurationUnit::Seconds => 1_000.0,
      | DurationUnit::Minutes => 60_000.0,
      | DurationUnit::Hours => 3_600_000.0,
    }
  }
}

impl fmt::Display for DurationUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let suffix = match self {
      | DurationUnit::Milliseconds => "ms",
      | DurationUnit::Seconds => "s",
      | DurationUnit::Minutes => "m",
      | DurationUnit::Hours => "h",
    };

    write!(f, "{suffix}")
  }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Duration {
  pub value: f64,
  pub unit: DurationUnit,
  pub raw: String,
}

impl Duration {
  pub fn millis(&self) -> f64 {
    self.value * self.unit.factor()
  }
}

/// Looks up the reserved word table. Only full identifier extents are passed in here.
pub fn keyword(ident: &str) -> Option<Token> {
  let token = match ident {
    | "let" => Token::LetKw,
    | "var" => Token::VarKw,
    | "const" => Token::ConstKw,
    | "func" => Token::FuncKw,
    | "async" => Token::AsyncKw,
    | "return" => Token::ReturnKw,
    | "if" => Token::IfKw,
    | "elif" => Token::ElifKw,
    | "else" => Token::ElseKw,
    | "while" => Token::WhileKw,
    | "for" => Token::ForKw,
    | "forEach" => Token::ForEachKw,
    | "in" => Token::InKw,
    | "break" => Token::BreakKw,
    | "continue" => Token::ContinueKw,
    | "try" => Token::TryKw,
    | "catch" => Token::CatchKw,
    | "finally" => Token::FinallyKw,
    | "throw" => Token::ThrowKw,
    | "disable" => Token::DisableKw,
    | "able" => Token::AbleKw,
    | "true" => Token::TrueKw,
    | "false" => Token::FalseKw,
    | "null" => Token::NullKw,
    | "isBoolean" => Token::IsBooleanKw,
    | _ => return None,
  };

  Some(token)
}

impl Token {
  pub fn is_trivia(&self) -> bool {
    matches!(
      self,
      Token::Whitespace | Token::LineComment | Token::BlockComment
    )
  }

  pub fn is_keyword(&self) -> bool {
    matches!(
      self,
      Token::LetKw
        | Token::VarKw
        | Token::ConstKw
        | Token::FuncKw
        | Token::AsyncKw
        | Token::ReturnKw
        | Token::IfKw
        | Token::ElifKw
        | Token::ElseKw
        | Token::WhileKw
        | Token::ForKw
        | Token::ForEachKw
        | Token::InKw
        | Token::BreakKw
        | Token::ContinueKw
        | Token::TryKw
        | Token::CatchKw
        | Token::FinallyKw
        | Token::ThrowKw
        | Token::DisableKw
        | Token::AbleKw
        | Token::TrueKw
        | Token::FalseKw
        | Token::NullKw
        | Token::IsBooleanKw
    )
  }

  /// Tokens that end a statement.
  pub fn is_terminator(&self) -> bool {
    matches!(self, Token::Newline | Token::Semicolon | Token::Eof)
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      | Token::LeftParen => "(",
      | Token::RightParen => ")",
      | Token::LeftBrace => "{",
      | Token::RightBrace => "}",
      | Token::LeftBracket => "[",
      | Token::RightBracket => "]",
      | Token::Comma => ",",
      | Token::Semicolon => ";",
      | Token::Colon => ":",
      | Token::Dot => ".",
      | Token::Plus => "+",
      | Token::Minus => "-",
      | Token::Star => "*",
      | Token::Slash => "/",
      | Token::Percent => "%",
      | Token::Caret => "^",
      | Token::Assign => "=",
      | Token::EqualEqual => "==",
      | Token::StrictEqual => "===",
      | Token::NotEqual => "!=",
      | Token::StrictNotEqual => "!==",
      | Token::Less => "<",
      | Token::LessEqual => "<=",
      | Token::Greater => ">",
      | Token::GreaterEqual => ">=",
      | Token::AndAnd => "&&",
      | Token::OrOr => "||",
      | Token::Bang => "!",
      | Token::FatArrow => "=>",
      | Token::QueryIsBoolean => "?isBoolean",
      | Token::NegatedIsBoolean => "!isBoolean",
      | Token::Newline => "newline",
      | Token::Eof => "end of file",
      | Token::Whitespace => "whitespace",
      | Token::LineComment | Token::BlockComment => "comment",
      | Token::Ident(name) => return write!(f, "{name}"),
      | Token::LitNumber(value) => return write!(f, "{value}"),
      | Token::LitString(literal) => return write!(f, "{:?}", literal.value),
      | Token::LitDuration(duration) => return write!(f, "{}", duration.raw),
      | Token::Error(_) => "invalid token",
      | Token::LetKw => "let",
      | Token::VarKw => "var",
      | Token::ConstKw => "const",
      | Token::FuncKw => "func",
      | Token::AsyncKw => "async",
      | Token::ReturnKw => "return",
      | Token::IfKw => "if",
      | Token::ElifKw => "elif",
      | Token::ElseKw => "else",
      | Token::WhileKw => "while",
      | Token::ForKw => "for",
      | Token::ForEachKw => "forEach",
      | Token::InKw => "in",
      | Token::BreakKw => "break",
      | Token::ContinueKw => "continue",
      | Token::TryKw => "try",
      | Token::CatchKw => "catch",
      | Token::FinallyKw => "finally",
      | Token::ThrowKw => "throw",
      | Token::DisableKw => "disable",
      | Token::AbleKw => "able",
      | Token::TrueKw => "true",
      | Token::FalseKw => "false",
      | Token::NullKw => "null",
      | Token::IsBooleanKw => "isBoolean",
    };

    write!(f, "{text}")
  }
}
