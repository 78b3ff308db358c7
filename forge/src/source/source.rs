use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A point in the source text. `line` and `column` are 1-based, `offset` is a byte offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
  pub offset: usize,
  pub line: u32,
  pub column: u32,
}

impl Position {
  pub fn new(offset: usize, line: u32, column: u32) -> Self {
    Position {
      offset,
      line,
      column,
    }
  }

  /// The position of the very first character of a file.
  pub fn start() -> Self {
    Position::new(0, 1, 1)
  }

  /// Moves the position past `text`, which must start at `self`.
  pub fn advance(&self, text: &str) -> Position {
    let mut position = *self;

    for ch in text.chars() {
      position.offset += ch.len_utf8();

      if ch == '\n' {
        position.line += 1;
        position.column = 1;
      } else {
        position.column += 1;
      }
    }

    position
  }
}

/// A half-open `[start, end)` region of the source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
  pub start: Position,
  pub end: Position,
}

impl Range {
  pub fn new(start: Position, end: Position) -> Self {
    if start.offset <= end.offset {
      Range { start, end }
    } else {
      Range {
        start: end,
        end: start,
      }
    }
  }

  /// Empty range sitting at the given position.
  pub fn at(position: Position) -> Self {
    Range::new(position, position)
  }

  /// Smallest range covering both `self` and `other`.
  pub fn to(&self, other: Range) -> Range {
    Range::new(self.start.min(other.start), self.end.max(other.end))
  }

  pub fn len(&self) -> usize {
    self.end.offset - self.start.offset
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, offset: usize) -> bool {
    self.start.offset <= offset && offset < self.end.offset
  }

  pub fn offsets(&self) -> std::ops::Range<usize> {
    self.start.offset..self.end.offset
  }
}

impl fmt::Display for Range {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.start.line, self.start.column)
  }
}

/// Source code container to avoid large files duplication.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceCode(pub Arc<SourceContainer>);

/// Internal source code container, used for ergonomics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceContainer {
  /// File path or 'inline'.
  pub source: String,
  /// Source code.
  pub code: String,
}

impl SourceCode {
  /// Creates a [SourceCode] instance wrapping a string.
  pub fn from_string(code: String, path: &str) -> Self {
    SourceCode(Arc::new(SourceContainer {
      code,
      source: path.to_string(),
    }))
  }

  /// Creates a [SourceCode] instance *cloning* a string slice.
  #[allow(clippy::should_implement_trait)]
  pub fn from_str(code: &str) -> Self {
    Self::from_string(code.to_string(), "inline")
  }

  /// Creates a [SourceCode] instance from a vector of bytes.
  ///
  /// NOTE: It uses `String::from_utf8_lossy`.
  pub fn from_bytes(bytes: Vec<u8>, path: &str) -> Self {
    Self::from_string(String::from_utf8_lossy(&bytes).to_string(), path)
  }

  pub fn len(&self) -> usize {
    self.0.code.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns a string slice of the `code`.
  pub fn as_str(&self) -> &str {
    self.0.code.as_str()
  }

  /// Returns the exact text covered by `range`, clamped to the source bounds.
  pub fn slice(&self, range: Range) -> &str {
    let len = self.len();
    let start = range.start.offset.min(len);
    let end = range.end.offset.min(len).max(start);

    self.0.code.get(start..end).unwrap_or_default()
  }

  /// Computes the line and column of a byte offset.
  pub fn position_at(&self, offset: usize) -> Position {
    let offset = offset.min(self.len());
    let mut line = 1;
    let mut column = 1;

    for (index, ch) in self.0.code.char_indices() {
      if index >= offset {
        break;
      }

      if ch == '\n' {
        line += 1;
        column = 1;
      } else {
        column += 1;
      }
    }

    Position::new(offset, line, column)
  }

  /// Position just past the last character.
  pub fn end_position(&self) -> Position {
    self.position_at(self.len())
  }

  /// Returns the file name of source.
  pub fn file_name(&self) -> &str {
    let path = self.0.source.as_str();

    Path::new(path)
      .file_name()
      .and_then(|filename| filename.to_str())
      .unwrap_or(path)
  }

  /// Returns the file path of source.
  pub fn file_path(&self) -> &str {
    self.0.source.as_str()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_position_at() {
    let code = SourceCode::from_str("let a = 1\nlet b = 2");

    assert_eq!(code.position_at(0), Position::new(0, 1, 1));
    assert_eq!(code.position_at(4), Position::new(4, 1, 5));
    assert_eq!(code.position_at(10), Position::new(10, 2, 1));
    assert_eq!(code.end_position(), Position::new(19, 2, 10));
  }

  #[test]
  fn test_slice() {
    let code = SourceCode::from_str("inp(name? >> )");
    let range = Range::new(code.position_at(4), code.position_at(13));

    assert_eq!(code.slice(range), "name? >> ");
    assert_eq!(code.slice(Range::at(code.position_at(100))), "");
  }

  #[test]
  fn test_range_order() {
    let range = Range::new(Position::new(5, 1, 6), Position::new(2, 1, 3));

    assert_eq!(range.start.offset, 2);
    assert_eq!(range.end.offset, 5);
    assert_eq!(range.len(), 3);
  }
}
