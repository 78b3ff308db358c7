use super::combinators;
use super::expression;
use super::lookahead::TemplateContext;
use crate::ast::*;
use crate::errors::*;
use crate::lexer::{matching_brace, unescape, Lexer, StringLiteral, StringPiece};
use crate::source::{Input, Position, Range, SourceCode};

/// Parses the expression between the braces of an interpolation hole.
fn parse_hole(source: &SourceCode, range: Range) -> Result<(Expression, Vec<ParseError>), ParseError> {
  let output = Lexer::region(source, range).read_all();
  let errors = output.errors.into_iter().map(ParseError::from).collect();
  let input = Input::with_errors(source.clone(), output.tokens, errors).enter_group();

  let (expression, input) = combinators::complete(&expression::parse_expression, input)?;

  Ok((expression, input.errors()))
}

/// Collects template parts, folding adjacent text together.
#[derive(Default)]
struct Parts {
  parts: Vec<TemplatePart>,
  text: String,
  errors: Vec<ParseError>,
}

impl Parts {
  fn push_text(&mut self, text: &str) {
    self.text.push_str(text);
  }

  fn push_hole(&mut self, source: &SourceCode, range: Range, raw: &str) {
    if source.slice(range).trim().is_empty() {
      self.push_text(raw);
      return;
    }

    match parse_hole(source, range) {
      | Ok((expression, errors)) => {
        self.flush();
        self.parts.push(TemplatePart::Expression(expression));
        self.errors.extend(errors);
      },
      | Err(error) => {
        self.errors.push(error);
        self.push_text(raw);
      },
    }
  }

  fn flush(&mut self) {
    if !self.text.is_empty() {
      self
        .parts
        .push(TemplatePart::Text(std::mem::take(&mut self.text)));
    }
  }

  fn finish(mut self, range: Range) -> (Expression, Vec<ParseError>) {
    self.flush();

    let has_holes = self
      .parts
      .iter()
      .any(|part| matches!(part, TemplatePart::Expression(_)));

    let expression = if has_holes {
      Expression::Template(range, self.parts)
    } else {
      let text = self
        .parts
        .into_iter()
        .map(|part| match part {
          | TemplatePart::Text(text) => text,
          | TemplatePart::Expression(_) => String::new(),
        })
        .collect();

      Expression::String(range, text)
    };

    (expression, self.errors)
  }
}

/// Turns a quoted literal into a plain string or, when it has holes, a template.
pub fn string_literal(source: &SourceCode, literal: StringLiteral, range: Range) -> (Expression, Vec<ParseError>) {
  if !literal.has_holes() {
    return (Expression::String(range, literal.value), vec![]);
  }

  let mut parts = Parts::default();

  for piece in literal.pieces {
    match piece {
      | StringPiece::Text(text) => parts.push_text(&text),
      | StringPiece::Hole(hole) => {
        let raw = format!("{{{}}}", source.slice(hole));
        parts.push_hole(source, hole, &raw);
      },
    }
  }

  parts.finish(range)
}

/// Offset where a bare template starting at `start` ends.
fn scan_end(text: &str, start: usize, context: TemplateContext) -> usize {
  let mut depth = 0u32;
  let mut offset = start;

  while let Some(ch) = text.get(offset..).and_then(|rest| rest.chars().next()) {
    match ch {
      | '\\' => {
        offset += 1;

        if let Some(escaped) = text.get(offset..).and_then(|rest| rest.chars().next()) {
          offset += escaped.len_utf8();
        }

        continue;
      },
      | '{' => {
        if let Some(close) = matching_brace(text, offset) {
          offset = close + 1;
          continue;
        }
      },
      | '(' => depth += 1,
      | ')' if depth == 0 => return offset,
      | ')' => depth -= 1,
      | '\n' | ';' | '}' if context == TemplateContext::Line && depth == 0 => return offset,
      | _ => {},
    }

    offset += ch.len_utf8();
  }

  text.len()
}

fn template_parts(source: &SourceCode, range: Range) -> (Expression, Vec<ParseError>) {
  let text = source.slice(range);
  let mut parts = Parts::default();
  let mut offset = 0;

  while let Some(ch) = text.get(offset..).and_then(|rest| rest.chars().next()) {
    match ch {
      | '\\' => {
        offset += 1;

        match text.get(offset..).and_then(|rest| rest.chars().next()) {
          | Some(escaped) => {
            parts.push_text(&unescape(escaped).to_string());
            offset += escaped.len_utf8();
          },
          | None => parts.push_text("\\"),
        }
      },
      | '{' => match matching_brace(text, offset) {
        | Some(close) => {
          let hole_start = range.start.advance(&text[..offset + 1]);
          let hole_end = hole_start.advance(&text[offset + 1..close]);

          parts.push_hole(source, Range::new(hole_start, hole_end), &text[offset..=close]);
          offset = close + 1;
        },
        | None => {
          parts.push_text("{");
          offset += 1;
        },
      },
      | other => {
        parts.push_text(other.encode_utf8(&mut [0; 4]));
        offset += other.len_utf8();
      },
    }
  }

  parts.finish(range)
}

/// Reads unquoted text starting at `start` as a template. Tokens after the template are lexed
/// again, since the original token stream may have misread the text (e.g. an apostrophe taken as
/// a string quote).
pub fn parse_bare_template(input: Input, start: Position, context: TemplateContext) -> (Expression, Input) {
  let source = input.source().clone();
  let text = source.as_str();
  let mut end = scan_end(text, start.offset, context);

  if context == TemplateContext::Line {
    end = start.offset + text[start.offset..end].trim_end().len();
  }

  let range = Range::new(start, start.advance(&text[start.offset..end]));
  let (expression, errors) = template_parts(&source, range);

  let tail = Lexer::starting_at(&source, range.end).read_all();
  let lex_errors = tail.errors.into_iter().map(ParseError::from).collect();

  let input = errors.into_iter().fold(
    input.resume_with(tail.tokens, lex_errors, start.offset),
    |input, error| input.with_error(error),
  );

  (expression, input)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_scan_end() {
    assert_eq!(scan_end("f(a (b) c) d", 2, TemplateContext::Arguments), 9);
    assert_eq!(scan_end("f(a {g(x)}) d", 2, TemplateContext::Arguments), 10);
    assert_eq!(scan_end("f(a \\) b)", 2, TemplateContext::Arguments), 8);
    assert_eq!(scan_end("throw oops\nnext", 6, TemplateContext::Line), 10);
    assert_eq!(scan_end("{ throw oops }", 8, TemplateContext::Line), 13);
    assert_eq!(scan_end("f(never", 2, TemplateContext::Arguments), 7);
  }
}
