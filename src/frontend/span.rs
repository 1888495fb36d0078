// src/frontend/span.rs

/// A source region in the coordinates the external parser reports:
/// first and last line/column (1-indexed, last column exclusive), plus
/// the byte range diagnostics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub first_line: u32,
    pub first_column: u32,
    pub last_line: u32,
    pub last_column: u32,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(
        first_line: u32,
        first_column: u32,
        last_line: u32,
        last_column: u32,
        start: usize,
        end: usize,
    ) -> Self {
        Self {
            first_line,
            first_column,
            last_line,
            last_column,
            start,
            end,
        }
    }

    /// Span of a token that sits entirely on one line.
    pub fn on_line(line: u32, column: u32, start: usize, len: usize) -> Self {
        Self {
            first_line: line,
            first_column: column,
            last_line: line,
            last_column: column + len as u32,
            start,
            end: start + len,
        }
    }

    /// The smallest span covering both `a` and `b`: the earlier first
    /// position and the later last position, whichever operand each
    /// comes from.
    pub fn merge(a: Span, b: Span) -> Span {
        let (first_line, first_column, start) =
            if (a.first_line, a.first_column) <= (b.first_line, b.first_column) {
                (a.first_line, a.first_column, a.start)
            } else {
                (b.first_line, b.first_column, b.start)
            };
        let (last_line, last_column, end) =
            if (a.last_line, a.last_column) >= (b.last_line, b.last_column) {
                (a.last_line, a.last_column, a.end)
            } else {
                (b.last_line, b.last_column, b.end)
            };
        Span {
            first_line,
            first_column,
            last_line,
            last_column,
            start,
            end,
        }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.end.saturating_sub(span.start)).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_line_computes_last_position() {
        let s = Span::on_line(2, 5, 10, 4);
        assert_eq!(s.first_line, 2);
        assert_eq!(s.last_line, 2);
        assert_eq!(s.last_column, 9);
        assert_eq!(s.end, 14);
    }

    #[test]
    fn merge_takes_outer_positions() {
        let a = Span::on_line(1, 1, 0, 3);
        let b = Span::on_line(3, 2, 8, 4);
        let m = Span::merge(a, b);
        assert_eq!((m.first_line, m.first_column), (1, 1));
        assert_eq!((m.last_line, m.last_column), (3, 6));
        assert_eq!((m.start, m.end), (0, 12));
    }

    #[test]
    fn merge_is_order_insensitive() {
        let a = Span::on_line(1, 4, 3, 2);
        let b = Span::on_line(2, 1, 9, 5);
        assert_eq!(Span::merge(a, b), Span::merge(b, a));
    }

    #[test]
    fn merge_on_one_line_uses_columns() {
        let a = Span::on_line(1, 9, 8, 2);
        let b = Span::on_line(1, 3, 2, 4);
        let m = Span::merge(a, b);
        assert_eq!(m.first_column, 3);
        assert_eq!(m.last_column, 11);
        assert_eq!((m.start, m.end), (2, 10));
    }

    #[test]
    fn span_to_source_span() {
        let s = Span::on_line(1, 5, 4, 5);
        let ms: miette::SourceSpan = s.into();
        assert_eq!(ms.offset(), 4);
        assert_eq!(ms.len(), 5);
    }
}
