use std::fmt::{Debug, Display};

/// Offset into the source, counted in characters (not bytes) so that
/// columns line up for full-width text.
pub type Cursor1 = usize;

/// A resolved source position, 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor2 {
    pub line: usize,
    pub column: usize,
}

impl Display for Cursor2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Span {
    pub start: Cursor1,
    pub end: Cursor1,
}

impl Span {
    pub fn new(start: Cursor1, end: Cursor1) -> Span {
        Span { start, end }
    }
    pub fn dummy() -> Span {
        Span::new(0, 0)
    }
    pub fn join(self, other: Span) -> Span {
        Span { start: self.start.min(other.start), end: self.end.max(other.end) }
    }
    pub fn make<T>(self, inner: T) -> Sp<T> {
        Sp { inner, span: self }
    }
}

/// A spanned payload.
#[derive(Clone, PartialEq)]
pub struct Sp<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Sp<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sp<U> {
        Sp { inner: f(self.inner), span: self.span }
    }
}

impl<T: Debug> Debug for Sp<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} @ {}..{}", self.inner, self.span.start, self.span.end)
    }
}

/// Per-file line table; translates character offsets into line/column
/// pairs on demand.
#[derive(Clone, Debug)]
pub struct FileInfo {
    newlines: Vec<usize>,
    name: String,
}

impl FileInfo {
    pub fn new(s: &str, name: impl Into<String>) -> Self {
        let mut newlines = vec![0];
        for (i, c) in s.chars().enumerate() {
            if c == '\n' {
                newlines.push(i + 1);
            }
        }
        FileInfo { newlines, name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Binary search over the line-start table.
    pub fn trans(&self, offset: Cursor1) -> Cursor2 {
        let idx = {
            let mut l = 0;
            let mut r = self.newlines.len();
            while l < r {
                let mid = l + (r - l) / 2;
                if self.newlines[mid] <= offset {
                    l = mid + 1;
                } else {
                    r = mid;
                }
            }
            l - 1
        };
        Cursor2 { line: idx + 1, column: offset - self.newlines[idx] + 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_offsets_across_lines() {
        let info = FileInfo::new("ab\ncd\n", "test");
        assert_eq!(info.trans(0), Cursor2 { line: 1, column: 1 });
        assert_eq!(info.trans(1), Cursor2 { line: 1, column: 2 });
        assert_eq!(info.trans(3), Cursor2 { line: 2, column: 1 });
        assert_eq!(info.trans(4), Cursor2 { line: 2, column: 2 });
    }

    #[test]
    fn counts_full_width_characters_once() {
        let info = FileInfo::new("あい\nうえ", "test");
        assert_eq!(info.trans(3), Cursor2 { line: 2, column: 1 });
    }
}
