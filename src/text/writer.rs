//! Text writer

use std::fmt::{self, Write};

use crate::tree::{Map, Tree};

use super::Style;

/// Writes `tree` as text.
///
/// Map entries holding null are left out entirely; null sequence elements
/// are written as `null`. Floats are written so that they read back as
/// floats (`3.0`, `1e-7`). Non-finite floats have no textual form and are
/// treated as null.
pub fn write<W: Write + ?Sized>(tree: &Tree, out: &mut W, style: Style) -> fmt::Result {
    Writer {
        out,
        style,
        depth: 0,
    }
    .tree(tree)
}

/// Writes `tree` into a fresh `String`.
#[must_use]
pub fn to_string(tree: &Tree, style: Style) -> String {
    let mut buf = String::new();
    // `String` never fails as a `fmt::Write`
    let _ = write(tree, &mut buf, style);
    buf
}

/// Whether a map entry is written at all
fn is_written(value: &Tree) -> bool {
    match value {
        Tree::Null => false,
        Tree::Float(x) => x.is_finite(),
        _ => true,
    }
}

struct Writer<'w, W: ?Sized> {
    out: &'w mut W,
    style: Style,
    depth: usize,
}

impl<W: Write + ?Sized> Writer<'_, W> {
    fn newline(&mut self) -> fmt::Result {
        if self.style == Style::Pretty {
            self.out.write_char('\n')?;
            for _ in 0..self.depth {
                self.out.write_char('\t')?;
            }
        }
        Ok(())
    }

    fn tree(&mut self, tree: &Tree) -> fmt::Result {
        match tree {
            Tree::Null => self.out.write_str("null"),
            Tree::Bool(b) => write!(self.out, "{b}"),
            Tree::Int(x) => write!(self.out, "{x}"),
            Tree::Float(x) if x.is_finite() => write!(self.out, "{x:?}"),
            Tree::Float(x) => {
                log::warn!("non-finite float {x} written as null");
                self.out.write_str("null")
            }
            Tree::Str(s) => self.string(s),
            Tree::Seq(items) => self.seq(items),
            Tree::Map(map) => self.map(map),
        }
    }

    fn seq(&mut self, items: &[Tree]) -> fmt::Result {
        if items.is_empty() {
            return self.out.write_str("[]");
        }
        self.out.write_char('[')?;
        self.depth += 1;
        for (ix, item) in items.iter().enumerate() {
            if ix > 0 {
                self.out.write_char(',')?;
            }
            self.newline()?;
            self.tree(item)?;
        }
        self.depth -= 1;
        self.newline()?;
        self.out.write_char(']')
    }

    fn map(&mut self, map: &Map) -> fmt::Result {
        let mut entries = map.iter().filter(|(_, v)| is_written(v)).peekable();
        if entries.peek().is_none() {
            return self.out.write_str("{}");
        }
        self.out.write_char('{')?;
        self.depth += 1;
        let mut first = true;
        for (key, value) in entries {
            if !first {
                self.out.write_char(',')?;
            }
            first = false;
            self.newline()?;
            self.string(key)?;
            self.out.write_char(':')?;
            if self.style == Style::Pretty {
                self.out.write_char(' ')?;
            }
            self.tree(value)?;
        }
        self.depth -= 1;
        self.newline()?;
        self.out.write_char('}')
    }

    fn string(&mut self, s: &str) -> fmt::Result {
        self.out.write_char('"')?;
        for c in s.chars() {
            match c {
                '"' => self.out.write_str("\\\"")?,
                '\\' => self.out.write_str("\\\\")?,
                '\n' => self.out.write_str("\\n")?,
                '\u{8}' => self.out.write_str("\\b")?,
                '\u{c}' => self.out.write_str("\\f")?,
                '\r' => self.out.write_str("\\r")?,
                '\t' => self.out.write_str("\\t")?,
                c => self.out.write_char(c)?,
            }
        }
        self.out.write_char('"')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::read;

    fn compact(tree: &Tree) -> String {
        to_string(tree, Style::Compact)
    }

    #[test]
    fn floats_stay_floats() {
        assert_eq!(compact(&Tree::Float(3.0)), "3.0");
        assert_eq!(compact(&Tree::Float(1e-7)), "1e-7");
        assert_eq!(compact(&Tree::Float(-0.25)), "-0.25");
        for x in [3.0, 1e-7, 1e300, -0.1, f64::MIN_POSITIVE] {
            assert_eq!(read(compact(&Tree::Float(x)).chars()).unwrap(), Tree::Float(x));
        }
    }

    #[test]
    fn non_finite_floats() {
        assert_eq!(compact(&Tree::Float(f64::NAN)), "null");
        let tree = Tree::Map(
            [("a", Tree::Float(f64::INFINITY)), ("b", Tree::Int(1))]
                .into_iter()
                .collect(),
        );
        assert_eq!(compact(&tree), r#"{"b":1}"#);
    }

    #[test]
    fn null_entries_are_dropped() {
        let tree = Tree::Map(
            [("a", Tree::Null), ("b", Tree::Seq(vec![Tree::Null]))]
                .into_iter()
                .collect(),
        );
        assert_eq!(compact(&tree), r#"{"b":[null]}"#);

        let only_null = Tree::Map([("a", Tree::Null)].into_iter().collect());
        assert_eq!(compact(&only_null), "{}");
        assert_eq!(to_string(&only_null, Style::Pretty), "{}");
    }

    #[test]
    fn escapes_round_trip() {
        let s = "quote\" slash\\ nl\n bs\u{8} ff\u{c} cr\r tab\t";
        let text = compact(&Tree::from(s));
        assert_eq!(text, r#""quote\" slash\\ nl\n bs\b ff\f cr\r tab\t""#);
        assert_eq!(read(text.chars()).unwrap(), Tree::from(s));
    }

    #[test]
    fn pretty_nesting() {
        let tree = Tree::Seq(vec![
            Tree::Map([("k", Tree::Seq(vec![]))].into_iter().collect()),
            Tree::Bool(false),
        ]);
        assert_eq!(
            to_string(&tree, Style::Pretty),
            "[\n\t{\n\t\t\"k\": []\n\t},\n\tfalse\n]"
        );
    }
}
