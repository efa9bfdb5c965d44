//! Character-level text reader

use std::io::{ErrorKind, Read};
use std::str::Chars;

use crate::error::MalformedInput;
use crate::parse::ParseResult;
use crate::tree::{Map, Tree};

/// Pull-model source of characters
pub trait CharSource {
    /// Returns the next character, or `None` at the end of input.
    fn next_char(&mut self) -> ParseResult<Option<char>>;
}

impl CharSource for Chars<'_> {
    #[inline]
    fn next_char(&mut self) -> ParseResult<Option<char>> {
        Ok(self.next())
    }
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    #[inline]
    fn next_char(&mut self) -> ParseResult<Option<char>> {
        (**self).next_char()
    }
}

/// [`CharSource`] decoding UTF-8 from a byte stream, one character at a time
///
/// Never reads past the last byte of the character it returns.
#[derive(Debug)]
pub struct ReadSource<R> {
    inner: R,
}

impl<R: Read> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_byte(&mut self) -> ParseResult<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read> CharSource for ReadSource<R> {
    fn next_char(&mut self) -> ParseResult<Option<char>> {
        let lead = match self.next_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        let width = match lead {
            0x00..=0x7f => return Ok(Some(char::from(lead))),
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Err(MalformedInput::InvalidUtf8),
        };

        let mut buf = [lead, 0, 0, 0];
        for slot in &mut buf[1..width] {
            *slot = self.next_byte()?.ok_or(MalformedInput::InvalidUtf8)?;
        }
        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .map(Some)
            .ok_or(MalformedInput::InvalidUtf8)
    }
}

/// Deepest nesting of objects and arrays accepted by [`Reader`]
pub const MAX_DEPTH: usize = 256;

const LITERALS: [&str; 3] = ["true", "false", "null"];

#[inline]
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

#[inline]
fn is_number_char(c: char) -> bool {
    matches!(c, '0'..='9' | '.' | 'e' | 'E' | '-')
}

/// Recursive-descent reader with one character of lookahead
///
/// The lookahead is only ever filled while reading a number or a literal, so
/// a reader that has just returned a container or a string has consumed
/// nothing past it.
#[derive(Debug)]
pub struct Reader<S> {
    source: S,
    peeked: Option<char>,
    depth: usize,
}

impl<S: CharSource> Reader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            peeked: None,
            depth: 0,
        }
    }

    /// Returns the underlying source. A pending lookahead character is lost.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn next(&mut self) -> ParseResult<Option<char>> {
        match self.peeked.take() {
            Some(c) => Ok(Some(c)),
            None => self.source.next_char(),
        }
    }

    fn peek(&mut self) -> ParseResult<Option<char>> {
        if self.peeked.is_none() {
            self.peeked = self.source.next_char()?;
        }
        Ok(self.peeked)
    }

    fn expect_next(&mut self) -> ParseResult<char> {
        self.next()?.ok_or(MalformedInput::UnexpectedEndOfInput)
    }

    /// Returns the next character that is not whitespace.
    fn next_token(&mut self) -> ParseResult<char> {
        loop {
            let c = self.expect_next()?;
            if !is_space(c) {
                return Ok(c);
            }
        }
    }

    /// Reads one complete value.
    ///
    /// # Errors
    ///
    /// * [`MalformedInput::UnexpectedEndOfInput`] if the source ends first
    /// * [`MalformedInput::UnexpectedCharacter`] if a value starts with a
    ///   character that cannot begin any value
    /// * [`MalformedInput::MissingColon`] and [`MalformedInput::MissingComma`]
    ///   inside objects and arrays
    /// * [`MalformedInput::InvalidLiteral`] and [`MalformedInput::InvalidNumber`]
    /// * [`MalformedInput::NestingTooDeep`] past [`MAX_DEPTH`] nested
    ///   containers
    pub fn read_value(&mut self) -> ParseResult<Tree> {
        let c = self.next_token()?;
        self.value_from(c)
    }

    fn value_from(&mut self, c: char) -> ParseResult<Tree> {
        log::trace!("reading value starting with {c:?}");
        match c {
            '{' | '[' => {
                if self.depth == MAX_DEPTH {
                    return Err(MalformedInput::NestingTooDeep(MAX_DEPTH));
                }
                self.depth += 1;
                let container = if c == '{' { self.map() } else { self.seq() };
                self.depth -= 1;
                container
            }
            '"' => self.string().map(Tree::Str),
            '0'..='9' | '-' | '.' => self.number(c),
            't' | 'f' | 'n' | 'T' | 'F' | 'N' => self.literal(c),
            c => Err(MalformedInput::UnexpectedCharacter(c)),
        }
    }

    fn map(&mut self) -> ParseResult<Tree> {
        let mut map = Map::new();
        let mut c = self.next_token()?;
        if c == '}' {
            return Ok(Tree::Map(map));
        }
        loop {
            if c != '"' {
                return Err(MalformedInput::UnexpectedCharacter(c));
            }
            let key = self.string()?;
            match self.next_token()? {
                ':' => {}
                other => return Err(MalformedInput::MissingColon(other)),
            }
            let value = self.read_value()?;
            map.insert(key, value);
            match self.next_token()? {
                ',' => c = self.next_token()?,
                '}' => return Ok(Tree::Map(map)),
                other => return Err(MalformedInput::MissingComma(other)),
            }
        }
    }

    fn seq(&mut self) -> ParseResult<Tree> {
        let mut items = Vec::new();
        let c = self.next_token()?;
        if c == ']' {
            return Ok(Tree::Seq(items));
        }
        items.push(self.value_from(c)?);
        loop {
            match self.next_token()? {
                ',' => items.push(self.read_value()?),
                ']' => return Ok(Tree::Seq(items)),
                other => return Err(MalformedInput::MissingComma(other)),
            }
        }
    }

    /// Reads the rest of a string whose opening quote has been consumed.
    fn string(&mut self) -> ParseResult<String> {
        let mut buf = String::new();
        loop {
            match self.expect_next()? {
                '"' => return Ok(buf),
                '\\' => buf.push(match self.expect_next()? {
                    'n' => '\n',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                }),
                c => buf.push(c),
            }
        }
    }

    fn number(&mut self, first: char) -> ParseResult<Tree> {
        let mut text = String::from(first);
        while let Some(c) = self.peek()? {
            if !is_number_char(c) {
                break;
            }
            text.push(c);
            self.peeked = None;
        }

        let parsed = if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
            text.parse::<f64>().ok().map(Tree::Float)
        } else {
            text.parse::<i64>().ok().map(Tree::Int)
        };
        parsed.ok_or(MalformedInput::InvalidNumber(text))
    }

    fn literal(&mut self, first: char) -> ParseResult<Tree> {
        let mut word = String::from(first);
        let at_end = loop {
            match self.peek()? {
                Some(c) if c.is_ascii_alphabetic() => {
                    word.push(c);
                    self.peeked = None;
                }
                Some(_) => break false,
                None => break true,
            }
        };

        let lower = word.to_ascii_lowercase();
        match lower.as_str() {
            "true" => Ok(Tree::Bool(true)),
            "false" => Ok(Tree::Bool(false)),
            "null" => Ok(Tree::Null),
            // input ended partway through a literal
            _ if at_end && LITERALS.iter().any(|lit| lit.starts_with(lower.as_str())) => {
                Err(MalformedInput::UnexpectedEndOfInput)
            }
            _ => Err(MalformedInput::InvalidLiteral(word)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::read;

    fn parse(input: &str) -> ParseResult<Tree> {
        read(input.chars())
    }

    #[test]
    fn scalars() {
        assert_eq!(parse("  42").unwrap(), Tree::Int(42));
        assert_eq!(parse("-7").unwrap(), Tree::Int(-7));
        assert_eq!(parse("2.5").unwrap(), Tree::Float(2.5));
        assert_eq!(parse("1e3").unwrap(), Tree::Float(1000.0));
        assert_eq!(parse("-1.5E-2").unwrap(), Tree::Float(-0.015));
        assert_eq!(parse("TRUE").unwrap(), Tree::Bool(true));
        assert_eq!(parse("False").unwrap(), Tree::Bool(false));
        assert_eq!(parse("null").unwrap(), Tree::Null);
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            parse(r#""a\"b\\c\n\t\/""#).unwrap(),
            Tree::Str("a\"b\\c\n\t/".to_owned())
        );
        assert_eq!(parse("\"raw\u{1}ctl\"").unwrap(), Tree::from("raw\u{1}ctl"));
        assert_eq!(parse("\"héllo\"").unwrap(), Tree::from("héllo"));
    }

    #[test]
    fn containers() {
        let tree = parse("{ \"a\" : [1, {\"b\": null}, []],\r\n\t\"c\": {} }").unwrap();
        let map = tree.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "c"]);
        assert_eq!(
            map.get("a"),
            Some(&Tree::Seq(vec![
                Tree::Int(1),
                Tree::Map([("b", Tree::Null)].into_iter().collect()),
                Tree::Seq(vec![]),
            ]))
        );
        assert_eq!(map.get("c"), Some(&Tree::Map(Map::new())));
    }

    #[test]
    fn duplicate_keys_keep_last() {
        let tree = parse(r#"{"k": 1, "k": 2}"#).unwrap();
        assert_eq!(tree.as_map().unwrap().get("k"), Some(&Tree::Int(2)));
    }

    #[test]
    fn errors() {
        assert!(matches!(parse(""), Err(MalformedInput::UnexpectedEndOfInput)));
        assert!(matches!(parse("[1, 2"), Err(MalformedInput::UnexpectedEndOfInput)));
        assert!(matches!(parse("\"open"), Err(MalformedInput::UnexpectedEndOfInput)));
        assert!(matches!(parse("@"), Err(MalformedInput::UnexpectedCharacter('@'))));
        assert!(matches!(parse("{1: 2}"), Err(MalformedInput::UnexpectedCharacter('1'))));
        assert!(matches!(parse("[1,]"), Err(MalformedInput::UnexpectedCharacter(']'))));
        assert!(matches!(parse(r#"{"a" 1}"#), Err(MalformedInput::MissingColon('1'))));
        assert!(matches!(parse(r#"{"a": 1 "b": 2}"#), Err(MalformedInput::MissingComma('"'))));
        assert!(matches!(parse("[1 2]"), Err(MalformedInput::MissingComma('2'))));
        assert!(matches!(parse("nulx"), Err(MalformedInput::InvalidLiteral(w)) if w == "nulx"));
        assert!(matches!(parse("[nul]"), Err(MalformedInput::InvalidLiteral(w)) if w == "nul"));
        assert!(matches!(parse("truth"), Err(MalformedInput::InvalidLiteral(w)) if w == "truth"));
        assert!(matches!(parse("1-2"), Err(MalformedInput::InvalidNumber(t)) if t == "1-2"));
        assert!(matches!(parse("-"), Err(MalformedInput::InvalidNumber(_))));
    }

    #[test]
    fn literal_cut_short() {
        for input in ["tru", "f", "NU", "[true, fals"] {
            assert!(
                matches!(parse(input), Err(MalformedInput::UnexpectedEndOfInput)),
                "{input}"
            );
        }
        let bytes: &[u8] = b"{\"a\": nul";
        assert!(matches!(
            read(ReadSource::new(bytes)),
            Err(MalformedInput::UnexpectedEndOfInput)
        ));
    }

    #[test]
    fn nesting_is_bounded() {
        let deepest = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        let mut tree = parse(&deepest).unwrap();
        let mut levels = 0;
        while let Tree::Seq(mut items) = tree {
            levels += 1;
            match items.pop() {
                Some(item) => tree = item,
                None => break,
            }
        }
        assert_eq!(levels, MAX_DEPTH);

        let too_deep = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse(&too_deep),
            Err(MalformedInput::NestingTooDeep(MAX_DEPTH))
        ));
        assert!(matches!(
            parse(&"{\"k\": [".repeat(1 << 16)),
            Err(MalformedInput::NestingTooDeep(MAX_DEPTH))
        ));
    }

    #[test]
    fn wide_map() {
        const KEYS: usize = 20_000;
        let body = (0..KEYS)
            .map(|i| format!("\"k{i}\": {i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let tree = parse(&format!("{{{body}}}")).unwrap();
        let map = tree.as_map().unwrap();
        assert_eq!(map.len(), KEYS);
        assert_eq!(map.keys().next(), Some("k0"));
        assert_eq!(map.keys().last(), Some("k19999"));
        assert_eq!(map.get("k12345"), Some(&Tree::Int(12345)));
    }

    #[test]
    fn stops_after_first_value() {
        let mut chars = "[1] [2]".chars();
        assert_eq!(read(&mut chars).unwrap(), Tree::Seq(vec![Tree::Int(1)]));
        assert_eq!(chars.as_str(), " [2]");
        assert_eq!(read(&mut chars).unwrap(), Tree::Seq(vec![Tree::Int(2)]));
    }

    #[test]
    fn utf8_stream() {
        let bytes = "[\"ü€𝄞\", 1]".as_bytes();
        let tree = read(ReadSource::new(bytes)).unwrap();
        assert_eq!(
            tree,
            Tree::Seq(vec![Tree::from("ü€𝄞"), Tree::Int(1)])
        );

        let invalid: &[u8] = &[b'"', 0xff, b'"'];
        assert!(matches!(
            read(ReadSource::new(invalid)),
            Err(MalformedInput::InvalidUtf8)
        ));
        let cut: &[u8] = &[b'"', 0xe2, 0x82];
        assert!(matches!(
            read(ReadSource::new(cut)),
            Err(MalformedInput::InvalidUtf8)
        ));
    }
}
