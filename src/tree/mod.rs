//! Generic value trees
//!
//! [`Tree`] is the intermediate form of the text path: a closed sum of JSON-like
//! leaves and containers, with every integer widened to `i64` and every float
//! to `f64`. [`TreeCodec`] converts between trees and typed [`Value`]s.
//!
//! Maps keep their entries in insertion order, so the text written for a tree
//! is reproducible.
//!
//! [`Value`]: crate::Value

pub mod codec;

pub use codec::{TreeCodec, CLASS_NAME_KEY};

use std::fmt::{self, Display};

use indexmap::IndexMap;

#[cfg(feature = "serde_impls")]
use serde::{Serialize, Serializer};

use crate::text::{self, Style};

/// JSON-like value tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tree {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Tree>),
    Map(Map),
}

impl Tree {
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Tree::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns a short description of the kind of tree node, for error
    /// reporting.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "bool",
            Tree::Int(_) => "integer",
            Tree::Float(_) => "float",
            Tree::Str(_) => "string",
            Tree::Seq(_) => "sequence",
            Tree::Map(_) => "map",
        }
    }
}

/// Compact text by default, pretty text with `{:#}`.
impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = if f.alternate() {
            Style::Pretty
        } else {
            Style::Compact
        };
        text::write(self, f, style)
    }
}

macro_rules! tree_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Tree {
                #[inline]
                fn from(x: $t) -> Self {
                    Tree::$variant(x.into())
                }
            }
        )*
    };
}

tree_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    String => Str,
    &str => Str,
    Vec<Tree> => Seq,
    Map => Map,
}

/// String-keyed map that iterates in insertion order
///
/// Inserting an existing key replaces its value in place. Two maps are equal
/// only if they hold the same entries in the same order.
#[derive(Debug, Clone, Default)]
pub struct Map {
    entries: IndexMap<String, Tree>,
}

impl Map {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Inserts an entry, returning the value it replaced, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Tree) -> Option<Tree> {
        self.entries.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.entries.get(key)
    }

    /// Removes an entry, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Tree> {
        self.entries.shift_remove(key)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tree)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Into<String>> FromIterator<(K, Tree)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, Tree)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for Map {
    type Item = (String, Tree);
    type IntoIter = indexmap::map::IntoIter<String, Tree>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(feature = "serde_impls")]
impl Serialize for Tree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Int(x) => serializer.serialize_i64(*x),
            Tree::Float(x) => serializer.serialize_f64(*x),
            Tree::Str(s) => serializer.serialize_str(s),
            Tree::Seq(items) => serializer.collect_seq(items),
            Tree::Map(map) => map.serialize(serializer),
        }
    }
}

#[cfg(feature = "serde_impls")]
impl Serialize for Map {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keeps_insertion_order() {
        let mut map = Map::new();
        map.insert("b", Tree::Int(1));
        map.insert("a", Tree::Int(2));
        assert_eq!(map.insert("b", Tree::Int(3)), Some(Tree::Int(1)));
        assert_eq!(map.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(map.get("b"), Some(&Tree::Int(3)));
        assert_eq!(map.remove("b"), Some(Tree::Int(3)));
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a"]);
        assert_eq!(map.remove("b"), None);
    }

    #[test]
    fn equality_follows_order() {
        let ab: Map = [("a", Tree::Int(1)), ("b", Tree::Int(2))].into_iter().collect();
        let ba: Map = [("b", Tree::Int(2)), ("a", Tree::Int(1))].into_iter().collect();
        assert_ne!(ab, ba);
        assert_eq!(ab, ab.clone());

        let last_wins: Map = [("k", Tree::Int(1)), ("j", Tree::Null), ("k", Tree::Int(2))]
            .into_iter()
            .collect();
        assert_eq!(last_wins.keys().collect::<Vec<_>>(), ["k", "j"]);
        assert_eq!(last_wins.get("k"), Some(&Tree::Int(2)));
    }

    #[test]
    fn display() {
        let tree = Tree::Map(
            [("k", Tree::from("v")), ("n", Tree::Seq(vec![1.into(), Tree::Null]))]
                .into_iter()
                .collect(),
        );
        assert_eq!(tree.to_string(), r#"{"k":"v","n":[1,null]}"#);
        assert_eq!(format!("{tree:#}"), "{\n\t\"k\": \"v\",\n\t\"n\": [\n\t\t1,\n\t\tnull\n\t]\n}");
    }

    #[cfg(feature = "serde_impls")]
    #[test]
    fn serialize_matches_text() {
        let tree = Tree::Map(
            [
                ("className", Tree::from("Point")),
                ("x", Tree::Int(3)),
                ("y", Tree::Int(-7)),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(serde_json::to_string(&tree).unwrap(), tree.to_string());
    }
}
