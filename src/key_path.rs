use log::trace;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Segment under which a scalar is kept once deeper keys share its prefix.
pub const ROOT_SEGMENT: &str = "_root";

const CHR_PREFIX: &str = "CHR";

/// One significant `Key=Value` line of a session file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatEntry {
    pub key: String,
    pub value: String,
}

impl FlatEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        FlatEntry {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A node of the nested session table.
///
/// A key such as `Foo` may carry a value and also prefix deeper keys such as
/// `FooBar`; the scalar then lives under [`ROOT_SEGMENT`] of the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableNode {
    Leaf(String),
    Mapping(Mapping),
}

impl TableNode {
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            TableNode::Leaf(value) => Some(value),
            TableNode::Mapping(_) => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            TableNode::Mapping(mapping) => Some(mapping),
            TableNode::Leaf(_) => None,
        }
    }

    /// Walk `path` from this node; `None` as soon as a segment is missing or a
    /// leaf is reached before the path is exhausted.
    pub fn dig(&self, path: &[&str]) -> Option<&TableNode> {
        path.iter()
            .try_fold(self, |node, segment| node.as_mapping()?.get(segment))
    }

    /// Turn a leaf into a mapping holding it under [`ROOT_SEGMENT`].
    fn demote_to_mapping(&mut self) -> &mut Mapping {
        if let TableNode::Leaf(value) = self {
            let mut mapping = Mapping::default();
            mapping.insert(ROOT_SEGMENT.to_string(), TableNode::Leaf(std::mem::take(value)));
            *self = TableNode::Mapping(mapping);
        }
        match self {
            TableNode::Mapping(mapping) => mapping,
            TableNode::Leaf(_) => unreachable!("leaf was demoted above"),
        }
    }
}

/// Insertion-ordered segment -> node map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<(String, TableNode)>,
    // segment -> position in `entries`
    index: HashMap<String, usize>,
}

impl Mapping {
    pub fn get(&self, segment: &str) -> Option<&TableNode> {
        self.index.get(segment).map(|&pos| &self.entries[pos].1)
    }

    /// Replace the node at `segment` in place, or append it.
    pub fn insert(&mut self, segment: String, node: TableNode) {
        match self.index.get(&segment) {
            Some(&pos) => self.entries[pos].1 = node,
            None => {
                self.index.insert(segment.clone(), self.entries.len());
                self.entries.push((segment, node));
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableNode)> {
        self.entries.iter().map(|(k, node)| (k.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn child_mapping(&mut self, segment: &str) -> &mut Mapping {
        let pos = match self.index.get(segment) {
            Some(&pos) => pos,
            None => {
                let pos = self.entries.len();
                self.index.insert(segment.to_string(), pos);
                self.entries
                    .push((segment.to_string(), TableNode::Mapping(Mapping::default())));
                pos
            }
        };
        self.entries[pos].1.demote_to_mapping()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, node) in &self.entries {
            map.serialize_entry(k, node)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = Mapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of table segments")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Mapping, A::Error> {
                let mut mapping = Mapping::default();
                while let Some((k, node)) = access.next_entry::<String, TableNode>()? {
                    mapping.insert(k, node);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

fn is_upper_or_digit(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit()
}

/// Split a session key into its path segments.
///
/// A new segment starts wherever a character outside `[A-Z0-9]` is followed by
/// one inside it, and right after every literal `CHR`. Underscores are dropped
/// from the segments, and a segment spelling `chr` in any case reads as `CHR`.
pub fn decompose_key(key: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = key.char_indices().collect();
    let mut bounds = vec![0];
    for pair in chars.windows(2) {
        let (_, prev) = pair[0];
        let (at, next) = pair[1];
        if (!is_upper_or_digit(prev) && is_upper_or_digit(next)) || key[..at].ends_with(CHR_PREFIX)
        {
            bounds.push(at);
        }
    }
    bounds.push(key.len());

    bounds
        .windows(2)
        .map(|b| normalize_segment(&key[b[0]..b[1]]))
        .collect()
}

fn normalize_segment(raw: &str) -> String {
    let segment: String = raw.chars().filter(|&c| c != '_').collect();
    if segment.eq_ignore_ascii_case(CHR_PREFIX) {
        CHR_PREFIX.to_string()
    } else {
        segment
    }
}

/// Fold flat entries into a nested table, in order.
///
/// The last segment of every path receives the entry's value, replacing
/// whatever was there; intermediate leaves are kept under [`ROOT_SEGMENT`].
pub fn parse_table(entries: &[FlatEntry]) -> TableNode {
    let mut root = Mapping::default();
    for entry in entries {
        let path = decompose_key(&entry.key);
        trace!("table key {:?} -> {:?}", entry.key, path);
        let Some((last, parents)) = path.split_last() else {
            continue;
        };
        let target = parents
            .iter()
            .fold(&mut root, |mapping, segment| mapping.child_mapping(segment));
        target.insert(last.clone(), TableNode::Leaf(entry.value.clone()));
    }
    TableNode::Mapping(root)
}
