use crate::error::{ParseError, Result};
use crate::hex_rle::decode_hex;
use crate::key_path::{FlatEntry, TableNode, parse_table};
use crate::model::*;
use log::{debug, trace};
use std::collections::HashMap;
use std::io::Read;

/// Bytes reserved per metasprite slot in `MetaSprites`.
pub const SPRITE_BLOCK_SIZE: usize = 256;
/// Bytes per sprite row: y, tile, attribute, x.
pub const SPRITE_ROW_SIZE: usize = 4;
/// Marks an unused sprite row when found in y, attribute and x.
pub const SPRITE_SENTINEL: u8 = 0xFF;

pub fn parse_session_from_reader<R: Read>(mut r: R) -> Result<Session> {
    let mut s = String::new();
    r.read_to_string(&mut s)?;
    parse_session_from_str(&s)
}

pub fn parse_session_from_str(text: &str) -> Result<Session> {
    let table = parse_table(&flat_table(text));

    let chr_main = decode_hex(leaf(&table, &["CHR", "Main"]).unwrap_or(""))?;
    let chr_copy = decode_hex(leaf(&table, &["CHR", "Copy"]).unwrap_or(""))?;
    let chr_undo = decode_hex(leaf(&table, &["CHR", "Undo"]).unwrap_or(""))?;

    let metasprites_offset = GridOffset {
        x: leaf(&table, &["Var", "Sprite", "Grid", "X"]).map_or(0, grid_component),
        y: leaf(&table, &["Var", "Sprite", "Grid", "Y"]).map_or(0, grid_component),
    };

    let names = metasprite_names(table.dig(&["Meta", "Sprite"]));
    let sprite_bytes = decode_hex(leaf(&table, &["Meta", "Sprites"]).unwrap_or(""))?;
    let blocks = sprite_blocks(&sprite_bytes, metasprites_offset)?;
    let metasprites = make_metasprites(names, &blocks)?;

    debug!(
        "session: chr main/copy/undo {}/{}/{} bytes, {} sprite blocks, {} metasprites",
        chr_main.len(),
        chr_copy.len(),
        chr_undo.len(),
        blocks.len(),
        metasprites.len()
    );

    Ok(Session {
        table,
        chr_main,
        chr_copy,
        chr_undo,
        metasprites_offset,
        metasprites,
    })
}

impl Session {
    pub fn decode(text: &str) -> Result<Session> {
        parse_session_from_str(text)
    }

    /// Scalar stored at `path` in the session table.
    pub fn lookup(&self, path: &[&str]) -> Option<&str> {
        leaf(&self.table, path)
    }
}

/// Collect the `Key=Value` lines of a session, split on the first `=`.
///
/// Lines without `=` are skipped. A repeated key keeps the position of its
/// first occurrence and the value of its last one.
pub fn flat_table(text: &str) -> Vec<FlatEntry> {
    let mut entries: Vec<FlatEntry> = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (key, value) in text.lines().filter_map(|line| line.split_once('=')) {
        match seen.get(key) {
            Some(&pos) => entries[pos].value = value.to_string(),
            None => {
                seen.insert(key, entries.len());
                entries.push(FlatEntry::new(key, value));
            }
        }
    }
    entries
}

fn leaf<'a>(table: &'a TableNode, path: &[&str]) -> Option<&'a str> {
    table.dig(path).and_then(TableNode::as_leaf)
}

/// Leading-digits integer parse: optional whitespace and sign, then as many
/// decimal digits as present, with single underscores allowed between digits.
/// Anything else reads as zero.
fn lenient_int(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits = digits.as_bytes();
    let mut magnitude = 0i64;
    for (i, &b) in digits.iter().enumerate() {
        match b {
            b'0'..=b'9' => {
                magnitude = magnitude
                    .saturating_mul(10)
                    .saturating_add(i64::from(b - b'0'));
            }
            b'_' if i > 0
                && digits[i - 1].is_ascii_digit()
                && digits.get(i + 1).is_some_and(u8::is_ascii_digit) => {}
            _ => break,
        }
    }
    if negative { -magnitude } else { magnitude }
}

fn grid_component(s: &str) -> i32 {
    lenient_int(s).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Name -> slot index pairs from the `MetaSprite<n>=<name>` entries.
fn metasprite_names(node: Option<&TableNode>) -> Vec<(String, i64)> {
    let mut names: Vec<(String, i64)> = Vec::new();
    let Some(mapping) = node.and_then(TableNode::as_mapping) else {
        return names;
    };
    for (key, child) in mapping.iter() {
        let Some(name) = child.as_leaf() else {
            continue;
        };
        if !key.bytes().any(|b| b.is_ascii_digit()) {
            continue;
        }
        let index = lenient_int(key);
        match names.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = index,
            None => names.push((name.to_string(), index)),
        }
    }
    names
}

/// Split decoded `MetaSprites` bytes into per-slot sprite lists.
fn sprite_blocks(bytes: &[u8], offset: GridOffset) -> Result<Vec<Vec<Sprite>>> {
    bytes
        .chunks(SPRITE_BLOCK_SIZE)
        .map(|block| {
            block
                .chunks(SPRITE_ROW_SIZE)
                .filter(|row| !is_sentinel_row(row))
                .map(|row| match *row {
                    [y, tile, attribute, x] => Ok(Sprite {
                        x: i32::from(x).saturating_sub(offset.x),
                        y: i32::from(y).saturating_sub(offset.y),
                        tile,
                        attribute,
                    }),
                    _ => Err(ParseError::InvalidFormat(format!(
                        "incomplete sprite row {row:02x?}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

// The tile byte does not take part in the check.
fn is_sentinel_row(row: &[u8]) -> bool {
    matches!(
        row,
        [SPRITE_SENTINEL, _, SPRITE_SENTINEL, SPRITE_SENTINEL]
    )
}

fn make_metasprites(names: Vec<(String, i64)>, blocks: &[Vec<Sprite>]) -> Result<Vec<Metasprite>> {
    names
        .into_iter()
        .map(|(name, index)| {
            let block = usize::try_from(index).ok().and_then(|i| blocks.get(i));
            match block {
                Some(sprites) => {
                    trace!("metasprite {name:?} <- block {index} ({} sprites)", sprites.len());
                    Ok(Metasprite {
                        name,
                        sprites: sprites.clone(),
                    })
                }
                None => Err(ParseError::MissingSpriteBlock {
                    name,
                    index,
                    available: blocks.len(),
                }),
            }
        })
        .collect()
}
