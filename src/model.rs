use crate::key_path::TableNode;
use serde::{Deserialize, Serialize};

/// Decoded NEXXT session (`.nss`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub table: TableNode,
    #[serde(default)]
    pub chr_main: Vec<u8>,
    #[serde(default)]
    pub chr_copy: Vec<u8>,
    #[serde(default)]
    pub chr_undo: Vec<u8>,
    pub metasprites_offset: GridOffset,
    #[serde(default)]
    pub metasprites: Vec<Metasprite>,
}

/// Origin of the metasprite editing grid, subtracted from sprite positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOffset {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metasprite {
    pub name: String,
    #[serde(default)]
    pub sprites: Vec<Sprite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub x: i32,
    pub y: i32,
    pub tile: u8,
    pub attribute: u8,
}

/// Whether a map buffer was a bare nametable or carried a size footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    Nametable,
    Map,
}

/// Decoded NEXXT map (`.map`) or nametable (`.nam`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapFile {
    pub kind: MapKind,
    pub width: usize,
    pub height: usize,
    /// `tiles[row][column]`
    pub tiles: Vec<Vec<u8>>,
    pub attributes: Vec<u8>,
    pub metatiles: Vec<Metatile>,
}

impl MapFile {
    /// Metatile at the given metatile row/column, if inside the map.
    pub fn metatile(&self, metarow: usize, metacolumn: usize) -> Option<&Metatile> {
        let per_row = self.width / 2;
        if metacolumn >= per_row {
            return None;
        }
        self.metatiles.get(metarow * per_row + metacolumn)
    }
}

/// 2x2 tile block sharing one palette attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metatile {
    pub upper_left: u8,
    pub upper_right: u8,
    pub lower_left: u8,
    pub lower_right: u8,
    pub attribute: u8,
}

impl Metatile {
    pub fn to_array(&self) -> [u8; 5] {
        [
            self.upper_left,
            self.upper_right,
            self.lower_left,
            self.lower_right,
            self.attribute,
        ]
    }
}
