use crate::error::{ParseError, Result};
use crate::model::*;
use log::debug;
use std::io::Read;

/// Size of a bare `.nam` nametable, which carries no footer.
pub const NAMETABLE_SIZE: usize = 1024;
pub const NAMETABLE_WIDTH: usize = 32;
pub const NAMETABLE_HEIGHT: usize = 30;
/// Trailing `width_lo, width_hi, height_lo, height_hi` of a `.map`.
pub const FOOTER_SIZE: usize = 4;

pub fn parse_map_from_reader<R: Read>(mut r: R) -> Result<MapFile> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    parse_map_from_bytes(&bytes)
}

pub fn parse_map_from_bytes(bytes: &[u8]) -> Result<MapFile> {
    let (kind, width, height, body) = extract_dimensions(bytes)?;

    let tile_count = width
        .checked_mul(height)
        .filter(|&n| n <= body.len())
        .ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "{width}x{height} map needs {} tile bytes, found {}",
                width.saturating_mul(height),
                body.len()
            ))
        })?;

    let tiles = organize_in_tiles(body, width, height);
    let attributes = body[tile_count..].to_vec();
    let metatiles = organize_in_metatiles(&tiles, &attributes, width, height)?;

    debug!(
        "map: {kind:?} {width}x{height}, {} attribute bytes, {} metatiles",
        attributes.len(),
        metatiles.len()
    );

    Ok(MapFile {
        kind,
        width,
        height,
        tiles,
        attributes,
        metatiles,
    })
}

impl MapFile {
    pub fn decode(bytes: &[u8]) -> Result<MapFile> {
        parse_map_from_bytes(bytes)
    }
}

/// Work out the map size and strip the footer if there is one.
fn extract_dimensions(bytes: &[u8]) -> Result<(MapKind, usize, usize, &[u8])> {
    if bytes.len() == NAMETABLE_SIZE {
        return Ok((MapKind::Nametable, NAMETABLE_WIDTH, NAMETABLE_HEIGHT, bytes));
    }
    let (body, footer) = bytes.split_last_chunk::<FOOTER_SIZE>().ok_or_else(|| {
        ParseError::InvalidFormat(format!(
            "map of {} bytes is too short for its size footer",
            bytes.len()
        ))
    })?;
    let [width_lo, width_hi, height_lo, height_hi] = *footer;
    let width = usize::from(u16::from_le_bytes([width_lo, width_hi]));
    let height = usize::from(u16::from_le_bytes([height_lo, height_hi]));
    Ok((MapKind::Map, width, height, body))
}

fn organize_in_tiles(body: &[u8], width: usize, height: usize) -> Vec<Vec<u8>> {
    (0..height)
        .map(|row| body[row * width..(row + 1) * width].to_vec())
        .collect()
}

/// 2-bit palette attribute of a metatile.
///
/// Each attribute byte covers 2x2 metatiles: bits 0-1 upper left, 2-3 upper
/// right, 4-5 lower left, 6-7 lower right. `None` when the plane is too short.
pub fn attribute_at(
    attributes: &[u8],
    width: usize,
    metarow: usize,
    metacolumn: usize,
) -> Option<u8> {
    let mut attribute = *attributes.get((metarow / 2) * (width / 4) + metacolumn / 2)?;
    if metarow % 2 == 1 {
        attribute >>= 4;
    }
    if metacolumn % 2 == 1 {
        attribute >>= 2;
    }
    Some(attribute & 0b11)
}

fn organize_in_metatiles(
    tiles: &[Vec<u8>],
    attributes: &[u8],
    width: usize,
    height: usize,
) -> Result<Vec<Metatile>> {
    let mut metatiles = Vec::with_capacity((width / 2) * (height / 2));
    for metarow in 0..height / 2 {
        let (upper, lower) = (&tiles[metarow * 2], &tiles[metarow * 2 + 1]);
        for metacolumn in 0..width / 2 {
            let (left, right) = (metacolumn * 2, metacolumn * 2 + 1);
            let attribute = attribute_at(attributes, width, metarow, metacolumn).ok_or_else(|| {
                ParseError::InvalidFormat(format!(
                    "attribute plane of {} bytes has no entry for metatile ({metarow}, {metacolumn})",
                    attributes.len()
                ))
            })?;
            metatiles.push(Metatile {
                upper_left: upper[left],
                upper_right: upper[right],
                lower_left: lower[left],
                lower_right: lower[right],
                attribute,
            });
        }
    }
    Ok(metatiles)
}
