use std::io::Cursor;

use nexxt_assets::{MapFile, MapKind, Metatile, parse_map_from_bytes, parse_map_from_reader};

/// Lay tiles, attributes and a size footer out the way NEXXT saves a `.map`.
fn encode_map(width: u16, height: u16, tiles: &[u8], attributes: &[u8]) -> Vec<u8> {
    let mut bytes = tiles.to_vec();
    bytes.extend_from_slice(attributes);
    bytes.extend_from_slice(&width.to_le_bytes());
    bytes.extend_from_slice(&height.to_le_bytes());
    bytes
}

fn encode_decoded(map: &MapFile) -> Vec<u8> {
    let tiles: Vec<u8> = map.tiles.concat();
    encode_map(map.width as u16, map.height as u16, &tiles, &map.attributes)
}

#[test]
fn four_by_four_map_yields_four_metatiles() -> anyhow::Result<()> {
    let tiles: Vec<u8> = (0..16).collect();
    let bytes = encode_map(4, 4, &tiles, &[0b11_01_10_11]);
    let map = parse_map_from_bytes(&bytes)?;

    assert_eq!(map.kind, MapKind::Map);
    assert_eq!((map.width, map.height), (4, 4));
    assert_eq!(map.tiles[1], vec![4, 5, 6, 7]);
    assert_eq!(map.attributes, vec![0b11_01_10_11]);
    assert_eq!(
        map.metatiles,
        vec![
            Metatile { upper_left: 0, upper_right: 1, lower_left: 4, lower_right: 5, attribute: 3 },
            Metatile { upper_left: 2, upper_right: 3, lower_left: 6, lower_right: 7, attribute: 2 },
            Metatile { upper_left: 8, upper_right: 9, lower_left: 12, lower_right: 13, attribute: 1 },
            Metatile { upper_left: 10, upper_right: 11, lower_left: 14, lower_right: 15, attribute: 3 },
        ]
    );
    Ok(())
}

#[test]
fn reencoding_is_idempotent() -> anyhow::Result<()> {
    let tiles: Vec<u8> = (100..124).collect();
    let bytes = encode_map(6, 4, &tiles, &[0xe4, 0x1b]);
    let first = parse_map_from_bytes(&bytes)?;
    let reencoded = encode_decoded(&first);
    assert_eq!(reencoded, bytes);
    assert_eq!(parse_map_from_bytes(&reencoded)?, first);
    Ok(())
}

#[test]
fn nametable_keeps_its_last_four_bytes() -> anyhow::Result<()> {
    let mut bytes = vec![0u8; 1024];
    bytes[1020..].copy_from_slice(&[4, 0, 4, 0]);
    let map = MapFile::decode(&bytes)?;
    assert_eq!(map.kind, MapKind::Nametable);
    assert_eq!((map.width, map.height), (32, 30));
    assert_eq!(map.attributes.len(), 64);
    assert_eq!(&map.attributes[60..], &[4, 0, 4, 0]);
    Ok(())
}

#[test]
fn reader_matches_bytes() -> anyhow::Result<()> {
    let bytes = encode_map(2, 2, &[1, 2, 3, 4], &[0b10]);
    let map = parse_map_from_reader(Cursor::new(bytes.clone()))?;
    assert_eq!(map, parse_map_from_bytes(&bytes)?);
    assert_eq!(map.metatiles[0].to_array(), [1, 2, 3, 4, 2]);
    Ok(())
}

#[test]
fn missing_footer_fails() {
    assert!(parse_map_from_bytes(&[1, 2, 3]).is_err());
}
