//! nexxt_assets — decoders for NEXXT session and map files
//!
//! NEXXT is an NES graphics, map and metasprite editor. This crate turns its
//! session text (`.nss`) and raw map/nametable buffers (`.map`, `.nam`) into
//! plain Rust values: CHR planes, named metasprites with grid-relative sprite
//! positions, tile grids, attribute planes and 2x2 metatiles.
//!
//! Session keys are flattened paths like `VarSpriteGridX`; they are split into
//! segments and folded into a nested [`TableNode`] before anything is read.
//! Binary payloads inside sessions use a hexadecimal run-length encoding, see
//! [`decode_hex`].
//!
//! Basic example (no-run):
//!
//! ```rust,no_run
//! let session = nexxt_assets::parse_session_from_str("CHRMain=00[10]\n").unwrap();
//! assert_eq!(session.chr_main.len(), 16);
//! ```

pub mod error;
pub mod hex_rle;
pub mod key_path;
pub mod map_file;
pub mod model;
pub mod session;

pub use crate::error::*;
pub use crate::hex_rle::decode_hex;
pub use crate::key_path::{FlatEntry, Mapping, TableNode, decompose_key, parse_table};
pub use crate::map_file::{attribute_at, parse_map_from_bytes, parse_map_from_reader};
pub use crate::model::*;
pub use crate::session::{flat_table, parse_session_from_reader, parse_session_from_str};
