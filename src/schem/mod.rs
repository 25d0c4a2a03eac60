//! Redstone schematic backend.
//!
//! Places compiled ROM pages into a Sponge `.schem` world layout. Page 0
//! is a bank of per-bit levers, pages 1-3 are per-bit redstone wall
//! torches on glass, and pages 4-15 materialize each nonzero nibble as a
//! barrel preloaded with enough redstone for a comparator to read the
//! nibble value as signal strength. Pages are padded to 256 nibbles with
//! zeros; RAM is not placed (the hardware loads it through page code).

pub mod nbt;

use crate::error::Result;
use crate::types::{strip_spacing, AssemblyOutput};
use self::nbt::Tag;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::Path;

/// Sponge schematic format version.
const SCHEMATIC_VERSION: i32 = 2;

/// Minecraft data version the block states target.
const DATA_VERSION: i32 = 2584;

/// Redstone items that make a comparator read signal strength 0..=15
/// from a full-size container.
const SIGNAL_ITEM_COUNTS: [u16; 16] = [
    0, 123, 246, 370, 493, 617, 740, 863, 987, 1110, 1234, 1357, 1481, 1604, 1727, 1728,
];

/// One item stack in a container slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub slot: u8,
    pub item: String,
    pub count: u8,
}

/// A world block at absolute coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Namespaced id, e.g. `minecraft:barrel`.
    pub id: String,
    /// Block-state suffix, `[facing=up,open=false]` or empty.
    pub state: String,
    /// Container contents; only barrels carry any.
    pub inventory: Vec<InventoryItem>,
}

impl Block {
    pub fn new(x: i32, y: i32, z: i32, id: &str) -> Block {
        Block::with_state(x, y, z, id, "")
    }

    pub fn with_state(x: i32, y: i32, z: i32, id: &str, state: &str) -> Block {
        Block {
            x,
            y,
            z,
            id: id.to_string(),
            state: state.to_string(),
            inventory: Vec::new(),
        }
    }

    fn palette_key(&self) -> String {
        format!("{}{}", self.id, self.state)
    }
}

/// A barrel preloaded so a comparator reads signal strength `strength`.
pub fn signal_barrel(x: i32, y: i32, z: i32, strength: u8) -> Block {
    let mut remaining = SIGNAL_ITEM_COUNTS[usize::from(strength & 0xF)];
    let mut block = Block::with_state(x, y, z, "minecraft:barrel", "[facing=up,open=false]");
    let mut slot = 0u8;
    while remaining > 0 {
        let count = remaining.min(64);
        block.inventory.push(InventoryItem {
            slot,
            item: "minecraft:redstone".to_string(),
            count: count as u8,
        });
        remaining -= count;
        slot += 1;
    }
    block
}

/// ROM pages placed by default: everything except the lever bank.
pub fn default_active_pages() -> BTreeSet<u8> {
    (1..16).collect()
}

fn nibble_at(nibbles: &str, index: usize) -> u8 {
    nibbles
        .as_bytes()
        .get(index)
        .and_then(|b| char::from(*b).to_digit(16))
        .unwrap_or(0) as u8
}

/// Lay out one ROM page's 256 nibbles in its fixed world region.
fn rom_page_blocks(page: u8, nibbles: &str, blocks: &mut Vec<Block>) {
    for i in 0..256i32 {
        let value = nibble_at(nibbles, i as usize);
        match page {
            0 => {
                for b in 0..4i32 {
                    let x = -5 - 2 * (3 - b) - 8 * (i / 32);
                    let z = -5 - 2 * (i % 32);
                    let powered = value & (1 << b) != 0;
                    let state = if powered {
                        "[facing=east,face=floor,powered=true]"
                    } else {
                        "[facing=east,face=floor,powered=false]"
                    };
                    blocks.push(Block::with_state(x, 0, z, "minecraft:lever", state));
                }
            }
            1..=3 => {
                for b in 0..4i32 {
                    let x = -5 - 2 * (3 - b) - 8 * (i / 32);
                    let y = -5 - 5 * i32::from(page);
                    let z = -5 - 2 * (i % 32);
                    if value & (1 << b) != 0 {
                        blocks.push(Block::with_state(
                            x,
                            y,
                            z,
                            "minecraft:redstone_wall_torch",
                            "[facing=north,lit=false]",
                        ));
                    } else {
                        blocks.push(Block::new(x, y, z, "minecraft:glass"));
                    }
                }
            }
            _ => {
                let p = i32::from(page) - 4;
                let xo = -13;
                let yo = -27 + (p % 2) * 16;
                let zo = 13 + 4 * (p / 2);
                let x = xo - 2 * (i % 32);
                let y = yo - 2 * (i / 32);
                if value == 0 {
                    blocks.push(Block::new(x, y, zo, "minecraft:glass"));
                } else {
                    blocks.push(signal_barrel(x, y, zo, value));
                }
            }
        }
    }
}

/// Blocks for every active ROM page of a compiled program.
pub fn rom_blocks(output: &AssemblyOutput, active_pages: &BTreeSet<u8>) -> Vec<Block> {
    let mut blocks = Vec::new();
    for page in active_pages {
        if *page > 15 {
            continue;
        }
        let stream = output
            .rom_pages
            .get(page)
            .map(|nibbles| strip_spacing(nibbles))
            .unwrap_or_default();
        rom_page_blocks(*page, &stream, &mut blocks);
    }
    blocks
}

/// Serialize blocks into a gzipped Sponge schematic.
///
/// `origin` is the `//paste` anchor in the same absolute coordinates as
/// the blocks. When several blocks share a position the last one wins.
pub fn write_schematic<W: Write>(writer: W, blocks: &[Block], origin: (i32, i32, i32)) -> Result<()> {
    if blocks.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "schematic has no blocks").into());
    }

    let mut by_pos: BTreeMap<(i32, i32, i32), &Block> = BTreeMap::new();
    for block in blocks {
        by_pos.insert((block.x, block.y, block.z), block);
    }

    let min_x = by_pos.keys().map(|p| p.0).min().unwrap_or(0);
    let min_y = by_pos.keys().map(|p| p.1).min().unwrap_or(0);
    let min_z = by_pos.keys().map(|p| p.2).min().unwrap_or(0);
    let max_x = by_pos.keys().map(|p| p.0).max().unwrap_or(0);
    let max_y = by_pos.keys().map(|p| p.1).max().unwrap_or(0);
    let max_z = by_pos.keys().map(|p| p.2).max().unwrap_or(0);

    let width = (max_x - min_x + 1) as usize;
    let height = (max_y - min_y + 1) as usize;
    let length = (max_z - min_z + 1) as usize;

    // Deterministic palette: air at 0, then first-seen order over the
    // sorted position scan.
    let mut palette: BTreeMap<String, i32> = BTreeMap::new();
    palette.insert("minecraft:air".to_string(), 0);
    for block in by_pos.values() {
        let next = palette.len() as i32;
        palette.entry(block.palette_key()).or_insert(next);
    }

    let volume = width * height * length;
    let air_index = palette["minecraft:air"];
    let mut block_data = vec![air_index as i8; volume];
    let mut entities: Vec<Tag> = Vec::new();

    for (&(x, y, z), block) in &by_pos {
        let (nx, ny, nz) = ((x - min_x) as usize, (y - min_y) as usize, (z - min_z) as usize);
        let index = nx + nz * width + ny * width * length;
        block_data[index] = palette[&block.palette_key()] as i8;

        if !block.inventory.is_empty() {
            let items: Vec<Tag> = block
                .inventory
                .iter()
                .map(|item| {
                    Tag::Compound(vec![
                        ("Slot".to_string(), Tag::Byte(item.slot as i8)),
                        ("id".to_string(), Tag::String(item.item.clone())),
                        ("Count".to_string(), Tag::Byte(item.count as i8)),
                    ])
                })
                .collect();
            entities.push(Tag::Compound(vec![
                ("Items".to_string(), Tag::List(items)),
                ("Id".to_string(), Tag::String(block.id.clone())),
                (
                    "Pos".to_string(),
                    Tag::IntArray(vec![nx as i32, ny as i32, nz as i32]),
                ),
            ]));
        }
    }

    let palette_tag = Tag::Compound(
        palette
            .iter()
            .map(|(key, index)| (key.clone(), Tag::Int(*index)))
            .collect(),
    );

    let schematic = Tag::Compound(vec![
        ("Version".to_string(), Tag::Int(SCHEMATIC_VERSION)),
        ("DataVersion".to_string(), Tag::Int(DATA_VERSION)),
        ("PaletteMax".to_string(), Tag::Int(palette.len() as i32)),
        ("Palette".to_string(), palette_tag),
        ("Width".to_string(), Tag::Short(width as i16)),
        ("Height".to_string(), Tag::Short(height as i16)),
        ("Length".to_string(), Tag::Short(length as i16)),
        ("BlockData".to_string(), Tag::ByteArray(block_data)),
        ("BlockEntities".to_string(), Tag::List(entities)),
        (
            "Metadata".to_string(),
            Tag::Compound(vec![
                ("WEOffsetX".to_string(), Tag::Int(min_x - origin.0)),
                ("WEOffsetY".to_string(), Tag::Int(min_y - origin.1)),
                ("WEOffsetZ".to_string(), Tag::Int(min_z - origin.2)),
            ]),
        ),
        ("Offset".to_string(), Tag::ByteArray(vec![0, 0, 0])),
    ]);

    let root = Tag::Compound(vec![("Schematic".to_string(), schematic)]);
    nbt::write_gzipped_root(writer, &root)?;
    Ok(())
}

/// Assemble a program's active ROM pages into a `.schem` file on disk.
pub fn save_schematic<P: AsRef<Path>>(
    path: P,
    output: &AssemblyOutput,
    active_pages: &BTreeSet<u8>,
) -> Result<()> {
    let blocks = rom_blocks(output, active_pages);
    let file = std::fs::File::create(path)?;
    write_schematic(io::BufWriter::new(file), &blocks, (0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_signal_barrel_splits_into_stacks() {
        let barrel = signal_barrel(0, 0, 0, 1);
        let counts: Vec<u8> = barrel.inventory.iter().map(|i| i.count).collect();
        assert_eq!(counts, vec![64, 59]); // 123 redstone
        assert_eq!(barrel.inventory[0].slot, 0);
        assert_eq!(barrel.inventory[1].slot, 1);

        let full = signal_barrel(0, 0, 0, 15);
        assert_eq!(full.inventory.len(), 27); // 1728 = 27 * 64
        assert!(full.inventory.iter().all(|i| i.count == 64));
    }

    #[test]
    fn test_zero_signal_barrel_is_empty() {
        assert!(signal_barrel(0, 0, 0, 0).inventory.is_empty());
    }

    #[test]
    fn test_lever_page_encodes_bits() {
        let mut blocks = Vec::new();
        // Nibble 0 is "5" = 0b0101: bits 0 and 2 powered.
        rom_page_blocks(0, "5", &mut blocks);
        let first_four: Vec<bool> = blocks[..4]
            .iter()
            .map(|b| b.state.contains("powered=true"))
            .collect();
        assert_eq!(first_four, vec![true, false, true, false]);
        assert_eq!(blocks.len(), 256 * 4);
    }

    #[test]
    fn test_torch_page_mixes_glass_and_torches() {
        let mut blocks = Vec::new();
        rom_page_blocks(1, "F", &mut blocks);
        assert!(blocks[..4].iter().all(|b| b.id == "minecraft:redstone_wall_torch"));
        assert!(blocks[4..8].iter().all(|b| b.id == "minecraft:glass"));
    }

    #[test]
    fn test_signal_page_layout() {
        let mut blocks = Vec::new();
        rom_page_blocks(4, "7", &mut blocks);
        assert_eq!(blocks.len(), 256);
        // First nibble is nonzero: a barrel at the page origin.
        assert_eq!(blocks[0].id, "minecraft:barrel");
        assert_eq!((blocks[0].x, blocks[0].y, blocks[0].z), (-13, -27, 13));
        // The rest pad to glass.
        assert!(blocks[1..].iter().all(|b| b.id == "minecraft:glass"));
    }

    #[test]
    fn test_write_schematic_produces_gzip_nbt() {
        let output = assemble(".PROM 4\nPASS\nRETURN").unwrap();
        let blocks = rom_blocks(&output, &default_active_pages());
        let mut bytes = Vec::new();
        write_schematic(&mut bytes, &blocks, (0, 0, 0)).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(&bytes[..]).read_to_end(&mut decoded).unwrap();
        // Unnamed root compound.
        assert_eq!(&decoded[..3], &[10, 0, 0]);
    }

    #[test]
    fn test_empty_schematic_rejected() {
        let mut bytes = Vec::new();
        let err = write_schematic(&mut bytes, &[], (0, 0, 0)).unwrap_err();
        assert!(err.to_string().contains("no blocks"));
    }

    #[test]
    fn test_save_schematic_writes_file() {
        let output = assemble(".PROM 5\nVALUE 9").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.schem");
        save_schematic(&path, &output, &default_active_pages()).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
