//! Nibble encoder.
//!
//! A pure projection from resolved pages to hex nibble streams, plus the
//! RAM occupancy check. Encodings are bit-exact; per-instruction strings
//! are joined with single spaces for readability and the semantic stream
//! is the concatenation.

use crate::error::{AsmError, Result};
use crate::types::{
    strip_spacing, AluRam, AssemblyOutput, CallPage, CallRef, JumpRef, LabelAddress, LineKind, Op,
    Page, PageId, Warning,
};
use std::collections::BTreeMap;

/// Nibble budget of one ROM bank. Exceeding it is warned, not rejected.
pub const ROM_PAGE_NIBBLES: usize = 256;

/// Size of the RAM address space in nibbles.
pub const RAM_NIBBLES: u32 = 4096;

fn nibble(value: u8) -> char {
    char::from_digit(u32::from(value & 0xF), 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

/// Encode one operation as its hex nibble string.
///
/// Control-transfer operations must be fully resolved; reaching a pending
/// target here is a resolver bug, not a user error.
pub fn encode_op(op: &Op) -> Result<String> {
    match op {
        Op::Pass => Ok("0".to_string()),
        Op::Value(v) => Ok(format!("1{:04X}", v)),
        Op::Jump(JumpRef::Fixed { local, .. }) => Ok(format!("2{:02X}", local)),
        Op::Branch {
            condition,
            target: JumpRef::Fixed { local, .. },
        } => Ok(format!("3{}{:02X}", nibble(*condition), local)),
        Op::Push { register } => Ok(format!("4{}", nibble(*register))),
        Op::Pop { register } => Ok(format!("5{}", nibble(*register))),
        Op::Call(CallRef::Fixed { page, local, .. }) => match page {
            CallPage::Internal => Ok(format!("6{:02X}", local)),
            CallPage::Rom(p) => Ok(format!("C{}{:02X}", nibble(*p), local)),
            CallPage::Ram(a) => Ok(format!("1{:04X}D{:02X}", a, local)),
        },
        Op::Return => Ok("7".to_string()),
        Op::Add { register } => Ok(format!("8{}", nibble(*register))),
        Op::Rotate { amount, register } => {
            Ok(format!("9{}{}", nibble(*amount), nibble(*register)))
        }
        Op::Alu(AluRam::Unary { code }) | Op::Ram(AluRam::Unary { code }) => {
            Ok(format!("A{}", nibble(*code)))
        }
        Op::Alu(AluRam::Binary { code, register })
        | Op::Ram(AluRam::Binary { code, register }) => {
            Ok(format!("B{}{}", nibble(*code), nibble(*register)))
        }
        Op::Input => Ok("E".to_string()),
        Op::Output { octal } => {
            let mut nibbles = String::with_capacity(1 + octal.len());
            nibbles.push('F');
            if let Some((last, init)) = octal.split_last() {
                for digit in init {
                    nibbles.push(nibble(*digit));
                }
                // The final digit is re-coded into the 8..F nibble range.
                nibbles.push(nibble(8 + *last));
            }
            Ok(nibbles)
        }
        Op::Jump(JumpRef::Pending(label))
        | Op::Branch {
            target: JumpRef::Pending(label),
            ..
        } => Err(AsmError::Internal {
            message: format!("encoder reached unresolved jump target `{}`", label),
        }),
        Op::Call(call) => Err(AsmError::Internal {
            message: format!("encoder reached unbound call target `{}`", call.label()),
        }),
    }
}

/// Encode a page as its space-joined nibble string.
pub fn encode_page(page: &Page) -> Result<String> {
    let mut parts = Vec::new();
    for line in &page.lines {
        if let LineKind::Operation(op) = &line.kind {
            parts.push(encode_op(op)?);
        }
    }
    let nibbles = parts.join(" ");
    debug_assert_eq!(strip_spacing(&nibbles).len(), page.width());
    Ok(nibbles)
}

/// Encode all pages and validate RAM occupancy.
pub fn encode(
    pages: &[Page],
    labels: BTreeMap<String, LabelAddress>,
) -> Result<AssemblyOutput> {
    let mut output = AssemblyOutput {
        labels,
        ..AssemblyOutput::default()
    };

    for page in pages {
        let nibbles = encode_page(page)?;
        let width = page.width();
        match page.id {
            PageId::Rom(p) => {
                if width > ROM_PAGE_NIBBLES {
                    output.warnings.push(Warning::RomPageOverflow {
                        page: p,
                        nibbles: width,
                    });
                }
                output.rom_pages.insert(p, nibbles);
            }
            PageId::Ram(a) => {
                output.ram_image.insert(a, nibbles);
            }
        }
    }

    check_ram_occupancy(pages)?;
    Ok(output)
}

/// RAM nibble cells are globally unique and bounded.
///
/// A page at start address `a` emitting `k` nibbles claims `a..a+k`; no
/// cell may be claimed twice and none may reach index 4096.
fn check_ram_occupancy(pages: &[Page]) -> Result<()> {
    // Empty RAM pages claim no cells and cannot collide.
    let mut spans: Vec<(u16, u32)> = pages
        .iter()
        .filter_map(|page| match (page.id, page.width()) {
            (PageId::Ram(_), 0) => None,
            (PageId::Ram(a), width) => Some((a, u32::from(a) + width as u32)),
            (PageId::Rom(_), _) => None,
        })
        .collect();
    spans.sort_unstable();

    for &(start, end) in &spans {
        if end > RAM_NIBBLES {
            return Err(AsmError::RamOutOfRange {
                page: start,
                nibble: end - 1,
            });
        }
    }
    for pair in spans.windows(2) {
        let (first, first_end) = pair[0];
        let (second, _) = pair[1];
        if u32::from(second) < first_end {
            return Err(AsmError::RamOverlap {
                first,
                second,
                nibble: second,
            });
        }
    }
    Ok(())
}
