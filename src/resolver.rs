//! Address resolver.
//!
//! Three passes over the partitioned pages, in an order forced by the
//! variable-width CALL: its encoding depends on the *kind* of page the
//! target lives in, so target pages must be bound before any local offset
//! can be computed.
//!
//! - Pass A builds the global label → page map.
//! - Pass B binds every CALL to Internal/Rom/Ram form; widths are exact
//!   from here on, so waitflag expansion runs at this point.
//! - Pass C computes per-page local offsets and fills every jump, branch,
//!   and call target.

use crate::error::{AsmError, Result};
use crate::layout;
use crate::types::{
    CallPage, CallRef, Directive, JumpRef, LabelAddress, LineKind, Op, Page, PageId,
};
use std::collections::{BTreeMap, HashMap};

/// Run all resolver passes, leaving every control-transfer target fixed.
///
/// Returns the global label → address map.
pub fn resolve(pages: &mut [Page]) -> Result<BTreeMap<String, LabelAddress>> {
    let label_page = collect_label_pages(pages)?;
    bind_call_pages(pages, &label_page)?;

    // CALL widths are exact now, so PASS padding can be sized correctly.
    layout::expand_waitflags(pages);

    let labels = assign_local_offsets(pages);
    fix_targets(pages, &labels)?;
    Ok(labels)
}

/// Pass A: map every label to its containing page.
///
/// Label names are a single global namespace; a second definition
/// anywhere in the program is an error.
fn collect_label_pages(pages: &[Page]) -> Result<HashMap<String, PageId>> {
    let mut label_page: HashMap<String, PageId> = HashMap::new();
    for page in pages {
        for line in &page.lines {
            if let LineKind::Directive(Directive::Label(name)) = &line.kind {
                if label_page.insert(name.clone(), page.id).is_some() {
                    return Err(AsmError::DuplicateLabel {
                        label: name.clone(),
                        line: line.number,
                        text: line.text.clone(),
                    });
                }
            }
        }
    }
    Ok(label_page)
}

/// Pass B: bind each CALL to the kind of page its target lives in.
fn bind_call_pages(pages: &mut [Page], label_page: &HashMap<String, PageId>) -> Result<()> {
    for page in pages.iter_mut() {
        let current = page.id;
        for line in page.lines.iter_mut() {
            let LineKind::Operation(Op::Call(call)) = &mut line.kind else {
                continue;
            };
            let CallRef::Pending(label) = call else {
                continue;
            };
            let target = match label_page.get(label.as_str()) {
                Some(id) => *id,
                None => {
                    return Err(AsmError::UnresolvedLabel {
                        label: label.clone(),
                        line: line.number,
                        text: line.text.clone(),
                    })
                }
            };
            let call_page = if target == current {
                CallPage::Internal
            } else {
                match target {
                    PageId::Rom(p) => CallPage::Rom(p),
                    PageId::Ram(a) => CallPage::Ram(a),
                }
            };
            let label = std::mem::take(label);
            *call = CallRef::Bound {
                label,
                page: call_page,
            };
        }
    }
    Ok(())
}

/// Pass C, first half: walk each page accumulating nibble offsets and
/// record every label's address.
fn assign_local_offsets(pages: &[Page]) -> BTreeMap<String, LabelAddress> {
    let mut labels = BTreeMap::new();
    for page in pages {
        let mut offset = 0usize;
        for line in &page.lines {
            if let LineKind::Directive(Directive::Label(name)) = &line.kind {
                labels.insert(
                    name.clone(),
                    LabelAddress {
                        page: page.id,
                        offset,
                    },
                );
            }
            offset += line.width();
        }
    }
    labels
}

/// Pass C, second half: fill 8-bit local targets.
///
/// JUMP and BRANCH may only target their own page; CALL may target any.
fn fix_targets(pages: &mut [Page], labels: &BTreeMap<String, LabelAddress>) -> Result<()> {
    for page in pages.iter_mut() {
        let current = page.id;
        for line in page.lines.iter_mut() {
            match &mut line.kind {
                LineKind::Operation(Op::Jump(target))
                | LineKind::Operation(Op::Branch { target, .. }) => {
                    let JumpRef::Pending(label) = target else {
                        continue;
                    };
                    let address = match labels.get(label.as_str()) {
                        Some(address) => *address,
                        None => {
                            return Err(AsmError::UnresolvedLabel {
                                label: label.clone(),
                                line: line.number,
                                text: line.text.clone(),
                            })
                        }
                    };
                    if address.page != current {
                        return Err(AsmError::CrossPageLocalJump {
                            label: label.clone(),
                            page: current.to_string(),
                            target_page: address.page.to_string(),
                            line: line.number,
                        });
                    }
                    let label = std::mem::take(label);
                    *target = JumpRef::Fixed {
                        label,
                        local: (address.offset % 256) as u8,
                    };
                }
                LineKind::Operation(Op::Call(call)) => {
                    let CallRef::Bound { label, page } = call else {
                        continue;
                    };
                    let address = match labels.get(label.as_str()) {
                        Some(address) => *address,
                        None => {
                            return Err(AsmError::UnresolvedLabel {
                                label: label.clone(),
                                line: line.number,
                                text: line.text.clone(),
                            })
                        }
                    };
                    let page = *page;
                    let label = std::mem::take(label);
                    *call = CallRef::Fixed {
                        label,
                        page,
                        local: (address.offset % 256) as u8,
                    };
                }
                _ => {}
            }
        }
    }
    Ok(())
}
