//! Page partitioner and waitflag expander.
//!
//! Partitioning walks the lexed lines and groups them under the page
//! opened by the most recent `.PROM`/`.PRAM`. Waitflag expansion runs
//! later, after CALL targets are bound, so every operation width it sums
//! is exact.

use crate::error::{AsmError, Result};
use crate::types::{Directive, Line, LineKind, Op, Page, PageId};
use std::collections::HashSet;

/// Nibbles that must separate a flag-setting operation from a point that
/// reads the flags.
const FLAG_SETTLE_NIBBLES: usize = 6;

/// Group lines into pages.
///
/// Every page is opened by exactly one `.PROM`/`.PRAM`; reopening a page
/// is an error, as is any non-blank line (or a whole program) without a
/// page directive. Blank lines before the first page directive are
/// dropped; blank lines inside a page survive with width 0.
pub fn partition(lines: Vec<Line>) -> Result<Vec<Page>> {
    let mut pages: Vec<Page> = Vec::new();
    let mut seen: HashSet<PageId> = HashSet::new();

    for line in lines {
        let opened = match &line.kind {
            LineKind::Directive(Directive::Prom(n)) => Some(PageId::Rom(*n)),
            LineKind::Directive(Directive::Pram(a)) => Some(PageId::Ram(*a)),
            _ => None,
        };

        if let Some(id) = opened {
            if !seen.insert(id) {
                return Err(AsmError::DuplicatePage {
                    page: id.to_string(),
                    line: line.number,
                    text: line.text,
                });
            }
            pages.push(Page::new(id, line.number));
            continue;
        }

        match pages.last_mut() {
            Some(page) => page.lines.push(line),
            None => {
                if line.kind != LineKind::Blank {
                    return Err(AsmError::MissingPageDirective {
                        line: line.number,
                        text: line.text,
                    });
                }
            }
        }
    }

    if pages.is_empty() {
        return Err(AsmError::MissingPageDirective {
            line: 1,
            text: "(empty program)".to_string(),
        });
    }

    Ok(pages)
}

/// Expand `.WAITFLAG` directives into the minimum `PASS` padding.
///
/// Within each page, a counter tracks nibbles since the start of the most
/// recent flag-setting operation; `.WAITFLAG` pads it up to
/// [`FLAG_SETTLE_NIBBLES`]. With no preceding flag setter in the page the
/// full padding is emitted.
pub fn expand_waitflags(pages: &mut [Page]) {
    for page in pages {
        let mut expanded = Vec::with_capacity(page.lines.len());
        let mut since_flags = 0usize;

        for line in page.lines.drain(..) {
            match &line.kind {
                LineKind::Operation(op) if op.sets_flags() => since_flags = 0,
                LineKind::Directive(Directive::Waitflag) => {
                    while since_flags < FLAG_SETTLE_NIBBLES {
                        expanded.push(Line {
                            number: line.number,
                            text: "PASS".to_string(),
                            kind: LineKind::Operation(Op::Pass),
                        });
                        since_flags += 1;
                    }
                    continue;
                }
                _ => {}
            }
            since_flags += line.width();
            expanded.push(line);
        }

        page.lines = expanded;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::lexer;

    fn pages(source: &str) -> Result<Vec<Page>> {
        partition(lexer::lex(source, Dialect::p16())?)
    }

    #[test]
    fn test_partition_splits_on_page_directives() {
        let pages = pages(".PROM 0\nPASS\n.PRAM 64\nVALUE 1").unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].id, PageId::Rom(0));
        assert_eq!(pages[0].lines.len(), 1);
        assert_eq!(pages[1].id, PageId::Ram(64));
        assert_eq!(pages[1].lines.len(), 1);
    }

    #[test]
    fn test_duplicate_page_rejected() {
        let err = pages(".PRAM 0\nVALUE 1\n.PRAM 0\nVALUE 2").unwrap_err();
        assert!(matches!(err, AsmError::DuplicatePage { .. }));
    }

    #[test]
    fn test_code_before_page_rejected() {
        let err = pages("PASS\n.PROM 0").unwrap_err();
        assert!(matches!(err, AsmError::MissingPageDirective { line: 1, .. }));
    }

    #[test]
    fn test_label_before_page_rejected() {
        let err = pages(".LABEL start\n.PROM 0").unwrap_err();
        assert!(matches!(err, AsmError::MissingPageDirective { .. }));
    }

    #[test]
    fn test_empty_source_rejected() {
        let err = pages("").unwrap_err();
        assert!(matches!(err, AsmError::MissingPageDirective { .. }));
    }

    #[test]
    fn test_blanks_before_first_page_ignored() {
        let pages = pages("\n# comment\n.PROM 0\nPASS").unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_waitflag_pads_from_alu_start() {
        // ALU not is 2 nibbles; 4 PASSes bring the distance to 6.
        let mut pages = pages(".PROM 0\nALU not\n.WAITFLAG\nRETURN").unwrap();
        expand_waitflags(&mut pages);
        let widths: Vec<usize> = pages[0].lines.iter().map(Line::width).collect();
        assert_eq!(widths, vec![2, 1, 1, 1, 1, 1]);
        assert_eq!(pages[0].width(), 7);
    }

    #[test]
    fn test_waitflag_without_flag_setter_pads_fully() {
        let mut pages = pages(".PROM 0\n.WAITFLAG\nRETURN").unwrap();
        expand_waitflags(&mut pages);
        assert_eq!(pages[0].width(), 7);
    }

    #[test]
    fn test_waitflag_already_settled_adds_nothing() {
        let mut pages = pages(".PROM 0\nALU not\nVALUE 1\n.WAITFLAG\nRETURN").unwrap();
        expand_waitflags(&mut pages);
        // 2 + 5 = 7 nibbles since the ALU started; no padding needed.
        assert_eq!(pages[0].width(), 8);
    }

    #[test]
    fn test_waitflag_consumed_by_expansion() {
        let mut pages = pages(".PROM 0\nALU not\n.WAITFLAG\nRETURN").unwrap();
        expand_waitflags(&mut pages);
        assert!(pages[0]
            .lines
            .iter()
            .all(|l| l.kind != LineKind::Directive(Directive::Waitflag)));
    }
}
