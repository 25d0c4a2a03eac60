//! Error types for the P16 assembler.
//!
//! This module defines all error types used throughout the assembler,
//! providing detailed diagnostics that carry the offending source line
//! and, where resolvable, the page or symbol involved.

use thiserror::Error;

/// Primary error type for the P16 assembler.
///
/// Compilation stops at the first detected error; there is no recovery
/// or partial output.
#[derive(Debug, Error)]
pub enum AsmError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The dialect table file is malformed or internally inconsistent.
    #[error("Dialect error: {message}")]
    Dialect { message: String },

    /// Unknown mnemonic at the start of an operation line.
    #[error("line {line}: unknown opcode `{opcode}` in `{text}`")]
    UnknownOpcode {
        opcode: String,
        line: usize,
        text: String,
    },

    /// Unknown directive command after the leading dot.
    #[error("line {line}: unknown directive `.{directive}` in `{text}`")]
    UnknownDirective {
        directive: String,
        line: usize,
        text: String,
    },

    /// BRANCH condition not found in the dialect's alias table.
    #[error("line {line}: unknown branch condition `{condition}` in `{text}`")]
    UnknownCondition {
        condition: String,
        line: usize,
        text: String,
    },

    /// ALU/RAM sub-operation not present in the arity-selected table.
    #[error("line {line}: `{name}` is not a valid {class} operation with {operands} operand(s)")]
    UnknownAluRamOp {
        class: String,
        name: String,
        operands: usize,
        line: usize,
    },

    /// Wrong number of operands for an opcode or directive.
    #[error("line {line}: `{mnemonic}` takes {expected} operand(s), got {actual}")]
    BadOperandCount {
        mnemonic: String,
        expected: String,
        actual: usize,
        line: usize,
    },

    /// Operand that should be an integer literal is not one.
    #[error("line {line}: `{literal}` is not an integer")]
    BadInteger { literal: String, line: usize },

    /// Malformed register operand (`rN`, N in 0..=15).
    #[error("line {line}: bad register `{literal}`: {message}")]
    BadRegister {
        literal: String,
        message: String,
        line: usize,
    },

    /// OUTPUT operand is not a dot-separated list of octal digits.
    #[error("line {line}: `{literal}` is not a dot-separated octal address")]
    BadOctalAddress { literal: String, line: usize },

    /// Directive operand outside its domain (page number, RAM address).
    #[error("line {line}: {message}")]
    BadDirectiveOperand { message: String, line: usize },

    /// Non-blank line before any `.PROM`/`.PRAM`, or a program with no pages.
    #[error("line {line}: code before any page directive; start with `.PROM 0` ({text})")]
    MissingPageDirective { line: usize, text: String },

    /// The same page was opened by two directives.
    #[error("line {line}: page {page} is already populated")]
    DuplicatePage {
        page: String,
        line: usize,
        text: String,
    },

    /// A label name was bound twice anywhere in the program.
    #[error("line {line}: label `{label}` is already defined")]
    DuplicateLabel {
        label: String,
        line: usize,
        text: String,
    },

    /// A jump/branch/call names a label that was never defined.
    #[error("line {line}: unresolved label `{label}` in `{text}`")]
    UnresolvedLabel {
        label: String,
        line: usize,
        text: String,
    },

    /// JUMP/BRANCH target lives in a different page.
    #[error("line {line}: `{label}` is in page {target_page}, but local jumps cannot leave page {page}")]
    CrossPageLocalJump {
        label: String,
        page: String,
        target_page: String,
        line: usize,
    },

    /// Two RAM pages claim the same nibble cell.
    #[error("RAM pages at {first} and {second} overlap at nibble {nibble}")]
    RamOverlap { first: u16, second: u16, nibble: u16 },

    /// A RAM page runs past the 4096-nibble address space.
    #[error("RAM page at {page} reaches nibble {nibble}, past the 4096-nibble address space")]
    RamOutOfRange { page: u16, nibble: u32 },

    /// An encoder precondition was violated; indicates a resolver bug.
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for assembler operations.
pub type Result<T> = std::result::Result<T, AsmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_line() {
        let err = AsmError::UnknownOpcode {
            opcode: "FROB".to_string(),
            line: 7,
            text: "FROB r1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("FROB"));
    }

    #[test]
    fn test_ram_overlap_display() {
        let err = AsmError::RamOverlap {
            first: 0,
            second: 2,
            nibble: 2,
        };
        assert!(err.to_string().contains("overlap"));
    }
}
