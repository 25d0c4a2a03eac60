//! Operand parser.
//!
//! Turns a comment-stripped directive or operation line into its typed
//! record, enforcing arity and per-operand domains. Control-transfer
//! targets come out as `Pending` references; address resolution happens
//! later.

use crate::dialect::{AluRamClass, Dialect};
use crate::error::{AsmError, Result};
use crate::types::{AluRam, CallRef, Directive, JumpRef, Op};

/// Parse a directive line, given its text after the leading dot.
pub(crate) fn parse_directive(rest: &str, bare: &str, line: usize) -> Result<Directive> {
    let mut tokens = rest.split_whitespace();
    let cmd = tokens.next().unwrap_or("");
    let operands: Vec<&str> = tokens.collect();

    match cmd {
        "PROM" => {
            expect_arity(".PROM", &operands, 1, line)?;
            let page = parse_integer(operands[0], line)?;
            if !(0..16).contains(&page) {
                return Err(AsmError::BadDirectiveOperand {
                    message: format!("ROM page numbers range from 0-15, {} is out of this range", page),
                    line,
                });
            }
            Ok(Directive::Prom(page as u8))
        }
        "PRAM" => {
            expect_arity(".PRAM", &operands, 1, line)?;
            let addr = parse_integer(operands[0], line)?;
            if !(0..4096).contains(&addr) {
                return Err(AsmError::BadDirectiveOperand {
                    message: format!(
                        "RAM page addresses range from 0-4095, {} is out of this range",
                        addr
                    ),
                    line,
                });
            }
            Ok(Directive::Pram(addr as u16))
        }
        "LABEL" => {
            expect_arity(".LABEL", &operands, 1, line)?;
            Ok(Directive::Label(operands[0].to_string()))
        }
        "WAITFLAG" => {
            expect_arity(".WAITFLAG", &operands, 0, line)?;
            Ok(Directive::Waitflag)
        }
        _ => Err(AsmError::UnknownDirective {
            directive: cmd.to_string(),
            line,
            text: bare.to_string(),
        }),
    }
}

/// Parse an operation line into a typed [`Op`].
pub(crate) fn parse_operation(bare: &str, line: usize, dialect: &Dialect) -> Result<Op> {
    let mut tokens = bare.split_whitespace();
    let opcode = tokens.next().unwrap_or("");
    let operands: Vec<&str> = tokens.collect();

    match opcode {
        "PASS" => {
            expect_arity(opcode, &operands, 0, line)?;
            Ok(Op::Pass)
        }
        "VALUE" => {
            expect_arity(opcode, &operands, 1, line)?;
            let value = parse_integer(operands[0], line)?.rem_euclid(65536) as u16;
            Ok(Op::Value(value))
        }
        "JUMP" => {
            expect_arity(opcode, &operands, 1, line)?;
            Ok(Op::Jump(JumpRef::Pending(operands[0].to_string())))
        }
        "BRANCH" => {
            expect_arity(opcode, &operands, 2, line)?;
            let condition = dialect.branch_condition(operands[0]).ok_or_else(|| {
                AsmError::UnknownCondition {
                    condition: operands[0].to_string(),
                    line,
                    text: bare.to_string(),
                }
            })?;
            Ok(Op::Branch {
                condition,
                target: JumpRef::Pending(operands[1].to_string()),
            })
        }
        "PUSH" => {
            expect_arity(opcode, &operands, 1, line)?;
            Ok(Op::Push {
                register: parse_register(operands[0], line)?,
            })
        }
        "POP" => {
            expect_arity(opcode, &operands, 1, line)?;
            Ok(Op::Pop {
                register: parse_register(operands[0], line)?,
            })
        }
        "CALL" => {
            expect_arity(opcode, &operands, 1, line)?;
            Ok(Op::Call(CallRef::Pending(operands[0].to_string())))
        }
        "RETURN" => {
            expect_arity(opcode, &operands, 0, line)?;
            Ok(Op::Return)
        }
        "ADD" => {
            expect_arity(opcode, &operands, 1, line)?;
            Ok(Op::Add {
                register: parse_register(operands[0], line)?,
            })
        }
        "ROTATE" => {
            expect_arity(opcode, &operands, 2, line)?;
            let amount = parse_integer(operands[0], line)?.rem_euclid(16) as u8;
            Ok(Op::Rotate {
                amount,
                register: parse_register(operands[1], line)?,
            })
        }
        "ALU" => parse_alu_ram(AluRamClass::Alu, &operands, line, dialect).map(Op::Alu),
        "RAM" => parse_alu_ram(AluRamClass::Ram, &operands, line, dialect).map(Op::Ram),
        "INPUT" => {
            expect_arity(opcode, &operands, 0, line)?;
            Ok(Op::Input)
        }
        "OUTPUT" => {
            expect_arity(opcode, &operands, 1, line)?;
            Ok(Op::Output {
                octal: parse_octal_address(operands[0], line)?,
            })
        }
        _ => Err(AsmError::UnknownOpcode {
            opcode: opcode.to_string(),
            line,
            text: bare.to_string(),
        }),
    }
}

/// ALU/RAM select a sub-op table by arity: one operand is the unary table,
/// two is the binary table plus a register.
fn parse_alu_ram(
    class: AluRamClass,
    operands: &[&str],
    line: usize,
    dialect: &Dialect,
) -> Result<AluRam> {
    match operands {
        [name] => {
            let code = dialect.sub_op(class, false, name).ok_or_else(|| {
                AsmError::UnknownAluRamOp {
                    class: class.name().to_string(),
                    name: (*name).to_string(),
                    operands: 1,
                    line,
                }
            })?;
            Ok(AluRam::Unary { code })
        }
        [name, register] => {
            let code = dialect.sub_op(class, true, name).ok_or_else(|| {
                AsmError::UnknownAluRamOp {
                    class: class.name().to_string(),
                    name: (*name).to_string(),
                    operands: 2,
                    line,
                }
            })?;
            Ok(AluRam::Binary {
                code,
                register: parse_register(register, line)?,
            })
        }
        _ => Err(AsmError::BadOperandCount {
            mnemonic: class.name().to_string(),
            expected: "1 or 2".to_string(),
            actual: operands.len(),
            line,
        }),
    }
}

fn expect_arity(mnemonic: &str, operands: &[&str], expected: usize, line: usize) -> Result<()> {
    if operands.len() != expected {
        return Err(AsmError::BadOperandCount {
            mnemonic: mnemonic.to_string(),
            expected: expected.to_string(),
            actual: operands.len(),
            line,
        });
    }
    Ok(())
}

/// Parse a decimal integer literal; a leading sign is allowed.
fn parse_integer(token: &str, line: usize) -> Result<i64> {
    token.parse::<i64>().map_err(|_| AsmError::BadInteger {
        literal: token.to_string(),
        line,
    })
}

/// Parse an `rN` register operand, N in 0..=15.
fn parse_register(token: &str, line: usize) -> Result<u8> {
    let Some(digits) = token.strip_prefix('r') else {
        return Err(AsmError::BadRegister {
            literal: token.to_string(),
            message: "registers begin with `r`, for example `r5`".to_string(),
            line,
        });
    };
    let number = parse_integer(digits, line)?;
    if !(0..16).contains(&number) {
        return Err(AsmError::BadRegister {
            literal: token.to_string(),
            message: format!("registers range from r0-r15, r{} is out of this range", number),
            line,
        });
    }
    Ok(number as u8)
}

/// Parse a dot-separated octal device address, e.g. `1.2.3`.
fn parse_octal_address(token: &str, line: usize) -> Result<Vec<u8>> {
    let mut digits = Vec::new();
    for part in token.split('.') {
        let digit: i64 = part.parse().map_err(|_| AsmError::BadOctalAddress {
            literal: token.to_string(),
            line,
        })?;
        if !(0..8).contains(&digit) {
            return Err(AsmError::BadOctalAddress {
                literal: token.to_string(),
                line,
            });
        }
        digits.push(digit as u8);
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(text: &str) -> Result<Op> {
        parse_operation(text, 1, Dialect::p16())
    }

    fn dir(text: &str) -> Result<Directive> {
        let rest = text.strip_prefix('.').unwrap();
        parse_directive(rest, text, 1)
    }

    #[test]
    fn test_value_wraps_mod_65536() {
        assert_eq!(op("VALUE 65537").unwrap(), Op::Value(1));
        assert_eq!(op("VALUE -1").unwrap(), Op::Value(65535));
        assert_eq!(op("VALUE 0").unwrap(), Op::Value(0));
    }

    #[test]
    fn test_rotate_wraps_mod_16() {
        assert_eq!(
            op("ROTATE 17 r2").unwrap(),
            Op::Rotate {
                amount: 1,
                register: 2
            }
        );
        assert_eq!(
            op("ROTATE -1 r0").unwrap(),
            Op::Rotate {
                amount: 15,
                register: 0
            }
        );
    }

    #[test]
    fn test_register_domain() {
        assert_eq!(op("PUSH r15").unwrap(), Op::Push { register: 15 });
        assert!(matches!(
            op("PUSH r16").unwrap_err(),
            AsmError::BadRegister { .. }
        ));
        assert!(matches!(
            op("PUSH 5").unwrap_err(),
            AsmError::BadRegister { .. }
        ));
        assert!(matches!(
            op("PUSH rx").unwrap_err(),
            AsmError::BadInteger { .. }
        ));
    }

    #[test]
    fn test_branch_condition_aliases() {
        let branch = op("BRANCH Z start").unwrap();
        assert_eq!(
            branch,
            Op::Branch {
                condition: 2,
                target: JumpRef::Pending("start".to_string())
            }
        );
        assert!(matches!(
            op("BRANCH QQ start").unwrap_err(),
            AsmError::UnknownCondition { .. }
        ));
    }

    #[test]
    fn test_alu_arity_selects_table() {
        assert_eq!(op("ALU not").unwrap(), Op::Alu(AluRam::Unary { code: 0 }));
        assert_eq!(
            op("ALU sub r4").unwrap(),
            Op::Alu(AluRam::Binary {
                code: 0,
                register: 4
            })
        );
        assert_eq!(op("RAM read").unwrap(), Op::Ram(AluRam::Unary { code: 1 }));
        assert_eq!(
            op("RAM write r9").unwrap(),
            Op::Ram(AluRam::Binary {
                code: 1,
                register: 9
            })
        );
    }

    #[test]
    fn test_alu_wrong_table_or_arity() {
        // `sub` is a two-operand op; with one operand it is unknown.
        assert!(matches!(
            op("ALU sub").unwrap_err(),
            AsmError::UnknownAluRamOp { .. }
        ));
        assert!(matches!(
            op("ALU not r1 r2").unwrap_err(),
            AsmError::BadOperandCount { .. }
        ));
    }

    #[test]
    fn test_output_octal_address() {
        assert_eq!(
            op("OUTPUT 1.2.3").unwrap(),
            Op::Output {
                octal: vec![1, 2, 3]
            }
        );
        assert_eq!(op("OUTPUT 7").unwrap(), Op::Output { octal: vec![7] });
        assert!(matches!(
            op("OUTPUT 1.8").unwrap_err(),
            AsmError::BadOctalAddress { .. }
        ));
        assert!(matches!(
            op("OUTPUT 1..2").unwrap_err(),
            AsmError::BadOctalAddress { .. }
        ));
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(
            op("PASS r1").unwrap_err(),
            AsmError::BadOperandCount { .. }
        ));
        assert!(matches!(
            op("VALUE").unwrap_err(),
            AsmError::BadOperandCount { .. }
        ));
        assert!(matches!(
            op("BRANCH Z").unwrap_err(),
            AsmError::BadOperandCount { .. }
        ));
    }

    #[test]
    fn test_unknown_opcode() {
        assert!(matches!(
            op("NOPE").unwrap_err(),
            AsmError::UnknownOpcode { .. }
        ));
    }

    #[test]
    fn test_directives() {
        assert_eq!(dir(".PROM 15").unwrap(), Directive::Prom(15));
        assert_eq!(dir(".PRAM 4095").unwrap(), Directive::Pram(4095));
        assert_eq!(
            dir(".LABEL loop").unwrap(),
            Directive::Label("loop".to_string())
        );
        assert_eq!(dir(".WAITFLAG").unwrap(), Directive::Waitflag);
    }

    #[test]
    fn test_directive_domains() {
        assert!(matches!(
            dir(".PROM 16").unwrap_err(),
            AsmError::BadDirectiveOperand { .. }
        ));
        assert!(matches!(
            dir(".PRAM 4096").unwrap_err(),
            AsmError::BadDirectiveOperand { .. }
        ));
        assert!(matches!(
            dir(".SEGMENT 1").unwrap_err(),
            AsmError::UnknownDirective { .. }
        ));
        assert!(matches!(
            dir(".WAITFLAG now").unwrap_err(),
            AsmError::BadOperandCount { .. }
        ));
    }
}
