//! Two-pass assembler.
//!
//! Pass 1 walks the statement stream collecting symbol addresses and the
//! final program extent; pass 2 re-walks it emitting bytes with every symbol
//! resolvable. Both passes advance the program counter by the same byte
//! counts, so the address trajectories are identical.

use std::collections::HashMap;

use crate::pulse::AsmError;
use crate::pulse::lexer::{Value, tokenize};
use crate::pulse::opcodes::{Mode, lookup};
use crate::pulse::parser::{Operand, Statement, parse};

/// An assembled program image covering `[origin, origin + binary.len())`.
/// Holes between non-contiguous `.org` regions read as 0.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub origin: u16,
    pub binary: Vec<u8>,
    pub symbols: HashMap<String, u16>,
    /// Address of each instruction's first byte → 1-based source line.
    pub source_map: HashMap<u16, u32>,
}

impl Program {
    /// First address past the image.
    pub fn end(&self) -> u32 {
        self.origin as u32 + self.binary.len() as u32
    }

    pub fn covers(&self, addr: u16) -> bool {
        (addr as u32) >= self.origin as u32 && (addr as u32) < self.end()
    }

    /// Render `addr: bytes  source` rows for every mapped instruction.
    pub fn listing(&self, source: &str) -> String {
        let lines: Vec<&str> = source.lines().collect();
        let mut addrs: Vec<u16> = self.source_map.keys().copied().collect();
        addrs.sort_unstable();

        let mut out = String::new();
        for (i, &addr) in addrs.iter().enumerate() {
            let next = addrs
                .get(i + 1)
                .map(|&a| a as u32)
                .unwrap_or_else(|| self.end());
            let start = (addr as u32 - self.origin as u32) as usize;
            let len = (next - addr as u32).min(3) as usize;
            let bytes: Vec<String> = self.binary[start..start + len]
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect();
            let line = self.source_map[&addr];
            let text = lines.get(line as usize - 1).copied().unwrap_or("");
            out.push_str(&format!(
                "{addr:04X}: {:<8}  {}\n",
                bytes.join(" "),
                text.trim_end()
            ));
        }
        out
    }
}

pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let statements = parse(&tokenize(source)?)?;

    // ---- Pass 1: addresses ----
    let mut symbols: HashMap<String, u16> = HashMap::new();
    let mut pc: u32 = 0;
    let mut origin: Option<u32> = None;
    let mut end: u32 = 0;

    for stmt in &statements {
        match stmt {
            Statement::Constant { name, value, line } => {
                if symbols.insert(name.clone(), *value as u16).is_some() {
                    return Err(AsmError {
                        message: format!("duplicate symbol '{name}'"),
                        line: *line,
                    });
                }
            }
            Statement::Label { name, line } => {
                if symbols.insert(name.clone(), pc as u16).is_some() {
                    return Err(AsmError {
                        message: format!("duplicate symbol '{name}'"),
                        line: *line,
                    });
                }
            }
            Statement::Directive { name, values, line } => match name.as_str() {
                "org" => {
                    pc = org_address(values, *line)?;
                    if origin.is_none() {
                        origin = Some(pc);
                    }
                }
                "word" => {
                    mark_origin(&mut origin, pc);
                    pc += 2 * values.len() as u32;
                }
                "byte" | "db" => {
                    mark_origin(&mut origin, pc);
                    pc += values.len() as u32;
                }
                other => {
                    return Err(AsmError {
                        message: format!("unknown directive '.{other}'"),
                        line: *line,
                    });
                }
            },
            Statement::Instruction {
                mnemonic,
                operand,
                line,
            } => {
                mark_origin(&mut origin, pc);
                let (_, mode) = encoding_for(mnemonic, operand, *line)?;
                pc += mode.bytes() as u32;
            }
        }
        end = end.max(pc);
    }

    // ---- Pass 2: emission ----
    let origin = origin.unwrap_or(0);
    let mut program = Program {
        origin: origin as u16,
        binary: vec![0; (end.saturating_sub(origin)) as usize],
        symbols,
        source_map: HashMap::new(),
    };
    let mut pc = origin;

    for stmt in &statements {
        match stmt {
            Statement::Constant { .. } | Statement::Label { .. } => {}
            Statement::Directive { name, values, line } => match name.as_str() {
                "org" => {
                    pc = org_address(values, *line)?;
                    if pc < origin {
                        return Err(AsmError {
                            message: format!(
                                "'.org' address ${pc:04X} precedes origin ${origin:04X}"
                            ),
                            line: *line,
                        });
                    }
                }
                "word" => {
                    for value in values {
                        let v = resolve(value, &program.symbols, *line)?;
                        program.binary[(pc - origin) as usize] = v as u8;
                        program.binary[(pc - origin) as usize + 1] = (v >> 8) as u8;
                        pc += 2;
                    }
                }
                "byte" | "db" => {
                    for value in values {
                        let v = resolve(value, &program.symbols, *line)?;
                        program.binary[(pc - origin) as usize] = v as u8;
                        pc += 1;
                    }
                }
                _ => {}
            },
            Statement::Instruction {
                mnemonic,
                operand,
                line,
            } => {
                let (opcode, mode) = encoding_for(mnemonic, operand, *line)?;
                program.source_map.insert(pc as u16, *line);
                let offset = (pc - origin) as usize;
                program.binary[offset] = opcode;

                match (mode, operand) {
                    (Mode::Implied, _) => {}
                    (Mode::Immediate, Operand::Immediate(value)) => {
                        let v = resolve(value, &program.symbols, *line)?;
                        program.binary[offset + 1] = v as u8;
                    }
                    (Mode::Absolute, Operand::Address(value)) => {
                        let v = resolve(value, &program.symbols, *line)?;
                        program.binary[offset + 1] = v as u8;
                        program.binary[offset + 2] = (v >> 8) as u8;
                    }
                    (Mode::Relative, Operand::Address(value)) => {
                        let target = resolve(value, &program.symbols, *line)? as i32;
                        let from = (pc + mode.bytes() as u32) as i32;
                        let delta = target - from;
                        if !(-128..=127).contains(&delta) {
                            return Err(AsmError {
                                message: format!(
                                    "branch target out of range ({delta} bytes)"
                                ),
                                line: *line,
                            });
                        }
                        program.binary[offset + 1] = delta as u8;
                    }
                    _ => {
                        return Err(AsmError {
                            message: format!("malformed operand for {mnemonic}"),
                            line: *line,
                        });
                    }
                }
                pc += mode.bytes() as u32;
            }
        }
    }

    Ok(program)
}

fn mark_origin(origin: &mut Option<u32>, pc: u32) {
    if origin.is_none() {
        *origin = Some(pc);
    }
}

fn org_address(values: &[Value], line: u32) -> Result<u32, AsmError> {
    match values {
        [Value::Number(addr)] => Ok(addr & 0xFFFF),
        _ => Err(AsmError {
            message: "'.org' expects one numeric address".into(),
            line,
        }),
    }
}

fn resolve(
    value: &Value,
    symbols: &HashMap<String, u16>,
    line: u32,
) -> Result<u16, AsmError> {
    match value {
        Value::Number(v) => Ok(*v as u16),
        Value::Symbol(name) => symbols.get(name).copied().ok_or_else(|| AsmError {
            message: format!("undefined symbol '{name}'"),
            line,
        }),
    }
}

/// Settle `(mnemonic, syntactic operand)` against the opcode table. An
/// address-shaped operand tries absolute first, then relative (branches).
fn encoding_for(
    mnemonic: &str,
    operand: &Operand,
    line: u32,
) -> Result<(u8, Mode), AsmError> {
    let modes: &[Mode] = match operand {
        Operand::Implied => &[Mode::Implied],
        Operand::Immediate(_) => &[Mode::Immediate],
        Operand::Address(_) => &[Mode::Absolute, Mode::Relative],
    };
    for &mode in modes {
        if let Some(opcode) = lookup(mnemonic, mode) {
            return Ok((opcode, mode));
        }
    }
    Err(AsmError {
        message: format!("unknown instruction '{mnemonic}' with {} operand", modes[0]),
        line,
    })
}
