//! Turns an expanded, type-checked program into machine code.
//!
//! Every instruction starts with a header:
//!
//! ```text
//! byte 0-1  reserved, zero
//! byte 2    opcode
//! byte 3    options: rrr sss L 0
//!           rrr  register in slot 0 (bits 5-7)
//!           sss  register in slot 1 (bits 2-4)
//!           L    a literal word follows (USE_LITERAL)
//! ```
//!
//! followed by a big-endian literal word when any operand is an integer,
//! float or label. Labels are emitted as zero and patched once every
//! label address is known. Addresses are in words (4 bytes).
use std::collections::HashMap;
use std::convert::TryFrom;

use super::ast::*;
use super::error::CompileError;
use super::registry::{self, Definition};

/// Options bit set when a literal word follows the header.
pub const USE_LITERAL: u8 = 1 << 1;

/// How instructions without operands are laid out.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NullaryEncoding {
    /// Opcode followed by two zero bytes: five bytes in all, which
    /// leaves later instructions off word alignment.
    Legacy,
    /// Opcode followed by a zero options byte, like every other header.
    Aligned,
}

impl Default for NullaryEncoding {
    fn default() -> Self {
        NullaryEncoding::Legacy
    }
}

/// One encoded instruction, for listings.
#[derive(Clone, PartialEq, Debug)]
pub struct ListingEntry {
    /// Byte offset of the header.
    pub offset: usize,
    pub text: String,
    pub bytes: Vec<u8>,
}

/// The result of code generation.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Assembled {
    pub bytes: Vec<u8>,
    /// Word address of every label.
    pub labels: HashMap<String, u32>,
    pub listing: Vec<ListingEntry>,
}

impl Assembled {
    /// The complete big-endian words of the output. A trailing partial
    /// word is not included.
    pub fn words(&self) -> Vec<u32> {
        self.bytes
            .chunks_exact(4)
            .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
            .collect()
    }

    /// Renders the output as space-separated 8-digit hex words.
    pub fn to_hex(&self) -> String {
        self.words().iter().map(|w| format!("{:08x}", w)).collect::<Vec<_>>().join(" ")
    }
}

enum Literal {
    Word(u32),
    Label(String),
}

/// Code generation state for one run.
pub struct Generator {
    nullary: NullaryEncoding,
    bytes: Vec<u8>,
    labels: HashMap<String, u32>,
    /// Byte offset of each placeholder, with the label it waits for.
    unresolved: Vec<(usize, String, Location)>,
    listing: Vec<ListingEntry>,
}

impl Generator {
    pub fn new(nullary: NullaryEncoding) -> Self {
        Generator {
            nullary,
            bytes: Vec::new(),
            labels: HashMap::new(),
            unresolved: Vec::new(),
            listing: Vec::new(),
        }
    }

    /// Emits the whole program, then patches label uses.
    pub fn generate(mut self, program: &Program) -> Result<Assembled, CompileError> {
        for decl in program.declarations.iter() {
            match decl {
                Declaration::LabelDecl(decl) => self.label_decl(decl),
                Declaration::Instruction(ins) => self.instruction(ins)?,
            }
        }
        self.resolve_labels()?;

        info!("generated {} byte(s), {} label(s)", self.bytes.len(), self.labels.len());
        Ok(Assembled { bytes: self.bytes, labels: self.labels, listing: self.listing })
    }

    fn word_address(&self) -> u32 {
        (self.bytes.len() / 4) as u32
    }

    fn write(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Label names are unique once the type checker has run.
    fn label_decl(&mut self, decl: &LabelDecl) {
        let addr = self.word_address();
        debug!("label {} at {}", decl.name, addr);
        self.labels.insert(decl.name.clone(), addr);
    }

    fn instruction(&mut self, ins: &Instruction) -> Result<(), CompileError> {
        let def = registry::lookup(&ins.mnemonic).ok_or_else(|| CompileError::UnknownMnemonic {
            mnemonic: ins.mnemonic.clone(),
            loc: ins.loc.clone(),
        })?;
        let start = self.bytes.len();

        self.write(&[0, 0, def.opcode]);

        if ins.operands.is_empty() {
            match self.nullary {
                NullaryEncoding::Legacy => self.write(&[0, 0]),
                NullaryEncoding::Aligned => self.write(&[0]),
            }
        } else {
            let (options, literal) = encode_operands(def, ins)?;
            self.write(&[options]);

            match literal {
                Some(Literal::Word(word)) => self.write(&word.to_be_bytes()),
                Some(Literal::Label(name)) => {
                    let offset = self.bytes.len();
                    self.unresolved.push((offset, name, ins.loc.clone()));
                    self.write(&[0; 4]);
                },
                None => {},
            }
        }

        let bytes = self.bytes[start..].to_vec();
        trace!("{:06x}: {} => {:02x?}", start, ins, bytes);
        self.listing.push(ListingEntry { offset: start, text: ins.to_string(), bytes });
        Ok(())
    }

    fn resolve_labels(&mut self) -> Result<(), CompileError> {
        for (offset, name, loc) in self.unresolved.iter() {
            let addr = match self.labels.get(name) {
                Some(addr) => *addr,
                None => return Err(CompileError::UnresolvedLabel { name: name.clone(), loc: loc.clone() }),
            };
            self.bytes[*offset..*offset + 4].copy_from_slice(&addr.to_be_bytes());

            // Keep the listing in step with the patched output.
            if let Some(entry) = self.listing.iter_mut().rev().find(|e| e.offset < *offset) {
                let at = *offset - entry.offset;
                entry.bytes[at..at + 4].copy_from_slice(&addr.to_be_bytes());
            }
        }
        Ok(())
    }
}

/// Builds the options byte and picks the literal word, if any.
/// When several operands are literals the last one is emitted.
fn encode_operands(def: Definition, ins: &Instruction) -> Result<(u8, Option<Literal>), CompileError> {
    let mut options = 0u8;
    let mut literal = None;

    for (idx, op) in ins.operands.iter().enumerate() {
        match &op.value {
            Value::Register(reg) => {
                let slot = if def.skip_first_register() { idx + 1 } else { idx };
                let shift = match slot {
                    0 => 5,
                    1 => 2,
                    _ => return Err(CompileError::Encoding {
                        mnemonic: ins.mnemonic.clone(),
                        reason: format!("no register slot {}", slot),
                        loc: op.loc.clone(),
                    }),
                };
                options |= reg.code() << shift;
            },
            Value::Int(v) => {
                options |= USE_LITERAL;
                literal = Some(Literal::Word(*v));
            },
            Value::Float(v) => {
                options |= USE_LITERAL;
                literal = Some(Literal::Word((*v as f32).to_bits()));
            },
            Value::Label(name) => {
                options |= USE_LITERAL;
                literal = Some(Literal::Label(name.clone()));
            },
        }
    }
    Ok((options, literal))
}

/// Generates code with a fresh context.
pub fn generate(program: &Program, nullary: NullaryEncoding) -> Result<Assembled, CompileError> {
    Generator::new(nullary).generate(program)
}

#[derive(Clone, PartialEq, Debug)]
pub enum DecodedOperand {
    Register(Register),
    /// The raw literal word. Its meaning (integer, float bits or word
    /// address) depends on the instruction.
    Literal(u32),
}

#[derive(Clone, Debug)]
pub struct Decoded {
    pub definition: Definition,
    pub operands: Vec<DecodedOperand>,
    /// Bytes consumed.
    pub len: usize,
}

/// Decodes one instruction from the start of `bytes`. `nullary` must be
/// the layout the code was generated with.
pub fn decode(bytes: &[u8], nullary: NullaryEncoding) -> Result<Decoded, CompileError> {
    let loc = Location::new("<binary>", 1, 1);
    let truncated = || CompileError::Encoding {
        mnemonic: String::new(),
        reason: "truncated instruction".to_owned(),
        loc: loc.clone(),
    };

    if bytes.len() < 4 {
        return Err(truncated());
    }
    let definition = registry::by_opcode(bytes[2]).ok_or_else(|| CompileError::UnknownMnemonic {
        mnemonic: format!("{:#04x}", bytes[2]),
        loc: loc.clone(),
    })?;
    if definition.arity() == 0 {
        let len = match nullary {
            NullaryEncoding::Legacy => 5,
            NullaryEncoding::Aligned => 4,
        };
        if bytes.len() < len {
            return Err(truncated());
        }
        return Ok(Decoded { definition, operands: Vec::new(), len });
    }

    let options = bytes[3];
    let register = |shift: u8| {
        // Three bits always name a register.
        Register::try_from((options >> shift) & 0b111).map(DecodedOperand::Register)
    };
    let reg_err = |reason: String| CompileError::Encoding {
        mnemonic: definition.mnemonic.to_owned(),
        reason,
        loc: loc.clone(),
    };

    let has_literal = options & USE_LITERAL != 0;
    let literal = if has_literal {
        if bytes.len() < 8 {
            return Err(truncated());
        }
        Some(DecodedOperand::Literal(u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])))
    } else {
        None
    };

    let mut operands = Vec::new();
    match (definition.arity(), literal) {
        (1, Some(lit)) => operands.push(lit),
        (1, None) => {
            let shift = if definition.skip_first_register() { 2 } else { 5 };
            operands.push(register(shift).map_err(&reg_err)?);
        },
        (_, Some(lit)) => {
            operands.push(register(5).map_err(&reg_err)?);
            operands.push(lit);
        },
        (_, None) => {
            operands.push(register(5).map_err(&reg_err)?);
            operands.push(register(2).map_err(&reg_err)?);
        },
    }

    let len = if has_literal { 8 } else { 4 };
    Ok(Decoded { definition, operands, len })
}
