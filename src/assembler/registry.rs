//! The instruction registry: every mnemonic the assembler knows, what it
//! encodes to, and which operands it accepts.
//!
//! Instructions are grouped by operand contract. Each group maps one or
//! more mnemonics to their opcode byte.
//!
//! ```text
//! NOP STOP                    ; no operands
//! JMP/JE/JNE/JG/JS  TARGET    ; register, int24 or label
//! MOV/STORE  REG, VALUE       ; register, int, float or label
//! LOAD       REG, ADDR        ; register or int24
//! ADD..SHR, ITOF  REG, VALUE  ; register or int
//! FADD..FTOI REG, VALUE       ; register or float
//! AND/OR/NOT REG, VALUE       ; register or int
//! CMP/UCMP   REG, VALUE       ; register or int
//! FCMP       REG, VALUE       ; register or float
//! SSET       REG, VALUE       ; register or int
//! SOUT       VALUE            ; register or int24
//! PUSH       VALUE            ; microcode
//! POP        REG              ; microcode
//! ```
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use once_cell::sync::Lazy;

use super::ast::ValueType;

/// An entry in an allowed-type set.
///
/// `Int` is the bare base type: it accepts integers of any width.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeSpec {
    Register,
    Int,
    Int24,
    Int32,
    Float,
    Label,
}

impl TypeSpec {
    pub fn accepts(&self, ty: ValueType) -> bool {
        match (self, ty) {
            (TypeSpec::Register, ValueType::Register) |
            (TypeSpec::Int24, ValueType::Int24) |
            (TypeSpec::Int32, ValueType::Int32) |
            (TypeSpec::Int, ValueType::Int24) |
            (TypeSpec::Int, ValueType::Int32) |
            (TypeSpec::Float, ValueType::Float) |
            (TypeSpec::Label, ValueType::Label) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TypeSpec::Register => "register",
            TypeSpec::Int      => "int",
            TypeSpec::Int24    => "int24",
            TypeSpec::Int32    => "int32",
            TypeSpec::Float    => "float",
            TypeSpec::Label    => "label",
        };
        write!(f, "{}", name)
    }
}

/// Renders an allowed-type set the way diagnostics print it.
pub fn describe(types: &[TypeSpec]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" | ")
}

/// One group of mnemonics sharing an operand contract.
#[derive(Debug)]
pub struct InstructionConfig {
    pub opcodes: &'static [(&'static str, u8)],
    pub arity: usize,
    pub first: &'static [TypeSpec],
    pub second: &'static [TypeSpec],
    /// The sole operand is encoded in the second register slot.
    pub skip_first_register: bool,
    /// Template substituted with `%0`, `%1`, ... and assembled in place
    /// of the instruction.
    pub microcode: Option<&'static str>,
}

impl InstructionConfig {
    /// Allowed types for the operand at `position`.
    pub fn allowed(&self, position: usize) -> &'static [TypeSpec] {
        match position {
            0 => self.first,
            1 => self.second,
            _ => &[],
        }
    }
}

use TypeSpec::*;

const VALUE: &[TypeSpec] = &[Register, Int, Float, Label];
const INTEGER: &[TypeSpec] = &[Register, Int];
const FLOAT: &[TypeSpec] = &[Register, Float];

static CONFIGS: &[InstructionConfig] = &[
    InstructionConfig {
        opcodes: &[("NOP", 0x00), ("STOP", 0xFF)],
        arity: 0, first: &[], second: &[],
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("JMP", 0x40), ("JE", 0x41), ("JNE", 0x42), ("JG", 0x43), ("JS", 0x44)],
        arity: 1, first: &[Register, Int24, Label], second: &[],
        skip_first_register: true, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("MOV", 0x02), ("STORE", 0x03)],
        arity: 2, first: &[Register], second: VALUE,
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("LOAD", 0x04)],
        arity: 2, first: &[Register], second: &[Register, Int24],
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("PUSH", 0x05)],
        arity: 1, first: VALUE, second: &[],
        skip_first_register: false,
        microcode: Some("SUB %RSP, 1\nSTORE %RSP, %0\n"),
    },
    InstructionConfig {
        opcodes: &[("POP", 0x06)],
        arity: 1, first: &[Register], second: &[],
        skip_first_register: false,
        microcode: Some("LOAD %0, %RSP\nADD %RSP, 1\n"),
    },
    InstructionConfig {
        opcodes: &[
            ("ADD", 0x10), ("SUB", 0x11), ("MUL", 0x12), ("DIV", 0x13),
            ("NEG", 0x14), ("SHL", 0x15), ("SHR", 0x16), ("ITOF", 0x26),
        ],
        arity: 2, first: &[Register], second: INTEGER,
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[
            ("FADD", 0x20), ("FSUB", 0x21), ("FMUL", 0x22),
            ("FDIV", 0x23), ("FNEG", 0x24), ("FTOI", 0x25),
        ],
        arity: 2, first: &[Register], second: FLOAT,
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("AND", 0x30), ("OR", 0x31), ("NOT", 0x32)],
        arity: 2, first: &[Register], second: INTEGER,
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("CMP", 0x18), ("UCMP", 0x19)],
        arity: 2, first: &[Register], second: INTEGER,
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("FCMP", 0x1A)],
        arity: 2, first: &[Register], second: FLOAT,
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("SSET", 0x80)],
        arity: 2, first: &[Register], second: INTEGER,
        skip_first_register: false, microcode: None,
    },
    InstructionConfig {
        opcodes: &[("SOUT", 0x81)],
        arity: 1, first: &[Register, Int24], second: &[],
        skip_first_register: true, microcode: None,
    },
];

/// A resolved registry entry for a single mnemonic.
#[derive(Copy, Clone, Debug)]
pub struct Definition {
    pub mnemonic: &'static str,
    pub opcode: u8,
    pub config: &'static InstructionConfig,
}

impl Definition {
    pub fn arity(&self) -> usize {
        self.config.arity
    }

    pub fn skip_first_register(&self) -> bool {
        self.config.skip_first_register
    }

    pub fn microcode(&self) -> Option<&'static str> {
        self.config.microcode
    }
}

static BY_MNEMONIC: Lazy<HashMap<&'static str, Definition>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for config in CONFIGS.iter() {
        for &(mnemonic, opcode) in config.opcodes.iter() {
            map.insert(mnemonic, Definition { mnemonic, opcode, config });
        }
    }
    map
});

static BY_OPCODE: Lazy<HashMap<u8, Definition>> = Lazy::new(|| {
    BY_MNEMONIC.values().map(|def| (def.opcode, *def)).collect()
});

/// Finds the definition for a mnemonic. Matching is case-sensitive.
pub fn lookup(mnemonic: &str) -> Option<Definition> {
    BY_MNEMONIC.get(mnemonic).copied()
}

/// Finds the definition that encodes to `opcode`.
pub fn by_opcode(opcode: u8) -> Option<Definition> {
    BY_OPCODE.get(&opcode).copied()
}

pub fn is_mnemonic(word: &str) -> bool {
    BY_MNEMONIC.contains_key(word)
}

pub fn all_mnemonics() -> BTreeSet<&'static str> {
    BY_MNEMONIC.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_unique_entries() {
        let mut mnemonics = HashSet::new();
        let mut opcodes = HashSet::new();
        for config in CONFIGS.iter() {
            for &(mnemonic, opcode) in config.opcodes.iter() {
                assert!(mnemonics.insert(mnemonic), "duplicate mnemonic {}", mnemonic);
                assert!(opcodes.insert(opcode), "duplicate opcode {:#04x}", opcode);
            }
        }
        assert_eq!(all_mnemonics().len(), mnemonics.len());
    }

    #[test]
    fn test_config_shape() {
        for config in CONFIGS.iter() {
            assert!(config.arity <= 2);
            assert_eq!(config.first.is_empty(), config.arity < 1);
            assert_eq!(config.second.is_empty(), config.arity < 2);
            // The options byte has room for two register slots.
            if config.skip_first_register {
                assert!(config.arity <= 1);
            }
        }
    }

    #[test]
    fn test_lookup() {
        let def = lookup("MOV").unwrap();
        assert_eq!(def.opcode, 0x02);
        assert_eq!(def.arity(), 2);

        let def = lookup("JMP").unwrap();
        assert_eq!(def.opcode, 0x40);
        assert!(def.skip_first_register());

        assert_eq!(lookup("STOP").unwrap().opcode, 0xFF);
        assert_eq!(lookup("SSET").unwrap().opcode, 0x80);
        assert_eq!(lookup("SOUT").unwrap().opcode, 0x81);
        assert!(lookup("PUSH").unwrap().microcode().is_some());
        assert!(lookup("ADD").unwrap().microcode().is_none());

        assert!(lookup("mov").is_none());
        assert!(lookup("CALL").is_none());
        assert!(!is_mnemonic("loop"));
        assert!(is_mnemonic("FCMP"));
    }

    #[test]
    fn test_by_opcode() {
        for mnemonic in all_mnemonics() {
            let def = lookup(mnemonic).unwrap();
            assert_eq!(by_opcode(def.opcode).unwrap().mnemonic, mnemonic);
        }
        assert!(by_opcode(0x7F).is_none());
    }

    #[test]
    fn test_type_spec() {
        assert!(Int.accepts(ValueType::Int24));
        assert!(Int.accepts(ValueType::Int32));
        assert!(Int24.accepts(ValueType::Int24));
        assert!(!Int24.accepts(ValueType::Int32));
        assert!(!Int.accepts(ValueType::Float));
        assert!(Label.accepts(ValueType::Label));
        assert!(!Register.accepts(ValueType::Label));
        assert_eq!(describe(&[Register, Int24, Label]), "register | int24 | label");
    }
}
