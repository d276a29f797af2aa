//! This AST describes a parsed 4VIN assembly file.
//!
//! A program is a flat sequence of declarations: instructions and
//! label declarations. Execution begins with the first instruction.
//! Comments start with `//` and run to the end of the line.
//! Instructions are terminated by one or more newlines.
//!
//! Example source file:
//!
//! ```nasm
//! // Count RA down from 0x10 and print it.
//!         MOV %RA, 0x10
//! $loop:
//!         SOUT %RA
//!         SUB %RA, 1
//!         CMP %RA, 0
//!         JNE $loop
//!         FADD %RB, 1.5
//!         STOP
//! ```
//!
//! Registers are prefixed with `%`, labels with `$`.
//! Mnemonics and register names are case-sensitive.

use std::fmt;

/// Where a token or node came from, for diagnostics.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Location {
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, relative to the most recent newline.
    pub column: usize,
}

impl Location {
    pub fn new(file: &str, line: usize, column: usize) -> Self {
        Location { file: file.to_owned(), line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Register {
    RA,
    RB,
    RC,
    RD,
    RE,
    RF,
    RSP,
    RBP,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.name())
    }
}

impl std::convert::TryFrom<u8> for Register {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Register::*;
        match value {
            0 => Ok(RA),
            1 => Ok(RB),
            2 => Ok(RC),
            3 => Ok(RD),
            4 => Ok(RE),
            5 => Ok(RF),
            6 => Ok(RSP),
            7 => Ok(RBP),
            _ => Err("registers may only have codes from 0-7 inclusive".to_owned()),
        }
    }
}

impl Register {
    /// Looks up a register by its name without the `%` sigil.
    pub fn from_name(name: &str) -> Option<Register> {
        use Register::*;
        match name {
            "RA"  => Some(RA),
            "RB"  => Some(RB),
            "RC"  => Some(RC),
            "RD"  => Some(RD),
            "RE"  => Some(RE),
            "RF"  => Some(RF),
            "RSP" => Some(RSP),
            "RBP" => Some(RBP),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        use Register::*;
        match self {
            RA  => "RA",
            RB  => "RB",
            RC  => "RC",
            RD  => "RD",
            RE  => "RE",
            RF  => "RF",
            RSP => "RSP",
            RBP => "RBP",
        }
    }

    /// The 3-bit code packed into the options byte.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Largest integer that still counts as a 24-bit literal.
pub const INT24_MAX: u32 = 0x00FF_FFFF;

/// The type tag of an operand, as checked against the instruction registry.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ValueType {
    Register,
    Int24,
    Int32,
    Float,
    Label,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueType::Register => "register",
            ValueType::Int24    => "int24",
            ValueType::Int32    => "int32",
            ValueType::Float    => "float",
            ValueType::Label    => "label",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Register(Register),
    Int(u32),
    Float(f64),
    /// A reference to a label, by name.
    Label(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Register(_) => ValueType::Register,
            Value::Int(v) if *v <= INT24_MAX => ValueType::Int24,
            Value::Int(_) => ValueType::Int32,
            Value::Float(_) => ValueType::Float,
            Value::Label(_) => ValueType::Label,
        }
    }

    /// Anything but a register needs a literal word after the header.
    pub fn is_literal(&self) -> bool {
        !matches!(self, Value::Register(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Register(reg) => write!(f, "{}", reg),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => {
                // Must stay a float literal when lexed again.
                let s = v.to_string();
                if s.contains('.') {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{}.0", s)
                }
            }
            Value::Label(name) => write!(f, "${}", name),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Operand {
    pub value: Value,
    pub loc: Location,
}

impl Operand {
    pub fn new(value: Value, loc: Location) -> Self {
        Operand { value, loc }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Instruction {
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    pub loc: Location,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for (idx, op) in self.operands.iter().enumerate() {
            let sep = if idx == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, op)?;
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LabelDecl {
    pub name: String,
    pub loc: Location,
}

impl fmt::Display for LabelDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}:", self.name)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Declaration {
    LabelDecl(LabelDecl),
    Instruction(Instruction),
}

impl Declaration {
    pub fn loc(&self) -> &Location {
        match self {
            Declaration::LabelDecl(decl) => &decl.loc,
            Declaration::Instruction(ins) => &ins.loc,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Declaration::LabelDecl(decl) => write!(f, "{}", decl),
            Declaration::Instruction(ins) => write!(f, "{}", ins),
        }
    }
}

/// The root of the tree. Owns its declarations in source order.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

impl Program {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Program { declarations }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for decl in self.declarations.iter() {
            writeln!(f, "{}", decl)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn test_register_codes() {
        for code in 0..=7u8 {
            let reg = Register::try_from(code).unwrap();
            assert_eq!(reg.code(), code);
            assert_eq!(Register::from_name(reg.name()), Some(reg));
        }
        assert!(Register::try_from(8).is_err());
        assert_eq!(Register::from_name("RG"), None);
        assert_eq!(Register::from_name("rsp"), None);
        assert_eq!(Register::RSP.code(), 6);
        assert_eq!(Register::RBP.code(), 7);
    }

    #[test]
    fn test_int_width() {
        assert_eq!(Value::Int(0).value_type(), ValueType::Int24);
        assert_eq!(Value::Int(0xFF_FFFF).value_type(), ValueType::Int24);
        assert_eq!(Value::Int(0x100_0000).value_type(), ValueType::Int32);
        assert_eq!(Value::Int(u32::MAX).value_type(), ValueType::Int32);
    }

    #[test]
    fn test_display() {
        let loc = Location::new("t.asm", 1, 1);
        assert_eq!(Value::Register(Register::RSP).to_string(), "%RSP");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Float(1e20).to_string(), "100000000000000000000.0");
        assert_eq!(Value::Label("loop".to_owned()).to_string(), "$loop");

        let ins = Instruction {
            mnemonic: "MOV".to_owned(),
            operands: vec![
                Operand::new(Value::Register(Register::RA), loc.clone()),
                Operand::new(Value::Int(10), loc.clone()),
            ],
            loc: loc.clone(),
        };
        let program = Program::new(vec![
            Declaration::LabelDecl(LabelDecl { name: "start".to_owned(), loc: loc.clone() }),
            Declaration::Instruction(ins),
            Declaration::Instruction(Instruction { mnemonic: "NOP".to_owned(), operands: vec![], loc }),
        ]);
        assert_eq!(program.to_string(), "$start:\nMOV %RA, 10\nNOP\n");
    }
}
