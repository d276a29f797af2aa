//! Validates a parsed program against the instruction registry.
//!
//! Default rules:
//! - all first operands of two-operand instructions must be registers
//! - second operands may be registers or constants, as configured
//!
//! Special rules:
//! - jump instructions take registers, 24-bit integers or labels
//! - float instructions only take floats as constants
//! - the load instruction takes at most a 24-bit address
//!
//! Labels may be used before they are declared. Uses are only checked
//! against declarations once the whole program has been visited.
use std::collections::HashMap;

use super::ast::*;
use super::error::CompileError;
use super::registry::{self, describe};

/// Per-run state of the type checker.
#[derive(Debug, Default)]
pub struct TypeContext {
    /// Declared labels and where they were declared.
    pub labels: HashMap<String, Location>,
    /// Label uses, in program order, waiting to be checked.
    pub unresolved: Vec<(String, Location)>,
}

impl TypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a whole program, returning the filled-in context.
    pub fn check(mut self, program: &Program) -> Result<TypeContext, CompileError> {
        for decl in program.declarations.iter() {
            match decl {
                Declaration::LabelDecl(decl) => self.label_decl(decl)?,
                Declaration::Instruction(ins) => self.instruction(ins)?,
            }
        }

        for (name, loc) in self.unresolved.iter() {
            if !self.labels.contains_key(name) {
                return Err(CompileError::UndeclaredLabel { name: name.clone(), loc: loc.clone() });
            }
        }

        debug!("typecheck: {} label(s), {} use(s)", self.labels.len(), self.unresolved.len());
        Ok(self)
    }

    fn label_decl(&mut self, decl: &LabelDecl) -> Result<(), CompileError> {
        if let Some(original) = self.labels.get(&decl.name) {
            return Err(CompileError::DuplicateLabel {
                name: decl.name.clone(),
                loc: decl.loc.clone(),
                original: original.clone(),
            });
        }
        self.labels.insert(decl.name.clone(), decl.loc.clone());
        Ok(())
    }

    fn instruction(&mut self, ins: &Instruction) -> Result<(), CompileError> {
        let def = registry::lookup(&ins.mnemonic).ok_or_else(|| CompileError::UnknownMnemonic {
            mnemonic: ins.mnemonic.clone(),
            loc: ins.loc.clone(),
        })?;

        if ins.operands.len() != def.arity() {
            return Err(CompileError::Arity {
                mnemonic: ins.mnemonic.clone(),
                expected: def.arity(),
                got: ins.operands.len(),
                loc: ins.loc.clone(),
            });
        }

        for (position, op) in ins.operands.iter().enumerate() {
            let allowed = def.config.allowed(position);
            let ty = op.value.value_type();
            if !allowed.iter().any(|spec| spec.accepts(ty)) {
                return Err(CompileError::OperandType {
                    expected: describe(allowed),
                    got: ty,
                    loc: op.loc.clone(),
                });
            }
        }

        for op in ins.operands.iter() {
            if let Value::Label(name) = &op.value {
                self.unresolved.push((name.clone(), op.loc.clone()));
            }
        }
        Ok(())
    }
}

/// Type checks a program with a fresh context.
pub fn typecheck(program: &Program) -> Result<TypeContext, CompileError> {
    TypeContext::new().check(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::parser::parse;

    fn check(src: &str) -> Result<TypeContext, CompileError> {
        typecheck(&parse("t", src).unwrap())
    }

    #[test]
    fn test_valid_program() {
        let ctx = check("\
MOV %RA, 10
MOV %RB, 0xFFFFFFFF
FADD %RC, 2.5
LOAD %RD, 0xFFFFFF
$loop:
SOUT %RA
JNE $loop
STOP
").unwrap();
        assert_eq!(ctx.labels.len(), 1);
        assert_eq!(ctx.unresolved.len(), 1);
    }

    #[test]
    fn test_forward_reference() {
        let ctx = check("JMP $end\nNOP\n$end:\nSTOP\n").unwrap();
        assert_eq!(ctx.labels["end"], Location::new("t", 3, 1));
    }

    #[test]
    fn test_undeclared_label() {
        match check("JMP $nowhere\n$somewhere:\nSTOP\n") {
            Err(CompileError::UndeclaredLabel { name, loc }) => {
                assert_eq!(name, "nowhere");
                assert_eq!((loc.line, loc.column), (1, 5));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_undeclared_label_reported_after_scan() {
        // The arity error later in the file wins: label uses are only
        // checked once every declaration has been visited.
        assert!(matches!(
            check("JMP $nowhere\nMOV %RA\n"),
            Err(CompileError::Arity { .. })
        ));
    }

    #[test]
    fn test_duplicate_label() {
        match check("$a:\nNOP\n$a:\nNOP\n") {
            Err(CompileError::DuplicateLabel { name, loc, original }) => {
                assert_eq!(name, "a");
                assert_eq!(loc, Location::new("t", 3, 1));
                assert_eq!(original, Location::new("t", 1, 1));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_arity() {
        match check("MOV %RA\n") {
            Err(e @ CompileError::Arity { .. }) => {
                assert_eq!(e.to_string(), "Expected 2 arguments, got 1");
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(check("NOP %RA\n"), Err(CompileError::Arity { expected: 0, got: 1, .. })));
        assert!(matches!(check("JMP\n"), Err(CompileError::Arity { expected: 1, got: 0, .. })));
    }

    #[test]
    fn test_operand_types() {
        match check("MOV 1, %RA\n") {
            Err(CompileError::OperandType { expected, got, loc }) => {
                assert_eq!(expected, "register");
                assert_eq!(got, ValueType::Int24);
                assert_eq!(loc.column, 5);
            },
            other => panic!("unexpected {:?}", other),
        }

        match check("ADD %RA, 1.5\n") {
            Err(CompileError::OperandType { expected, got, .. }) => {
                assert_eq!(expected, "register | int");
                assert_eq!(got, ValueType::Float);
            },
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(check("FADD %RA, 1\n"), Err(CompileError::OperandType { .. })));
        assert!(matches!(check("$x:\nADD %RA, $x\n"), Err(CompileError::OperandType { .. })));
    }

    #[test]
    fn test_int_widths() {
        // A bare `int` entry takes either width.
        assert!(check("ADD %RA, 0xFFFFFF\n").is_ok());
        assert!(check("ADD %RA, 0x1000000\n").is_ok());

        // `int24` only takes the narrow width.
        assert!(check("LOAD %RA, 0xFFFFFF\n").is_ok());
        assert!(matches!(
            check("LOAD %RA, 0x1000000\n"),
            Err(CompileError::OperandType { got: ValueType::Int32, .. })
        ));
        assert!(matches!(
            check("JMP 16777216\n"),
            Err(CompileError::OperandType { got: ValueType::Int32, .. })
        ));
    }

    #[test]
    fn test_fresh_context_per_run() {
        let program = parse("t", "$a:\nNOP\n").unwrap();
        assert!(typecheck(&program).is_ok());
        assert!(typecheck(&program).is_ok());
    }

    #[test]
    fn test_unknown_mnemonic() {
        let loc = Location::new("t", 1, 1);
        let program = Program::new(vec![Declaration::Instruction(Instruction {
            mnemonic: "CALL".to_owned(),
            operands: vec![],
            loc,
        })]);
        assert!(matches!(typecheck(&program), Err(CompileError::UnknownMnemonic { .. })));
    }
}
