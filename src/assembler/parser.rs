//! The Parser module takes a token stream (VecDeque<Token>) from the lexer
//! and converts it into an AST.
//!
//! ```text
//! program     := declaration+
//! declaration := instruction | label_decl
//! label_decl  := '$' ID ':' NEWLINE+
//! instruction := OPCODE NEWLINE+ | OPCODE args NEWLINE+
//! args        := value (',' value)*
//! value       := REGISTER | INTCONST | HEXCONST | FLOATCONST | '$' ID
//! ```
//!
//! Only the grammar is checked here. Operand counts and types are the
//! type checker's job.
use std::collections::VecDeque;

use super::ast::*;
use super::error::CompileError;
use super::lexer::{Token, TokenKind};

pub struct Parser {
    tokens: VecDeque<Token>,
    /// Reported when input runs out mid-production.
    eof: Location,
}

impl Parser {
    pub fn new(file: &str, tokens: VecDeque<Token>) -> Self {
        let eof = match tokens.back() {
            Some(tok) => tok.loc.clone(),
            None => Location::new(file, 1, 1),
        };
        Parser { tokens, eof }
    }

    /// Run the parser, consuming itself and returning the program.
    pub fn run(mut self) -> Result<Program, CompileError> {
        // Blank and comment-only lines before the first declaration.
        while self.peek_is(|k| *k == TokenKind::Newline) {
            self.consume();
        }

        let mut declarations = Vec::new();
        while !self.tokens.is_empty() {
            declarations.push(self.declaration()?);
        }

        if declarations.is_empty() {
            return Err(CompileError::UnexpectedEof { loc: self.eof });
        }
        Ok(Program::new(declarations))
    }

    fn declaration(&mut self) -> Result<Declaration, CompileError> {
        let tok = self.expect_token()?;
        match tok.kind {
            TokenKind::Opcode(mnemonic) => {
                let ins = self.instruction(mnemonic, tok.loc)?;
                Ok(Declaration::Instruction(ins))
            },
            TokenKind::Dollar => {
                let decl = self.label_decl(tok.loc)?;
                Ok(Declaration::LabelDecl(decl))
            },
            _ => Err(syntax_error(tok)),
        }
    }

    /// Parses the rest of a label declaration after its `$`.
    fn label_decl(&mut self, loc: Location) -> Result<LabelDecl, CompileError> {
        let name = self.ident()?;
        let tok = self.expect_token()?;
        if tok.kind != TokenKind::Colon {
            return Err(syntax_error(tok));
        }
        self.newlines()?;
        Ok(LabelDecl { name, loc })
    }

    /// Parses the operands of an instruction after its opcode.
    fn instruction(&mut self, mnemonic: String, loc: Location) -> Result<Instruction, CompileError> {
        let mut operands = Vec::new();
        if !self.peek_is(|k| *k == TokenKind::Newline) {
            operands.push(self.value()?);
            while self.peek_is(|k| *k == TokenKind::Comma) {
                self.consume();
                operands.push(self.value()?);
            }
        }
        self.newlines()?;
        Ok(Instruction { mnemonic, operands, loc })
    }

    fn value(&mut self) -> Result<Operand, CompileError> {
        let tok = self.expect_token()?;
        let value = match tok.kind {
            TokenKind::Register(reg) => Value::Register(reg),
            TokenKind::IntConst(v) | TokenKind::HexConst(v) => Value::Int(v),
            TokenKind::FloatConst(v) => Value::Float(v),
            TokenKind::Dollar => Value::Label(self.ident()?),
            _ => return Err(syntax_error(tok)),
        };
        Ok(Operand::new(value, tok.loc))
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        let tok = self.expect_token()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(syntax_error(tok)),
        }
    }

    /// One or more newlines terminate a statement.
    fn newlines(&mut self) -> Result<(), CompileError> {
        let tok = self.expect_token()?;
        if tok.kind != TokenKind::Newline {
            return Err(syntax_error(tok));
        }
        while self.peek_is(|k| *k == TokenKind::Newline) {
            self.consume();
        }
        Ok(())
    }

    fn peek_is<F: Fn(&TokenKind) -> bool>(&self, pred: F) -> bool {
        self.tokens.front().map_or(false, |tok| pred(&tok.kind))
    }

    fn expect_token(&mut self) -> Result<Token, CompileError> {
        match self.consume() {
            Some(tok) => Ok(tok),
            None => Err(CompileError::UnexpectedEof { loc: self.eof.clone() }),
        }
    }

    /// Pops a token off the input stream and returns it.
    /// Returns None if no tokens are left.
    #[inline]
    fn consume(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }
}

fn syntax_error(tok: Token) -> CompileError {
    CompileError::Syntax { found: tok.to_string(), loc: tok.loc }
}

/// Lexes and parses a source text in one step.
pub fn parse(file: &str, src: &str) -> Result<Program, CompileError> {
    let tokens = super::lexer::tokenize(file, src)?;
    Parser::new(file, tokens).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction(decl: &Declaration) -> &Instruction {
        match decl {
            Declaration::Instruction(ins) => ins,
            other => panic!("expected an instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_instruction() {
        let program = parse("t", "MOV %RA, 0x10\nFADD %RB, 1.5\nNOP\n").unwrap();
        assert_eq!(program.declarations.len(), 3);

        let mov = instruction(&program.declarations[0]);
        assert_eq!(mov.mnemonic, "MOV");
        assert_eq!(mov.operands[0].value, Value::Register(Register::RA));
        assert_eq!(mov.operands[1].value, Value::Int(16));
        assert_eq!((mov.operands[1].loc.line, mov.operands[1].loc.column), (1, 10));

        let fadd = instruction(&program.declarations[1]);
        assert_eq!(fadd.operands[1].value, Value::Float(1.5));
        assert_eq!(fadd.loc.line, 2);

        let nop = instruction(&program.declarations[2]);
        assert!(nop.operands.is_empty());
    }

    #[test]
    fn test_label_decl() {
        let program = parse("t", "$loop:\n\n\nJMP $loop\n").unwrap();
        match &program.declarations[0] {
            Declaration::LabelDecl(decl) => {
                assert_eq!(decl.name, "loop");
                assert_eq!((decl.loc.line, decl.loc.column), (1, 1));
            },
            other => panic!("expected a label, got {:?}", other),
        }
        let jmp = instruction(&program.declarations[1]);
        assert_eq!(jmp.operands[0].value, Value::Label("loop".to_owned()));
    }

    #[test]
    fn test_no_semantic_checks() {
        // Wrong arity and types still parse.
        let program = parse("t", "NOP 1, 2, 3\nJMP %RA, $x\n").unwrap();
        assert_eq!(instruction(&program.declarations[0]).operands.len(), 3);
        assert_eq!(instruction(&program.declarations[1]).operands.len(), 2);
    }

    #[test]
    fn test_leading_newlines() {
        let program = parse("t", "// header\n\nSTOP\n").unwrap();
        assert_eq!(program.declarations.len(), 1);
    }

    #[test]
    fn test_syntax_errors() {
        match parse("t", "MOV %RA 1\n") {
            Err(CompileError::Syntax { found, loc }) => {
                assert_eq!(found, "1");
                assert_eq!((loc.line, loc.column), (1, 9));
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse("t", "%RA\n"), Err(CompileError::Syntax { .. })));
        assert!(matches!(parse("t", "$loop\nNOP\n"), Err(CompileError::Syntax { .. })));
        assert!(matches!(parse("t", "$MOV:\n"), Err(CompileError::Syntax { .. })));
        assert!(matches!(parse("t", "MOV %RA, loop\n"), Err(CompileError::Syntax { .. })));
        assert!(matches!(parse("t", "MOV %RA,\n"), Err(CompileError::Syntax { .. })));
        assert!(matches!(parse("t", "NOP ; STOP\n"), Err(CompileError::Syntax { .. })));
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(parse("t", "NOP"), Err(CompileError::UnexpectedEof { .. })));
        assert!(matches!(parse("t", "MOV %RA,"), Err(CompileError::UnexpectedEof { .. })));
        assert!(matches!(parse("t", "$end:"), Err(CompileError::UnexpectedEof { .. })));
        match parse("empty.asm", "") {
            Err(CompileError::UnexpectedEof { loc }) => assert_eq!(loc, Location::new("empty.asm", 1, 1)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse("t", "\n// nothing\n"), Err(CompileError::UnexpectedEof { .. })));
    }

    #[test]
    fn test_lex_errors_propagate() {
        assert!(matches!(parse("t", "MOV %RZ, 1\n"), Err(CompileError::UnknownRegister { .. })));
    }
}
