//! Every phase of the assembler reports failures through `CompileError`.
//! The first error aborts the compilation.
use thiserror::Error;

use super::ast::{Location, ValueType};

#[derive(Error, Clone, PartialEq, Debug)]
pub enum CompileError {
    // Lexer
    #[error("Unexpected token '{found}'")]
    UnexpectedCharacter { found: char, loc: Location },

    #[error("Unknown register: '{name}'")]
    UnknownRegister { name: String, loc: Location },

    #[error("Integer literal '{text}' does not fit in 32 bits")]
    IntegerOverflow { text: String, loc: Location },

    #[error("Float literal '{text}' is out of single precision range")]
    FloatOverflow { text: String, loc: Location },

    // Parser
    #[error("Syntax error at '{found}'")]
    Syntax { found: String, loc: Location },

    #[error("Unexpected end of file")]
    UnexpectedEof { loc: Location },

    // Type checker
    #[error("Label '{name}' already declared at {original}")]
    DuplicateLabel { name: String, loc: Location, original: Location },

    #[error("No declaration for label '{name}' found")]
    UndeclaredLabel { name: String, loc: Location },

    #[error("Expected {expected} arguments, got {got}")]
    Arity { mnemonic: String, expected: usize, got: usize, loc: Location },

    #[error("Expected type '{expected}', got '{got}'")]
    OperandType { expected: String, got: ValueType, loc: Location },

    // Microcode expander
    #[error("In expansion of '{mnemonic}': {source}")]
    MacroExpansion {
        mnemonic: String,
        loc: Location,
        #[source]
        source: Box<CompileError>,
    },

    // Registry contract violations and code generation
    #[error("Invalid op code: '{mnemonic}'")]
    UnknownMnemonic { mnemonic: String, loc: Location },

    #[error("Label '{name}' has no address")]
    UnresolvedLabel { name: String, loc: Location },

    #[error("Cannot encode '{mnemonic}': {reason}")]
    Encoding { mnemonic: String, reason: String, loc: Location },
}

impl CompileError {
    /// The source location the error points at.
    pub fn location(&self) -> &Location {
        use CompileError::*;
        match self {
            UnexpectedCharacter { loc, .. } |
            UnknownRegister { loc, .. } |
            IntegerOverflow { loc, .. } |
            FloatOverflow { loc, .. } |
            Syntax { loc, .. } |
            UnexpectedEof { loc } |
            DuplicateLabel { loc, .. } |
            UndeclaredLabel { loc, .. } |
            Arity { loc, .. } |
            OperandType { loc, .. } |
            MacroExpansion { loc, .. } |
            UnknownMnemonic { loc, .. } |
            UnresolvedLabel { loc, .. } |
            Encoding { loc, .. } => loc,
        }
    }

    /// Formats the error for the operator: the location and message,
    /// the offending source line, and a marker under the column.
    pub fn render(&self, source: &str) -> String {
        let loc = self.location();
        let line = source
            .lines()
            .nth(loc.line.saturating_sub(1))
            .map(str::trim)
            .unwrap_or("");

        format!(
            "{} {}\n     {}\n>>>>{}^",
            loc,
            self,
            line,
            "-".repeat(loc.column)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let err = CompileError::UnknownRegister {
            name: "%RX".to_owned(),
            loc: Location::new("prog.asm", 2, 5),
        };
        let source = "NOP\nMOV %RX, 1\n";
        assert_eq!(
            err.render(source),
            "prog.asm:2:5 Unknown register: '%RX'\n     MOV %RX, 1\n>>>>-----^"
        );
    }

    #[test]
    fn test_render_past_end() {
        let err = CompileError::UnexpectedEof { loc: Location::new("prog.asm", 9, 1) };
        assert_eq!(err.render("NOP"), "prog.asm:9:1 Unexpected end of file\n     \n>>>>-^");
    }

    #[test]
    fn test_macro_location() {
        let inner = CompileError::Syntax {
            found: ",".to_owned(),
            loc: Location::new("<microcode>", 1, 4),
        };
        let err = CompileError::MacroExpansion {
            mnemonic: "PUSH".to_owned(),
            loc: Location::new("prog.asm", 3, 1),
            source: Box::new(inner),
        };
        assert_eq!(err.location(), &Location::new("prog.asm", 3, 1));
        assert_eq!(err.to_string(), "In expansion of 'PUSH': Syntax error at ','");
    }

    #[test]
    fn test_messages() {
        let loc = Location::new("a", 1, 1);
        let err = CompileError::Arity { mnemonic: "MOV".to_owned(), expected: 2, got: 1, loc: loc.clone() };
        assert_eq!(err.to_string(), "Expected 2 arguments, got 1");

        let err = CompileError::DuplicateLabel {
            name: "x".to_owned(),
            loc: Location::new("a", 4, 1),
            original: Location::new("a", 1, 1),
        };
        assert_eq!(err.to_string(), "Label 'x' already declared at a:1:1");
    }
}
