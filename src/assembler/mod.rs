//! The Assembler module is in charge of taking a 4VIN assembly file and
//! producing its binary encoding.
//!
//! It does this in strictly sequential phases, each consuming the whole
//! output of the previous one:
//!
//! source -> lexer -> parser -> typecheck -> microcode -> codegen
//!
//! The first error in any phase aborts the compilation.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod microcode;
pub mod parser;
pub mod registry;
pub mod typecheck;

pub use self::codegen::{Assembled, NullaryEncoding};
pub use self::error::CompileError;

/// Settings for one assembler run.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Options {
    pub nullary: NullaryEncoding,
}

/// Assembles sources under a file name used in diagnostics.
///
/// No state survives between calls: every compilation starts with
/// empty label tables.
#[derive(Clone, Debug)]
pub struct Assembler {
    file: String,
    options: Options,
}

impl Assembler {
    pub fn new(file: &str) -> Self {
        Assembler { file: file.to_owned(), options: Options::default() }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Lexes, parses, type checks and expands microcode, stopping short
    /// of code generation.
    pub fn expand(&self, source: &str) -> Result<ast::Program, CompileError> {
        let program = parser::parse(&self.file, source)?;
        debug!("{}: parsed {} declaration(s)", self.file, program.declarations.len());

        typecheck::typecheck(&program)?;
        let program = microcode::expand(program)?;
        debug!("{}: {} declaration(s) after expansion", self.file, program.declarations.len());
        Ok(program)
    }

    pub fn compile(&self, source: &str) -> Result<Assembled, CompileError> {
        let program = self.expand(source)?;
        codegen::generate(&program, self.options.nullary)
    }
}

/// Compiles a source text with default options.
pub fn compile(source: &str) -> Result<Assembled, CompileError> {
    Assembler::new("<input>").compile(source)
}
