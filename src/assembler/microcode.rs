//! Expands microcode instructions into the primitive instructions their
//! templates describe.
//!
//! A template is assembly text with positional placeholders `%0`, `%1`,
//! ... which are replaced with the textual form of the instruction's
//! operands. The result is lexed and parsed like any other source, and
//! its declarations replace the original instruction.
//!
//! Expansion is single-level: instructions produced by a template are
//! not expanded again.
use super::ast::*;
use super::error::CompileError;
use super::parser;
use super::registry;

/// Fills a template's placeholders with the rendered operands.
pub fn substitute(template: &str, operands: &[Operand]) -> String {
    let mut text = template.to_owned();
    // Highest index first, so `%1` never clobbers the prefix of `%10`.
    for (idx, op) in operands.iter().enumerate().rev() {
        text = text.replace(&format!("%{}", idx), &op.to_string());
    }
    text
}

/// Returns a program with every microcode instruction replaced by its
/// expansion. Everything else passes through in order.
pub fn expand(program: Program) -> Result<Program, CompileError> {
    let mut declarations = Vec::with_capacity(program.declarations.len());
    for decl in program.declarations.into_iter() {
        match decl {
            Declaration::Instruction(ins) => declarations.extend(expand_instruction(ins)?),
            label @ Declaration::LabelDecl(_) => declarations.push(label),
        }
    }
    Ok(Program::new(declarations))
}

fn expand_instruction(ins: Instruction) -> Result<Vec<Declaration>, CompileError> {
    let template = match registry::lookup(&ins.mnemonic).and_then(|def| def.microcode()) {
        Some(template) => template,
        None => return Ok(vec![Declaration::Instruction(ins)]),
    };

    let snippet = substitute(template, &ins.operands);
    debug!("{}: expanding `{}` into {:?}", ins.loc, ins, snippet);

    let file = format!("<microcode {}>", ins.mnemonic);
    match parser::parse(&file, &snippet) {
        Ok(expanded) => Ok(expanded.declarations),
        Err(e) => Err(CompileError::MacroExpansion {
            mnemonic: ins.mnemonic,
            loc: ins.loc,
            source: Box::new(e),
        }),
    }
}
