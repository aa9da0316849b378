//! Frontend module - Lexer and Parser

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

use crate::utils::Result;

/// Lex and parse one source file
pub fn parse_source(source: &str, file_id: usize) -> Result<ast::Program> {
    let mut parser = parser::Parser::new(lexer::Lexer::new(source, file_id))?;
    parser.parse_program()
}
