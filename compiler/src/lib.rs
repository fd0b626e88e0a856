// kemit — GPU code emission for polyhedral schedules
//
// Library root. Leaves first: text sink and expressions, the annotated AST
// and program model, the individual printers, then the unit code generator
// and the pipeline that drives it.

pub mod ast;
pub mod codegen;
pub mod copy;
pub mod decl;
pub mod diag;
pub mod early_exit;
pub mod error;
pub mod expr;
pub mod id;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod pipeline;
pub mod printer;
pub mod prog;
pub mod signature;
pub mod source;
pub mod types;
