//! Abstract Syntax Tree for Ferrite.

pub mod expr;
pub mod stmt;
pub mod types;

pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
pub use stmt::{FunctionDecl, Parameter, Program, Stmt, StmtKind};
pub use types::{TypeAnnotation, TypeKind};
