//! Abstract syntax tree.
//!
//! Owned sum types with boxed children. Subtrees are tree-owned: no node
//! is shared, and a declaration's whole tree is dropped together once the
//! code generator has consumed it.

use micc_util::SourceLoc;

use crate::types::{FunctionType, Type};

/// An identifier with the location it was written at.
#[derive(Clone, Debug, PartialEq)]
pub struct Name {
    pub text: String,
    pub loc: SourceLoc,
}

/// Prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Minus,
    /// `!`
    Bang,
}

/// Infix arithmetic operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
}

/// An expression node with its source location.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLoc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// An integer literal. Always non-negative; `-` is a unary operator.
    Int(u64),
    /// A floating literal.
    Float(f64),
    Identifier(Name),
    Unary {
        op: UnaryOp,
        rhs: Box<Expr>,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

/// A variable declaration, local or top-level; the form is identical.
///
/// `value: None` means default-initialized.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub ty: Type,
    pub name: Name,
    pub value: Option<Expr>,
}

/// A statement inside a function body.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLoc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Return(Option<Expr>),
    VariableDecl(Variable),
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionParameter {
    pub ty: Type,
    pub name: Name,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionPrototype {
    pub return_type: Type,
    pub name: Name,
    pub parameters: Vec<FunctionParameter>,
    /// True for `int f();` — no parameter list information at all. Any
    /// declared parameter, including a lone `void`, clears this.
    pub variadic: bool,
    /// True when a body follows the prototype.
    pub is_definition: bool,
}

impl FunctionPrototype {
    /// The signature as a [`FunctionType`], for the symbol table.
    pub fn function_type(&self) -> FunctionType {
        FunctionType {
            return_type: self.return_type.clone(),
            parameters: self.parameters.iter().map(|p| p.ty.clone()).collect(),
            variadic: self.variadic,
        }
    }
}

/// A function declaration. `body` is empty iff this is a prototype.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub prototype: FunctionPrototype,
    pub body: Vec<Stmt>,
}

/// A top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Declaration {
    Function(Function),
    Variable(Variable),
}

/// The parse result: top-level declarations in textual order.
///
/// Order matters — symbol visibility is single-pass, so a name must be
/// declared before the declaration that mentions it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Root {
    pub declarations: Vec<Declaration>,
}
