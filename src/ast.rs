//! Abstract syntax tree for Lox.
//!
//! Every node kind is its own struct; [`Expr`] and [`Stmt`] are the closed
//! sets of variants.  Passes walk the tree through [`ExprVisitor`] and
//! [`StmtVisitor`] via `accept`.
//!
//! Nodes are never mutated after the parser builds them.  Expressions that
//! name a binding (`Variable`, `Assign`, `This`, `Super`) carry an [`ExprId`]
//! so the resolver can key its distance table by node identity: two
//! structurally identical `a` expressions still get different ids.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::{Literal, Token};

/// Identity of a resolvable expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    /// Allocate an id never handed out before in this process, so trees
    /// parsed from separate REPL lines never collide in one table.
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A literal constant that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

impl From<Literal> for LiteralValue {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Number(n) => LiteralValue::Number(n),
            Literal::Str(s) => LiteralValue::Str(s),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Expr {
    Literal(LiteralExpr),
    Grouping(GroupingExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Logical(LogicalExpr),
    Variable(VariableExpr),
    Assign(AssignExpr),
    Call(CallExpr),
    Get(GetExpr),
    Set(SetExpr),
    This(ThisExpr),
    Super(SuperExpr),
}

pub trait ExprVisitor<T> {
    fn visit_literal_expr(&mut self, expr: &LiteralExpr) -> T;
    fn visit_grouping_expr(&mut self, expr: &GroupingExpr) -> T;
    fn visit_unary_expr(&mut self, expr: &UnaryExpr) -> T;
    fn visit_binary_expr(&mut self, expr: &BinaryExpr) -> T;
    fn visit_logical_expr(&mut self, expr: &LogicalExpr) -> T;
    fn visit_variable_expr(&mut self, expr: &VariableExpr) -> T;
    fn visit_assign_expr(&mut self, expr: &AssignExpr) -> T;
    fn visit_call_expr(&mut self, expr: &CallExpr) -> T;
    fn visit_get_expr(&mut self, expr: &GetExpr) -> T;
    fn visit_set_expr(&mut self, expr: &SetExpr) -> T;
    fn visit_this_expr(&mut self, expr: &ThisExpr) -> T;
    fn visit_super_expr(&mut self, expr: &SuperExpr) -> T;
}

impl Expr {
    pub fn accept<T, V: ExprVisitor<T>>(&self, visitor: &mut V) -> T {
        use Expr::*;
        match self {
            Literal(expr) => visitor.visit_literal_expr(expr),
            Grouping(expr) => visitor.visit_grouping_expr(expr),
            Unary(expr) => visitor.visit_unary_expr(expr),
            Binary(expr) => visitor.visit_binary_expr(expr),
            Logical(expr) => visitor.visit_logical_expr(expr),
            Variable(expr) => visitor.visit_variable_expr(expr),
            Assign(expr) => visitor.visit_assign_expr(expr),
            Call(expr) => visitor.visit_call_expr(expr),
            Get(expr) => visitor.visit_get_expr(expr),
            Set(expr) => visitor.visit_set_expr(expr),
            This(expr) => visitor.visit_this_expr(expr),
            Super(expr) => visitor.visit_super_expr(expr),
        }
    }
}

#[derive(Debug)]
pub struct LiteralExpr {
    pub value: LiteralValue,
}

/// Parenthesised sub‑expression: `"(" expression ")"`.
#[derive(Debug)]
pub struct GroupingExpr {
    pub expression: Box<Expr>,
}

/// Prefix `!` or `-`.
#[derive(Debug)]
pub struct UnaryExpr {
    pub operator: Token,
    pub right: Box<Expr>,
}

#[derive(Debug)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: Token,
    pub right: Box<Expr>,
}

/// Short‑circuiting `and` / `or`.
#[derive(Debug)]
pub struct LogicalExpr {
    pub left: Box<Expr>,
    pub operator: Token,
    pub right: Box<Expr>,
}

#[derive(Debug)]
pub struct VariableExpr {
    pub id: ExprId,
    pub name: Token,
}

#[derive(Debug)]
pub struct AssignExpr {
    pub id: ExprId,
    pub name: Token,
    pub value: Box<Expr>,
}

#[derive(Debug)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    /// The closing `)` ‑ retained for error reporting.
    pub paren: Token,
    pub arguments: Vec<Expr>,
}

/// `object.name`
#[derive(Debug)]
pub struct GetExpr {
    pub object: Box<Expr>,
    pub name: Token,
}

/// `object.name = value`
#[derive(Debug)]
pub struct SetExpr {
    pub object: Box<Expr>,
    pub name: Token,
    pub value: Box<Expr>,
}

#[derive(Debug)]
pub struct ThisExpr {
    pub id: ExprId,
    pub keyword: Token,
}

/// `super.method`
#[derive(Debug)]
pub struct SuperExpr {
    pub id: ExprId,
    pub keyword: Token,
    pub method: Token,
}

// ─────────────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Stmt {
    Expression(ExpressionStmt),
    Print(PrintStmt),
    Var(VarStmt),
    Block(BlockStmt),
    If(IfStmt),
    While(WhileStmt),
    /// Shared so closures can hold on to their declaration.
    Function(Rc<FunctionDecl>),
    Return(ReturnStmt),
    Class(ClassStmt),
}

pub trait StmtVisitor<T> {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionStmt) -> T;
    fn visit_print_stmt(&mut self, stmt: &PrintStmt) -> T;
    fn visit_var_stmt(&mut self, stmt: &VarStmt) -> T;
    fn visit_block_stmt(&mut self, stmt: &BlockStmt) -> T;
    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> T;
    fn visit_while_stmt(&mut self, stmt: &WhileStmt) -> T;
    fn visit_function_stmt(&mut self, stmt: &Rc<FunctionDecl>) -> T;
    fn visit_return_stmt(&mut self, stmt: &ReturnStmt) -> T;
    fn visit_class_stmt(&mut self, stmt: &ClassStmt) -> T;
}

impl Stmt {
    pub fn accept<T, V: StmtVisitor<T>>(&self, visitor: &mut V) -> T {
        use Stmt::*;
        match self {
            Expression(stmt) => visitor.visit_expression_stmt(stmt),
            Print(stmt) => visitor.visit_print_stmt(stmt),
            Var(stmt) => visitor.visit_var_stmt(stmt),
            Block(stmt) => visitor.visit_block_stmt(stmt),
            If(stmt) => visitor.visit_if_stmt(stmt),
            While(stmt) => visitor.visit_while_stmt(stmt),
            Function(stmt) => visitor.visit_function_stmt(stmt),
            Return(stmt) => visitor.visit_return_stmt(stmt),
            Class(stmt) => visitor.visit_class_stmt(stmt),
        }
    }
}

#[derive(Debug)]
pub struct ExpressionStmt {
    pub expression: Expr,
}

#[derive(Debug)]
pub struct PrintStmt {
    pub expression: Expr,
}

/// `"var" IDENT ("=" initializer)? ";"`
#[derive(Debug)]
pub struct VarStmt {
    pub name: Token,
    pub initializer: Option<Expr>,
}

#[derive(Debug)]
pub struct BlockStmt {
    pub statements: Vec<Stmt>,
}

#[derive(Debug)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

/// A named function or method: parameter tokens plus body statements.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub struct ReturnStmt {
    /// The `return` keyword token (for error locations).
    pub keyword: Token,
    /// Absent ⇒ `nil` is returned.
    pub value: Option<Expr>,
}

#[derive(Debug)]
pub struct ClassStmt {
    pub name: Token,
    pub superclass: Option<VariableExpr>,
    pub methods: Vec<Rc<FunctionDecl>>,
}
