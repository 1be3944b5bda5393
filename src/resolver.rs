//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, read in own initializer, misplaced
//!    `return` / `this` / `super`, a class inheriting from itself).
//! 3. Record, for *each* variable occurrence, how many scopes lie between the
//!    use and its declaration.  Occurrences with no entry are globals.
//!
//! The whole program is resolved before any of it runs.  Like the parser, the
//! outer loop stops at the first error.

use crate::ast::{
    AssignExpr, BinaryExpr, BlockStmt, CallExpr, ClassStmt, Expr, ExprId, ExprVisitor,
    ExpressionStmt, FunctionDecl, GetExpr, GroupingExpr, IfStmt, LiteralExpr, LogicalExpr,
    PrintStmt, ReturnStmt, SetExpr, Stmt, StmtVisitor, SuperExpr, ThisExpr, UnaryExpr, VarStmt,
    VariableExpr, WhileStmt,
};
use crate::class::INITIALIZER;
use crate::error::{LoxError, Result};
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::rc::Rc;

/// Resolution table: expression identity → scope distance.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body we are in.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body we are in.  Used to validate `this` / `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances into its own [`Locals`] table.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    locals: Locals,
    /// Entries recorded outside any function body; they are dead once the
    /// statements they belong to have run.
    transient: Vec<ExprId>,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            transient: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements, stopping at the first static error.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            if let Err(e) = self.resolve_stmt(stmt) {
                debug!("Resolve aborted: {}", e);
                self.errors.push(e);
                break;
            }
        }

        // An aborted pass can leave state behind; the next call starts clean.
        self.scopes.clear();
        self.current_function = FunctionType::None;
        self.current_class = ClassType::None;

        info!("Resolved {} local reference(s)", self.locals.len());
    }

    /// Static errors recorded so far.
    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    /// Hand the recorded errors over to the caller.
    pub fn take_errors(&mut self) -> Vec<LoxError> {
        std::mem::take(&mut self.errors)
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    pub fn into_locals(self) -> Locals {
        self.locals
    }

    /// Drain the ids of entries no closure can reach after execution.
    pub fn take_transient(&mut self) -> Vec<ExprId> {
        std::mem::take(&mut self.transient)
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        stmt.accept(self)
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        expr.accept(self)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(&mut self, function: &FunctionDecl, kind: FunctionType) -> Result<()> {
        let enclosing: FunctionType = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        let result: Result<()> = function
            .params
            .iter()
            .try_for_each(|param| {
                self.declare(param)?;
                self.define(param);
                Ok(())
            })
            .and_then(|_| self.resolve_stmts(&function.body));
        self.end_scope();

        self.current_function = enclosing;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    format!(
                        "Already a variable named '{}' in this scope.",
                        name.lexeme
                    ),
                ));
            }
            scope.insert(name.lexeme.clone(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Bind a synthetic name (`this`, `super`) in the innermost scope.
    fn bind_keyword(&mut self, keyword: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(keyword.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it
    /// unrecorded (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        // innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.locals.insert(id, depth);

                if self.current_function == FunctionType::None {
                    self.transient.push(id);
                }

                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statement resolution
// ─────────────────────────────────────────────────────────────────────────────

impl StmtVisitor<Result<()>> for Resolver {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionStmt) -> Result<()> {
        self.resolve_expr(&stmt.expression)
    }

    fn visit_print_stmt(&mut self, stmt: &PrintStmt) -> Result<()> {
        self.resolve_expr(&stmt.expression)
    }

    fn visit_var_stmt(&mut self, stmt: &VarStmt) -> Result<()> {
        // declare → resolve initializer → define
        self.declare(&stmt.name)?;
        if let Some(initializer) = &stmt.initializer {
            self.resolve_expr(initializer)?;
        }
        self.define(&stmt.name);
        Ok(())
    }

    fn visit_block_stmt(&mut self, stmt: &BlockStmt) -> Result<()> {
        self.begin_scope();
        let result: Result<()> = self.resolve_stmts(&stmt.statements);
        self.end_scope();
        result
    }

    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> Result<()> {
        self.resolve_expr(&stmt.condition)?;
        self.resolve_stmt(&stmt.then_branch)?;
        if let Some(else_branch) = &stmt.else_branch {
            self.resolve_stmt(else_branch)?;
        }
        Ok(())
    }

    fn visit_while_stmt(&mut self, stmt: &WhileStmt) -> Result<()> {
        self.resolve_expr(&stmt.condition)?;
        self.resolve_stmt(&stmt.body)
    }

    fn visit_function_stmt(&mut self, stmt: &Rc<FunctionDecl>) -> Result<()> {
        // The name is visible *inside* its own body, so recursion works.
        self.declare(&stmt.name)?;
        self.define(&stmt.name);
        self.resolve_function(stmt, FunctionType::Function)
    }

    fn visit_return_stmt(&mut self, stmt: &ReturnStmt) -> Result<()> {
        if self.current_function == FunctionType::None {
            return Err(LoxError::resolve(
                stmt.keyword.line,
                "Can't return from top-level code.",
            ));
        }

        if let Some(value) = &stmt.value {
            if self.current_function == FunctionType::Initializer {
                return Err(LoxError::resolve(
                    stmt.keyword.line,
                    "Can't return a value from an initializer.",
                ));
            }
            self.resolve_expr(value)?;
        }

        Ok(())
    }

    fn visit_class_stmt(&mut self, stmt: &ClassStmt) -> Result<()> {
        let enclosing: ClassType = self.current_class;
        self.current_class = ClassType::Class;

        let result: Result<()> = self.resolve_class(stmt);

        self.current_class = enclosing;
        result
    }
}

impl Resolver {
    fn resolve_class(&mut self, stmt: &ClassStmt) -> Result<()> {
        self.declare(&stmt.name)?;
        self.define(&stmt.name);

        if let Some(superclass) = &stmt.superclass {
            if superclass.name.lexeme == stmt.name.lexeme {
                return Err(LoxError::resolve(
                    superclass.name.line,
                    "A class can't inherit from itself.",
                ));
            }

            self.current_class = ClassType::Subclass;
            self.visit_variable_expr(superclass)?;

            self.begin_scope();
            self.bind_keyword("super");
        }

        self.begin_scope();
        self.bind_keyword("this");

        let result: Result<()> = stmt.methods.iter().try_for_each(|method| {
            let kind: FunctionType = if method.name.lexeme == INITIALIZER {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind)
        });

        self.end_scope();

        if stmt.superclass.is_some() {
            self.end_scope();
        }

        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expression resolution
// ─────────────────────────────────────────────────────────────────────────────

impl ExprVisitor<Result<()>> for Resolver {
    fn visit_literal_expr(&mut self, _expr: &LiteralExpr) -> Result<()> {
        Ok(())
    }

    fn visit_grouping_expr(&mut self, expr: &GroupingExpr) -> Result<()> {
        self.resolve_expr(&expr.expression)
    }

    fn visit_unary_expr(&mut self, expr: &UnaryExpr) -> Result<()> {
        self.resolve_expr(&expr.right)
    }

    fn visit_binary_expr(&mut self, expr: &BinaryExpr) -> Result<()> {
        self.resolve_expr(&expr.left)?;
        self.resolve_expr(&expr.right)
    }

    fn visit_logical_expr(&mut self, expr: &LogicalExpr) -> Result<()> {
        self.resolve_expr(&expr.left)?;
        self.resolve_expr(&expr.right)
    }

    fn visit_variable_expr(&mut self, expr: &VariableExpr) -> Result<()> {
        // Cannot read in own initializer
        if let Some(scope) = self.scopes.last() {
            if scope.get(&expr.name.lexeme) == Some(&false) {
                return Err(LoxError::resolve(
                    expr.name.line,
                    "Can't read local variable in its own initializer.",
                ));
            }
        }

        self.resolve_local(expr.id, &expr.name.lexeme);
        Ok(())
    }

    fn visit_assign_expr(&mut self, expr: &AssignExpr) -> Result<()> {
        // First resolve RHS, then bind LHS
        self.resolve_expr(&expr.value)?;
        self.resolve_local(expr.id, &expr.name.lexeme);
        Ok(())
    }

    fn visit_call_expr(&mut self, expr: &CallExpr) -> Result<()> {
        self.resolve_expr(&expr.callee)?;
        for argument in &expr.arguments {
            self.resolve_expr(argument)?;
        }
        Ok(())
    }

    fn visit_get_expr(&mut self, expr: &GetExpr) -> Result<()> {
        self.resolve_expr(&expr.object)
    }

    fn visit_set_expr(&mut self, expr: &SetExpr) -> Result<()> {
        self.resolve_expr(&expr.value)?;
        self.resolve_expr(&expr.object)
    }

    fn visit_this_expr(&mut self, expr: &ThisExpr) -> Result<()> {
        if self.current_class == ClassType::None {
            return Err(LoxError::resolve(
                expr.keyword.line,
                "Can't use 'this' outside of a class.",
            ));
        }

        self.resolve_local(expr.id, "this");
        Ok(())
    }

    fn visit_super_expr(&mut self, expr: &SuperExpr) -> Result<()> {
        match self.current_class {
            ClassType::None => Err(LoxError::resolve(
                expr.keyword.line,
                "Can't use 'super' outside of a class.",
            )),
            ClassType::Class => Err(LoxError::resolve(
                expr.keyword.line,
                "Can't use 'super' in a class with no superclass.",
            )),
            ClassType::Subclass => {
                self.resolve_local(expr.id, "super");
                Ok(())
            }
        }
    }
}
