//! Tree‑walking evaluator.
//!
//! Executes resolved statements against a chain of [`Environment`]s.  Local
//! variables are found by walking exactly the number of parent links the
//! resolver recorded for the expression; anything without an entry lives in
//! `globals`.
//!
//! Statement execution yields a [`Flow`] so `return` can unwind to the
//! nearest call boundary without using the error channel.  Runtime errors
//! abort only the current top‑level statement and are appended to the log
//! exposed by [`Interpreter::errors`].

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{
    AssignExpr, BinaryExpr, BlockStmt, CallExpr, ClassStmt, Expr, ExprId, ExprVisitor,
    ExpressionStmt, FunctionDecl, GetExpr, GroupingExpr, IfStmt, LiteralExpr, LiteralValue,
    LogicalExpr, PrintStmt, ReturnStmt, SetExpr, Stmt, StmtVisitor, SuperExpr, ThisExpr,
    UnaryExpr, VarStmt, VariableExpr, WhileStmt,
};
use crate::callable::{natives, Callable, LoxCallable};
use crate::class::{LoxClass, LoxInstance, INITIALIZER};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::function::LoxFunction;
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nested calls allowed before a runtime "Stack overflow." error.
pub const MAX_CALL_DEPTH: usize = 200;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    Normal,
    /// A `return` is unwinding to the enclosing call.
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    errors: Vec<LoxError>,
    out: Box<dyn Write>,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Interpreter printing to stdout, with the native functions defined.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    /// Interpreter printing to `out`.
    pub fn with_output<W: Write + 'static>(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().into_ref();

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            globals
                .borrow_mut()
                .define(native.name, Value::Callable(Callable::Native(Rc::new(native))));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            errors: Vec::new(),
            out: Box::new(out),
            depth: 0,
        }
    }

    /// Merge a resolution table produced by the resolver.  Must be called
    /// before interpreting the statements it was computed for.
    pub fn add_locals(&mut self, locals: Locals) {
        debug!("Adding {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Forget resolution entries for code that can never run again.
    pub fn release_locals(&mut self, ids: &[ExprId]) {
        debug!("Releasing {} resolved local(s)", ids.len());

        for id in ids {
            self.locals.remove(id);
        }
    }

    /// Number of resolution entries currently held.
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Execute every statement in order.  A runtime error is logged and
    /// execution resumes with the next top‑level statement.
    pub fn interpret(&mut self, statements: &[Stmt]) {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime error logged: {}", e);
                // A failure deep inside a call must not strand us in its scope.
                self.environment = Rc::clone(&self.globals);
                self.depth = 0;
                self.errors.push(e);
            }
        }

        if let Err(e) = self.out.flush() {
            self.errors.push(e.into());
        }

        info!(
            "Interpretation finished with {} runtime error(s)",
            self.errors.len()
        );
    }

    /// Runtime errors logged so far.
    pub fn errors(&self) -> &[LoxError] {
        &self.errors
    }

    /// Hand the logged errors over to the caller.
    pub fn take_errors(&mut self) -> Vec<LoxError> {
        std::mem::take(&mut self.errors)
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        stmt.accept(self)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        expr.accept(self)
    }

    /// Run `statements` in `environment`, restoring the current environment
    /// afterwards whatever the outcome.
    pub fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);

        let mut result: Result<Flow> = Ok(Flow::Normal);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;

        result
    }

    fn lookup_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }
            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn call_value(&mut self, callee: Value, arguments: Vec<Value>, paren: &Token) -> Result<Value> {
        let Value::Callable(callable) = callee else {
            return Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            ));
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.depth >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(paren.line, "Stack overflow."));
        }

        self.depth += 1;
        let result: Result<Value> = callable.call(self, arguments);
        self.depth -= 1;

        result
    }
}

fn number_operand(operator: &Token, operand: &Value) -> Result<f64> {
    match operand {
        Value::Number(n) => Ok(*n),
        _ => Err(LoxError::runtime(operator.line, "Operand must be a number.")),
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(
            operator.line,
            "Operands must be numbers.",
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

impl ExprVisitor<Result<Value>> for Interpreter {
    fn visit_literal_expr(&mut self, expr: &LiteralExpr) -> Result<Value> {
        Ok(match &expr.value {
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::Str(s) => Value::String(s.clone()),
            LiteralValue::True => Value::Bool(true),
            LiteralValue::False => Value::Bool(false),
            LiteralValue::Nil => Value::Nil,
        })
    }

    fn visit_grouping_expr(&mut self, expr: &GroupingExpr) -> Result<Value> {
        self.evaluate(&expr.expression)
    }

    fn visit_unary_expr(&mut self, expr: &UnaryExpr) -> Result<Value> {
        let right: Value = self.evaluate(&expr.right)?;

        match expr.operator.token_type {
            TokenType::MINUS => Ok(Value::Number(-number_operand(&expr.operator, &right)?)),
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(LoxError::runtime(
                expr.operator.line,
                format!("Invalid unary operator '{}'.", expr.operator.lexeme),
            )),
        }
    }

    fn visit_binary_expr(&mut self, expr: &BinaryExpr) -> Result<Value> {
        let left: Value = self.evaluate(&expr.left)?;
        let right: Value = self.evaluate(&expr.right)?;
        let op: &Token = &expr.operator;

        debug!("Binary '{}' on {} and {}", op.lexeme, left, right);

        match op.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(LoxError::runtime(
                    op.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(op, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => Err(LoxError::runtime(
                op.line,
                format!("Invalid binary operator '{}'.", op.lexeme),
            )),
        }
    }

    fn visit_logical_expr(&mut self, expr: &LogicalExpr) -> Result<Value> {
        let left: Value = self.evaluate(&expr.left)?;

        // The deciding operand itself is the result, not a boolean.
        let decided: bool = match expr.operator.token_type {
            TokenType::OR => left.is_truthy(),
            _ => !left.is_truthy(),
        };

        if decided {
            return Ok(left);
        }

        self.evaluate(&expr.right)
    }

    fn visit_variable_expr(&mut self, expr: &VariableExpr) -> Result<Value> {
        self.lookup_variable(expr.id, &expr.name)
    }

    fn visit_assign_expr(&mut self, expr: &AssignExpr) -> Result<Value> {
        let value: Value = self.evaluate(&expr.value)?;
        let name: &Token = &expr.name;

        match self.locals.get(&expr.id) {
            Some(&distance) => Environment::assign_at(
                &self.environment,
                distance,
                &name.lexeme,
                value.clone(),
                name.line,
            )?,
            None => self
                .globals
                .borrow_mut()
                .assign(&name.lexeme, value.clone(), name.line)?,
        }

        Ok(value)
    }

    fn visit_call_expr(&mut self, expr: &CallExpr) -> Result<Value> {
        let callee: Value = self.evaluate(&expr.callee)?;

        let mut arguments: Vec<Value> = Vec::with_capacity(expr.arguments.len());
        for argument in &expr.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        self.call_value(callee, arguments, &expr.paren)
    }

    fn visit_get_expr(&mut self, expr: &GetExpr) -> Result<Value> {
        match self.evaluate(&expr.object)? {
            Value::Instance(instance) => LoxInstance::get(&instance, &expr.name),
            other => Err(LoxError::runtime(
                expr.name.line,
                format!("Only instances have properties, not {}.", other.type_name()),
            )),
        }
    }

    fn visit_set_expr(&mut self, expr: &SetExpr) -> Result<Value> {
        let Value::Instance(instance) = self.evaluate(&expr.object)? else {
            return Err(LoxError::runtime(
                expr.name.line,
                "Only instances have fields.",
            ));
        };

        let value: Value = self.evaluate(&expr.value)?;
        instance.borrow_mut().set(&expr.name, value.clone());

        Ok(value)
    }

    fn visit_this_expr(&mut self, expr: &ThisExpr) -> Result<Value> {
        self.lookup_variable(expr.id, &expr.keyword)
    }

    fn visit_super_expr(&mut self, expr: &SuperExpr) -> Result<Value> {
        let line: usize = expr.keyword.line;

        let distance: usize = *self
            .locals
            .get(&expr.id)
            .ok_or_else(|| LoxError::runtime(line, "Can't use 'super' here."))?;

        let superclass: Rc<LoxClass> =
            match Environment::get_at(&self.environment, distance, "super", line)? {
                Value::Callable(Callable::Class(class)) => class,
                _ => return Err(LoxError::runtime(line, "Superclass must be a class.")),
            };

        // `this` sits in the scope just inside the one binding `super`.
        let this_distance: usize = distance
            .checked_sub(1)
            .ok_or_else(|| LoxError::runtime(line, "Can't use 'super' here."))?;

        let instance = match Environment::get_at(&self.environment, this_distance, "this", line)? {
            Value::Instance(instance) => instance,
            _ => return Err(LoxError::runtime(line, "Can't use 'super' here.")),
        };

        match superclass.find_method(&expr.method.lexeme) {
            Some(method) => Ok(Value::Callable(Callable::Function(Rc::new(
                method.bind(instance),
            )))),
            None => Err(LoxError::runtime(
                expr.method.line,
                format!("Undefined property '{}'.", expr.method.lexeme),
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────────────

impl StmtVisitor<Result<Flow>> for Interpreter {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionStmt) -> Result<Flow> {
        self.evaluate(&stmt.expression)?;

        Ok(Flow::Normal)
    }

    fn visit_print_stmt(&mut self, stmt: &PrintStmt) -> Result<Flow> {
        let value: Value = self.evaluate(&stmt.expression)?;
        debug!("Printing value: {}", value);

        writeln!(self.out, "{}", value)?;

        Ok(Flow::Normal)
    }

    fn visit_var_stmt(&mut self, stmt: &VarStmt) -> Result<Flow> {
        let value: Value = match &stmt.initializer {
            Some(initializer) => self.evaluate(initializer)?,
            None => Value::Nil,
        };

        debug!("Defining variable '{}' = {}", stmt.name.lexeme, value);
        self.environment.borrow_mut().define(&stmt.name.lexeme, value);

        Ok(Flow::Normal)
    }

    fn visit_block_stmt(&mut self, stmt: &BlockStmt) -> Result<Flow> {
        let environment: EnvRef =
            Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();

        self.execute_block(&stmt.statements, environment)
    }

    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> Result<Flow> {
        if self.evaluate(&stmt.condition)?.is_truthy() {
            self.execute(&stmt.then_branch)
        } else if let Some(else_branch) = &stmt.else_branch {
            self.execute(else_branch)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn visit_while_stmt(&mut self, stmt: &WhileStmt) -> Result<Flow> {
        while self.evaluate(&stmt.condition)?.is_truthy() {
            if let Flow::Return(value) = self.execute(&stmt.body)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    fn visit_function_stmt(&mut self, stmt: &Rc<FunctionDecl>) -> Result<Flow> {
        debug!("Defining function '{}'", stmt.name.lexeme);

        let function = LoxFunction::new(Rc::clone(stmt), Rc::clone(&self.environment), false);

        self.environment.borrow_mut().define(
            &stmt.name.lexeme,
            Value::Callable(Callable::Function(Rc::new(function))),
        );

        Ok(Flow::Normal)
    }

    fn visit_return_stmt(&mut self, stmt: &ReturnStmt) -> Result<Flow> {
        let value: Value = match &stmt.value {
            Some(expr) => self.evaluate(expr)?,
            None => Value::Nil,
        };

        debug!("Returning value: {}", value);

        Ok(Flow::Return(value))
    }

    fn visit_class_stmt(&mut self, stmt: &ClassStmt) -> Result<Flow> {
        debug!("Defining class '{}'", stmt.name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match &stmt.superclass {
            Some(superclass) => match self.lookup_variable(superclass.id, &superclass.name)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    return Err(LoxError::runtime(
                        superclass.name.line,
                        "Superclass must be a class.",
                    ))
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&stmt.name.lexeme, Value::Nil);

        // Methods close over a scope binding `super` when there is one.
        let method_env: EnvRef = match &superclass {
            Some(superclass) => {
                let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
                environment.define(
                    "super",
                    Value::Callable(Callable::Class(Rc::clone(superclass))),
                );
                environment.into_ref()
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<LoxFunction>> = stmt
            .methods
            .iter()
            .map(|method| {
                let is_initializer: bool = method.name.lexeme == INITIALIZER;
                let function =
                    LoxFunction::new(Rc::clone(method), Rc::clone(&method_env), is_initializer);

                (method.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = LoxClass::new(stmt.name.lexeme.clone(), superclass, methods);

        self.environment.borrow_mut().assign(
            &stmt.name.lexeme,
            Value::Callable(Callable::Class(Rc::new(class))),
            stmt.name.line,
        )?;

        Ok(Flow::Normal)
    }
}
