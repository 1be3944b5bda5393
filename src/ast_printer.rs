use std::rc::Rc;

use crate::ast::{
    AssignExpr, BinaryExpr, BlockStmt, CallExpr, ClassStmt, Expr, ExprVisitor, ExpressionStmt,
    FunctionDecl, GetExpr, GroupingExpr, IfStmt, LiteralExpr, LiteralValue, LogicalExpr,
    PrintStmt, ReturnStmt, SetExpr, Stmt, StmtVisitor, SuperExpr, ThisExpr, UnaryExpr, VarStmt,
    VariableExpr, WhileStmt,
};

/// Converts a tree to the Crafting‑Interpreters parenthesised prefix form,
/// e.g. `(* (- 123.0) (group 45.67))`.  Debug aid for the `parse` command.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        expr.accept(&mut AstPrinter)
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        stmt.accept(&mut AstPrinter)
    }

    fn parenthesize(&mut self, name: &str, exprs: &[&Expr]) -> String {
        let mut s = format!("({}", name);
        for expr in exprs {
            s.push(' ');
            s.push_str(&expr.accept(self));
        }
        s.push(')');
        s
    }

    fn block(&mut self, name: &str, statements: &[Stmt]) -> String {
        let mut s = format!("({}", name);
        for stmt in statements {
            s.push(' ');
            s.push_str(&stmt.accept(self));
        }
        s.push(')');
        s
    }
}

impl ExprVisitor<String> for AstPrinter {
    // ── literals ────────────────────────────────────────────────
    fn visit_literal_expr(&mut self, expr: &LiteralExpr) -> String {
        match &expr.value {
            LiteralValue::True => "true".into(),

            LiteralValue::False => "false".into(),

            LiteralValue::Nil => "nil".into(),

            LiteralValue::Str(s) => s.clone(),

            LiteralValue::Number(n) => {
                if n.fract() == 0.0 {
                    // 3 → 3.0
                    format!("{:.1}", n)
                } else {
                    n.to_string()
                }
            }
        }
    }

    fn visit_grouping_expr(&mut self, expr: &GroupingExpr) -> String {
        self.parenthesize("group", &[&*expr.expression])
    }

    fn visit_unary_expr(&mut self, expr: &UnaryExpr) -> String {
        self.parenthesize(&expr.operator.lexeme, &[&*expr.right])
    }

    fn visit_binary_expr(&mut self, expr: &BinaryExpr) -> String {
        self.parenthesize(&expr.operator.lexeme, &[&*expr.left, &*expr.right])
    }

    fn visit_logical_expr(&mut self, expr: &LogicalExpr) -> String {
        self.parenthesize(&expr.operator.lexeme, &[&*expr.left, &*expr.right])
    }

    fn visit_variable_expr(&mut self, expr: &VariableExpr) -> String {
        expr.name.lexeme.clone()
    }

    fn visit_assign_expr(&mut self, expr: &AssignExpr) -> String {
        self.parenthesize(&format!("= {}", expr.name.lexeme), &[&*expr.value])
    }

    fn visit_call_expr(&mut self, expr: &CallExpr) -> String {
        let mut exprs: Vec<&Expr> = vec![&*expr.callee];
        exprs.extend(expr.arguments.iter());
        self.parenthesize("call", &exprs)
    }

    fn visit_get_expr(&mut self, expr: &GetExpr) -> String {
        self.parenthesize(&format!(". {}", expr.name.lexeme), &[&*expr.object])
    }

    fn visit_set_expr(&mut self, expr: &SetExpr) -> String {
        self.parenthesize(
            &format!("set {}", expr.name.lexeme),
            &[&*expr.object, &*expr.value],
        )
    }

    fn visit_this_expr(&mut self, _expr: &ThisExpr) -> String {
        "this".into()
    }

    fn visit_super_expr(&mut self, expr: &SuperExpr) -> String {
        format!("(super {})", expr.method.lexeme)
    }
}

impl StmtVisitor<String> for AstPrinter {
    fn visit_expression_stmt(&mut self, stmt: &ExpressionStmt) -> String {
        self.parenthesize(";", &[&stmt.expression])
    }

    fn visit_print_stmt(&mut self, stmt: &PrintStmt) -> String {
        self.parenthesize("print", &[&stmt.expression])
    }

    fn visit_var_stmt(&mut self, stmt: &VarStmt) -> String {
        match &stmt.initializer {
            Some(initializer) => {
                self.parenthesize(&format!("var {} =", stmt.name.lexeme), &[initializer])
            }
            None => format!("(var {})", stmt.name.lexeme),
        }
    }

    fn visit_block_stmt(&mut self, stmt: &BlockStmt) -> String {
        self.block("block", &stmt.statements)
    }

    fn visit_if_stmt(&mut self, stmt: &IfStmt) -> String {
        let condition = stmt.condition.accept(self);
        let then_branch = stmt.then_branch.accept(self);

        match &stmt.else_branch {
            Some(else_branch) => format!(
                "(if {} {} {})",
                condition,
                then_branch,
                else_branch.accept(self)
            ),
            None => format!("(if {} {})", condition, then_branch),
        }
    }

    fn visit_while_stmt(&mut self, stmt: &WhileStmt) -> String {
        let condition = stmt.condition.accept(self);
        format!("(while {} {})", condition, stmt.body.accept(self))
    }

    fn visit_function_stmt(&mut self, stmt: &Rc<FunctionDecl>) -> String {
        let params: Vec<&str> = stmt.params.iter().map(|p| p.lexeme.as_str()).collect();
        self.block(
            &format!("fun {}({})", stmt.name.lexeme, params.join(" ")),
            &stmt.body,
        )
    }

    fn visit_return_stmt(&mut self, stmt: &ReturnStmt) -> String {
        match &stmt.value {
            Some(value) => self.parenthesize("return", &[value]),
            None => "(return)".into(),
        }
    }

    fn visit_class_stmt(&mut self, stmt: &ClassStmt) -> String {
        let mut s = format!("(class {}", stmt.name.lexeme);
        if let Some(superclass) = &stmt.superclass {
            s.push_str(&format!(" < {}", superclass.name.lexeme));
        }
        for method in &stmt.methods {
            s.push(' ');
            s.push_str(&self.visit_function_stmt(method));
        }
        s.push(')');
        s
    }
}
