use crate::ast::{Arg, Call, Clause, Comments, Comprehension, Dict, Expr, File, List, Stmt, StmtKind};

const INDENT: usize = 4;

/// Prints a file in buildifier layout.
///
/// Statements are separated by one blank line, except that adjacent `load` statements stay
/// together.
pub fn print(file: &File) -> String {
    let mut p = Printer::default();
    for (i, stmt) in file.stmts.iter().enumerate() {
        let is_load = |s: &Stmt| s.call().is_some_and(Call::is_load);
        if i > 0 && !(is_load(&file.stmts[i - 1]) && is_load(stmt)) {
            p.out.push('\n');
        }
        p.comment_lines(&stmt.comments.before, 0);
        match &stmt.kind {
            StmtKind::Expr(expr) => p.expr(expr, 0, true),
            StmtKind::Assign { target, value } => {
                p.out.push_str(target);
                p.out.push_str(" = ");
                p.expr(value, 0, false);
            }
            StmtKind::Verbatim(text) => p.out.push_str(text),
        }
        p.suffix(&stmt.comments);
        p.out.push('\n');
    }
    if !file.trailing.is_empty() {
        if !file.stmts.is_empty() {
            p.out.push('\n');
        }
        p.comment_lines(&file.trailing, 0);
    }
    p.out
}

#[derive(Default)]
struct Printer {
    out: String,
}

impl Printer {
    fn indent(&mut self, n: usize) {
        self.out.extend(std::iter::repeat_n(' ', n));
    }

    fn comment_lines(&mut self, comments: &[String], indent: usize) {
        for c in comments {
            self.indent(indent);
            self.out.push_str(c);
            self.out.push('\n');
        }
    }

    fn suffix(&mut self, comments: &Comments) {
        if let Some(c) = &comments.suffix {
            self.out.push_str("  ");
            self.out.push_str(c);
        }
    }

    /// Writes `expr` starting at the cursor; continuation lines are indented relative to `indent`.
    fn expr(&mut self, expr: &Expr, indent: usize, top_level: bool) {
        match expr {
            Expr::Ident(s) | Expr::Number(s) => self.out.push_str(s),
            Expr::Str(s) => self.string(s),
            Expr::Call(call) => self.call(call, indent, top_level),
            Expr::List(list) => self.list(list, indent),
            Expr::Dict(dict) => self.dict(dict, indent),
            Expr::Tuple(tuple) => self.tuple(tuple, indent),
            Expr::Paren(inner) => {
                self.out.push('(');
                self.expr(inner, indent, false);
                self.out.push(')');
            }
            Expr::Binary(lhs, op, rhs) => {
                self.expr(lhs, indent, false);
                self.out.push(' ');
                self.out.push_str(op.as_str());
                self.out.push(' ');
                self.expr(rhs, indent, false);
            }
            Expr::Unary(op, operand) => {
                self.out.push_str(op.as_str());
                self.expr(operand, indent, false);
            }
            Expr::Dot(value, name) => {
                self.expr(value, indent, false);
                self.out.push('.');
                self.out.push_str(name);
            }
            Expr::Index(value, index) => {
                self.expr(value, indent, false);
                self.out.push('[');
                self.expr(index, indent, false);
                self.out.push(']');
            }
            Expr::Slice(slice) => {
                self.expr(&slice.value, indent, false);
                self.out.push('[');
                if let Some(start) = &slice.start {
                    self.expr(start, indent, false);
                }
                self.out.push(':');
                if let Some(stop) = &slice.stop {
                    self.expr(stop, indent, false);
                }
                if let Some(step) = &slice.step {
                    self.out.push(':');
                    self.expr(step, indent, false);
                }
                self.out.push(']');
            }
            Expr::Conditional(c) => {
                self.expr(&c.then, indent, false);
                self.out.push_str(" if ");
                self.expr(&c.cond, indent, false);
                self.out.push_str(" else ");
                self.expr(&c.otherwise, indent, false);
            }
            Expr::Comprehension(c) => self.comprehension(c, indent),
            Expr::Lambda(lambda) => {
                self.out.push_str("lambda");
                for (i, param) in lambda.params.iter().enumerate() {
                    self.out.push_str(if i == 0 { " " } else { ", " });
                    if let Some(name) = &param.name {
                        self.out.push_str(name);
                        self.out.push('=');
                    }
                    self.expr(&param.value, indent, false);
                }
                self.out.push_str(": ");
                self.expr(&lambda.body, indent, false);
            }
        }
    }

    fn comprehension(&mut self, c: &Comprehension, indent: usize) {
        self.out.push(if c.key.is_some() { '{' } else { '[' });
        if let Some(key) = &c.key {
            self.expr(key, indent, false);
            self.out.push_str(": ");
        }
        self.expr(&c.body, indent, false);
        for clause in &c.clauses {
            match clause {
                Clause::For { vars, iter } => {
                    self.out.push_str(" for ");
                    for (i, var) in vars.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        self.expr(var, indent, false);
                    }
                    self.out.push_str(" in ");
                    self.expr(iter, indent, false);
                }
                Clause::If(cond) => {
                    self.out.push_str(" if ");
                    self.expr(cond, indent, false);
                }
            }
        }
        self.out.push(if c.key.is_some() { '}' } else { ']' });
    }

    fn string(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '\\' => self.out.push_str("\\\\"),
                '"' => self.out.push_str("\\\""),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                '\r' => self.out.push_str("\\r"),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    fn call(&mut self, call: &Call, indent: usize, top_level: bool) {
        // Rule declarations put one argument per line; `load` and nested calls stay compact.
        let multiline = (top_level && !call.is_load() && call.args.iter().any(|a| a.name.is_some()))
            || call.args.iter().any(|a| !a.comments.is_empty())
            || !call.trailing.is_empty();

        if let Some(receiver) = &call.receiver {
            self.expr(receiver, indent, false);
            if !call.func.is_empty() {
                self.out.push('.');
            }
        }
        self.out.push_str(&call.func);
        self.out.push('(');
        if multiline {
            self.out.push('\n');
            for arg in &call.args {
                self.comment_lines(&arg.comments.before, indent + INDENT);
                self.indent(indent + INDENT);
                self.arg(arg, indent + INDENT);
                self.out.push(',');
                self.suffix(&arg.comments);
                self.out.push('\n');
            }
            self.comment_lines(&call.trailing, indent + INDENT);
            self.indent(indent);
        } else {
            for (i, arg) in call.args.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.arg(arg, indent);
            }
        }
        self.out.push(')');
    }

    fn arg(&mut self, arg: &Arg, indent: usize) {
        if let Some(name) = &arg.name {
            self.out.push_str(name);
            self.out.push_str(" = ");
        }
        self.expr(&arg.value, indent, false);
    }

    fn list(&mut self, list: &List, indent: usize) {
        let compact = list.trailing.is_empty()
            && match list.items.as_slice() {
                [] => true,
                [only] => only.comments.is_empty(),
                _ => false,
            };

        if compact {
            self.out.push('[');
            if let Some(item) = list.items.first() {
                self.expr(&item.value, indent, false);
            }
            self.out.push(']');
        } else {
            self.items_multiline(('[', ']'), list, indent);
        }
    }

    /// Tuples stay on one line unless they carry comments; one element keeps its comma.
    fn tuple(&mut self, tuple: &List, indent: usize) {
        if !tuple.trailing.is_empty() || tuple.items.iter().any(|i| !i.comments.is_empty()) {
            self.items_multiline(('(', ')'), tuple, indent);
            return;
        }
        self.out.push('(');
        for (i, item) in tuple.items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(&item.value, indent, false);
        }
        if tuple.items.len() == 1 {
            self.out.push(',');
        }
        self.out.push(')');
    }

    fn items_multiline(&mut self, (open, close): (char, char), list: &List, indent: usize) {
        self.out.push(open);
        self.out.push('\n');
        for item in &list.items {
            self.comment_lines(&item.comments.before, indent + INDENT);
            self.indent(indent + INDENT);
            self.expr(&item.value, indent + INDENT, false);
            self.out.push(',');
            self.suffix(&item.comments);
            self.out.push('\n');
        }
        self.comment_lines(&list.trailing, indent + INDENT);
        self.indent(indent);
        self.out.push(close);
    }

    fn dict(&mut self, dict: &Dict, indent: usize) {
        self.out.push('{');
        if dict.entries.is_empty() && dict.trailing.is_empty() {
            self.out.push('}');
            return;
        }
        self.out.push('\n');
        for entry in &dict.entries {
            self.comment_lines(&entry.comments.before, indent + INDENT);
            self.indent(indent + INDENT);
            self.expr(&entry.key, indent + INDENT, false);
            self.out.push_str(": ");
            self.expr(&entry.value, indent + INDENT, false);
            self.out.push(',');
            self.suffix(&entry.comments);
            self.out.push('\n');
        }
        self.comment_lines(&dict.trailing, indent + INDENT);
        self.indent(indent);
        self.out.push('}');
    }
}
