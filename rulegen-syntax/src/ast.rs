use crate::KEEP_MARKER;

/// Comments attached to a node: whole-line comments above it and one trailing comment on its
/// last line. Text includes the leading `#`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub before: Vec<String>,
    pub suffix: Option<String>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.suffix.is_none()
    }

    /// True when the trailing comment is the `# keep` marker.
    pub fn has_keep(&self) -> bool {
        self.suffix
            .as_deref()
            .is_some_and(|c| c.trim_start_matches('#').trim() == KEEP_MARKER)
    }

    pub fn keep() -> Self {
        Self {
            before: Vec::new(),
            suffix: Some(format!("# {KEEP_MARKER}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    pub stmts: Vec<Stmt>,
    /// Comments after the last statement.
    pub trailing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub comments: Comments,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Expr(Expr),
    Assign { target: String, value: Expr },
    /// A statement kept exactly as written: `def` and other compound statements, augmented
    /// assignments, and assignments to anything but a plain name.
    Verbatim(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Identifier, possibly dotted (`native.glob`, `True`).
    Ident(String),
    /// Numeric literal as written.
    Number(String),
    Str(String),
    Call(Call),
    List(List),
    Dict(Dict),
    /// `(a, b)`; a one-element tuple prints with its trailing comma.
    Tuple(List),
    /// A parenthesized expression.
    Paren(Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    /// Attribute of anything that is not a plain name: `"{}".format`, `f().x`.
    Dot(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Slice(Box<Slice>),
    /// `then if cond else otherwise`.
    Conditional(Box<Conditional>),
    Comprehension(Box<Comprehension>),
    Lambda(Box<Lambda>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
        }
    }

    /// Binding strength; higher binds tighter. `not` sits between `and` and the comparisons.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::In
            | BinaryOp::NotIn => 4,
            BinaryOp::BitOr => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitAnd => 7,
            BinaryOp::Shl | BinaryOp::Shr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    Invert,
    /// `*args` in an argument or parameter list.
    Star,
    /// `**kwargs` in an argument or parameter list.
    StarStar,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "not ",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert => "~",
            UnaryOp::Star => "*",
            UnaryOp::StarStar => "**",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub value: Expr,
    pub start: Option<Expr>,
    pub stop: Option<Expr>,
    pub step: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    pub then: Expr,
    pub cond: Expr,
    pub otherwise: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comprehension {
    /// `{k: v for ...}` when set, `[body for ...]` otherwise.
    pub key: Option<Expr>,
    pub body: Expr,
    pub clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    For { vars: Vec<Expr>, iter: Expr },
    If(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lambda {
    /// Parameters: names, `name = default` keywords and `*`/`**` forms.
    pub params: Vec<Arg>,
    pub body: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Call {
    /// Value the function is looked up on, for calls like `"{}".format(x)`. With an empty
    /// `func` the receiver itself is called.
    pub receiver: Option<Box<Expr>>,
    pub func: String,
    pub args: Vec<Arg>,
    /// Comments between the last argument and `)`.
    pub trailing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub comments: Comments,
    /// Keyword; `None` for positional arguments.
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct List {
    pub items: Vec<ListItem>,
    pub trailing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub comments: Comments,
    pub value: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    pub entries: Vec<DictEntry>,
    pub trailing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    pub comments: Comments,
    pub key: Expr,
    pub value: Expr,
}

impl File {
    /// Top-level call statements with their statement index.
    pub fn calls(&self) -> impl Iterator<Item = (usize, &Call)> {
        self.stmts
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.call().map(|c| (i, c)))
    }

    /// Top-level call statements that declare rules (everything except `load`).
    pub fn rule_calls(&self) -> impl Iterator<Item = (usize, &Call)> {
        self.calls().filter(|(_, c)| !c.is_load())
    }
}

impl Stmt {
    pub fn expr(expr: Expr) -> Self {
        Self {
            comments: Comments::default(),
            kind: StmtKind::Expr(expr),
        }
    }

    /// The statement's call, when it is a plain function call such as a rule declaration.
    pub fn call(&self) -> Option<&Call> {
        match &self.kind {
            StmtKind::Expr(Expr::Call(c)) if c.receiver.is_none() => Some(c),
            _ => None,
        }
    }
}

impl Expr {
    pub fn string(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expr::List(List {
            items: items
                .into_iter()
                .map(|s| ListItem::new(Expr::Str(s.into())))
                .collect(),
            trailing: Vec::new(),
        })
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(Box::new(lhs), BinaryOp::Add, Box::new(rhs))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Expr::List(l) => Some(l),
            _ => None,
        }
    }

    /// Branches of a `select({...})` call.
    pub fn as_select(&self) -> Option<&Dict> {
        match self {
            Expr::Call(c) if c.is_select() => match c.args.first().map(|a| &a.value) {
                Some(Expr::Dict(d)) => Some(d),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Expr::Call(c) if c.is_select() => match c.args.first_mut().map(|a| &mut a.value) {
                Some(Expr::Dict(d)) => Some(d),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Call {
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            receiver: None,
            func: func.into(),
            args: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub fn is_load(&self) -> bool {
        self.receiver.is_none() && self.func == "load"
    }

    pub fn is_select(&self) -> bool {
        self.receiver.is_none() && self.func == "select"
    }

    pub fn kwarg(&self, name: &str) -> Option<&Arg> {
        self.args.iter().find(|a| a.name.as_deref() == Some(name))
    }

    /// String value of the `name` keyword argument.
    pub fn name(&self) -> Option<&str> {
        self.kwarg("name").and_then(|a| a.value.as_str())
    }

    pub fn positional(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter().filter(|a| a.name.is_none())
    }
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Self {
            comments: Comments::default(),
            name: None,
            value,
        }
    }

    pub fn keyword(name: impl Into<String>, value: Expr) -> Self {
        Self {
            comments: Comments::default(),
            name: Some(name.into()),
            value,
        }
    }
}

impl ListItem {
    pub fn new(value: Expr) -> Self {
        Self {
            comments: Comments::default(),
            value,
        }
    }
}
