use crate::ast::{
    Arg, BinaryOp, Call, Clause, Comments, Comprehension, Conditional, Dict, DictEntry, Expr, File,
    Lambda, List, ListItem, Slice, Stmt, StmtKind, UnaryOp,
};
use crate::error::ParseError;
use crate::lex::{Token, TokenKind, tokenize};

/// Words that open a statement the tree does not model; such statements are kept as text.
const STATEMENT_KEYWORDS: &[&str] = &[
    "def", "if", "elif", "else", "for", "while", "return", "pass", "break", "continue",
];

/// Words that can never start an expression.
const RESERVED: &[&str] = &[
    "and", "break", "continue", "def", "elif", "else", "for", "if", "in", "lambda", "not", "or",
    "pass", "return", "while",
];

/// Parses BUILD file source text.
pub fn parse(src: &str) -> Result<File, ParseError> {
    let tokens = tokenize(src)?;
    Parser {
        src,
        tokens,
        pos: 0,
    }
    .file()
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    /// Index of the n-th significant (non-comment) token at or after the cursor.
    fn significant(&self, mut n: usize) -> usize {
        let mut i = self.pos;
        loop {
            match &self.tokens[i].kind {
                TokenKind::Comment { .. } => {}
                TokenKind::Eof => return i,
                _ if n == 0 => return i,
                _ => n -= 1,
            }
            i += 1;
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.significant(0)].kind
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        &self.tokens[self.significant(n)].kind
    }

    /// True when the next token is the keyword `word`.
    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(w) if w == word)
    }

    /// False when the next token starts a new logical line.
    fn continues(&self) -> bool {
        self.tokens[self.significant(0)].continues
    }

    /// Consumes the next significant token; comments in between are dropped.
    fn bump(&mut self) -> Token {
        let i = self.significant(0);
        let tok = self.tokens[i].clone();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos = i + 1;
        } else {
            self.pos = i;
        }
        tok
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let tok = &self.tokens[self.significant(0)];
        ParseError::new(tok.line, tok.col, message)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ParseError> {
        if *self.peek() == kind {
            self.bump();
            Ok(())
        } else {
            Err(self.error_here(format!("expected {what}, found {}", describe(self.peek()))))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.at_word(word) {
            self.bump();
            Ok(())
        } else {
            Err(self.error_here(format!("expected `{word}`, found {}", describe(self.peek()))))
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if *self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes all comments at the cursor.
    fn comments(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while let TokenKind::Comment { text, .. } = &self.tokens[self.pos].kind {
            out.push(text.clone());
            self.pos += 1;
        }
        out
    }

    /// Consumes a comment that shares its line with the preceding code.
    fn suffix(&mut self) -> Option<String> {
        match &self.tokens[self.pos].kind {
            TokenKind::Comment {
                text,
                own_line: false,
            } => {
                let text = text.clone();
                self.pos += 1;
                Some(text)
            }
            _ => None,
        }
    }

    fn file(mut self) -> Result<File, ParseError> {
        let mut file = File::default();
        loop {
            let before = self.comments();
            if matches!(self.tokens[self.pos].kind, TokenKind::Eof) {
                file.trailing = before;
                return Ok(file);
            }
            let kind = self.stmt()?;
            self.eat(TokenKind::Semicolon);
            let suffix = self.suffix();
            file.stmts.push(Stmt {
                comments: Comments { before, suffix },
                kind,
            });
        }
    }

    fn stmt(&mut self) -> Result<StmtKind, ParseError> {
        let start = self.significant(0);
        if let TokenKind::Ident(word) = self.peek()
            && STATEMENT_KEYWORDS.contains(&word.as_str())
        {
            return Ok(self.verbatim(start));
        }
        if let Some(target) = self.keyword() {
            let value = self.test()?;
            if self.continues() && matches!(self.peek(), TokenKind::Comma | TokenKind::Equals) {
                return Ok(self.verbatim(start));
            }
            return Ok(StmtKind::Assign { target, value });
        }
        let expr = self.test()?;
        if self.continues() {
            match self.peek() {
                TokenKind::Comma | TokenKind::Equals => return Ok(self.verbatim(start)),
                TokenKind::Op(op) if is_augmented(op) => return Ok(self.verbatim(start)),
                _ => {}
            }
        }
        Ok(StmtKind::Expr(expr))
    }

    /// Takes the statement starting at token `start` as source text. It runs to the next logical
    /// line that starts in the first column, so indented blocks and their comments come along.
    fn verbatim(&mut self, start: usize) -> StmtKind {
        let mut last = start;
        let mut i = start + 1;
        loop {
            let tok = &self.tokens[i];
            if matches!(tok.kind, TokenKind::Eof)
                || (!tok.continues && tok.col == 1 && !self.continues_block(i))
            {
                break;
            }
            if !matches!(tok.kind, TokenKind::Comment { own_line: true, .. }) || tok.col > 1 {
                last = i;
            }
            i += 1;
        }

        let from = self.tokens[start].offset;
        let to = self.tokens[last].end;
        let line_end = self.src[to..].find('\n').map_or(self.src.len(), |n| to + n);
        self.pos = last + 1;
        StmtKind::Verbatim(self.src[from..line_end].trim_end().to_string())
    }

    /// Whether the first-column token `i` still belongs to the block being read: an `elif` or
    /// `else` branch, or a comment followed by more indented lines.
    fn continues_block(&self, i: usize) -> bool {
        match &self.tokens[i].kind {
            TokenKind::Ident(w) => matches!(w.as_str(), "elif" | "else"),
            TokenKind::Comment { .. } => self.tokens[i..]
                .iter()
                .find(|t| !matches!(t.kind, TokenKind::Comment { .. }))
                .is_some_and(|t| t.col > 1 && !matches!(t.kind, TokenKind::Eof)),
            _ => false,
        }
    }

    /// Consumes `ident =` and returns the identifier, if that is what comes next.
    fn keyword(&mut self) -> Option<String> {
        let name = match (self.peek(), self.peek_nth(1)) {
            (TokenKind::Ident(name), TokenKind::Equals) if !RESERVED.contains(&name.as_str()) => {
                name.clone()
            }
            _ => return None,
        };
        self.bump();
        self.bump();
        Some(name)
    }

    /// A full expression: a conditional, a lambda or an operator expression.
    fn test(&mut self) -> Result<Expr, ParseError> {
        if self.at_word("lambda") {
            return self.lambda();
        }
        let then = self.binary(1)?;
        if !(self.continues() && self.at_word("if")) {
            return Ok(then);
        }
        self.bump();
        let cond = self.binary(1)?;
        self.expect_word("else")?;
        let otherwise = self.test()?;
        Ok(Expr::Conditional(Box::new(Conditional {
            then,
            cond,
            otherwise,
        })))
    }

    /// Precedence climbing over binary operators binding at least as tightly as `min`.
    fn binary(&mut self, min: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some((op, width)) = self.binary_op() {
            if op.precedence() < min {
                break;
            }
            for _ in 0..width {
                self.bump();
            }
            let rhs = self.binary(op.precedence() + 1)?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Ok(lhs)
    }

    /// The binary operator at the cursor and how many tokens it spans.
    fn binary_op(&self) -> Option<(BinaryOp, usize)> {
        if !self.continues() {
            return None;
        }
        let op = match self.peek() {
            TokenKind::Ident(word) => match word.as_str() {
                "or" => BinaryOp::Or,
                "and" => BinaryOp::And,
                "in" => BinaryOp::In,
                "not" if matches!(self.peek_nth(1), TokenKind::Ident(next) if next == "in") => {
                    return Some((BinaryOp::NotIn, 2));
                }
                _ => return None,
            },
            TokenKind::Op(op) => match *op {
                "==" => BinaryOp::Eq,
                "!=" => BinaryOp::Ne,
                "<" => BinaryOp::Lt,
                "<=" => BinaryOp::Le,
                ">" => BinaryOp::Gt,
                ">=" => BinaryOp::Ge,
                "|" => BinaryOp::BitOr,
                "^" => BinaryOp::BitXor,
                "&" => BinaryOp::BitAnd,
                "<<" => BinaryOp::Shl,
                ">>" => BinaryOp::Shr,
                "+" => BinaryOp::Add,
                "-" => BinaryOp::Sub,
                "*" => BinaryOp::Mul,
                "/" => BinaryOp::Div,
                "//" => BinaryOp::FloorDiv,
                "%" => BinaryOp::Mod,
                _ => return None,
            },
            _ => return None,
        };
        Some((op, 1))
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.at_word("not") {
            self.bump();
            // Comparisons bind tighter than `not`.
            let operand = self.binary(BinaryOp::Eq.precedence())?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        let op = match self.peek() {
            TokenKind::Op("-") => UnaryOp::Neg,
            TokenKind::Op("+") => UnaryOp::Pos,
            TokenKind::Op("~") => UnaryOp::Invert,
            _ => return self.postfix(),
        };
        self.bump();
        let operand = self.unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    /// An operand followed by any number of calls, subscripts and attribute accesses.
    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.operand()?;
        while self.continues() {
            match self.peek() {
                TokenKind::LParen => {
                    self.bump();
                    expr = Expr::Call(self.call(expr)?);
                }
                TokenKind::LBracket => {
                    self.bump();
                    expr = self.subscript(expr)?;
                }
                TokenKind::Dot => {
                    self.bump();
                    let tok = self.bump();
                    let TokenKind::Ident(name) = tok.kind else {
                        return Err(ParseError::new(
                            tok.line,
                            tok.col,
                            format!("expected an attribute name, found {}", describe(&tok.kind)),
                        ));
                    };
                    expr = Expr::Dot(Box::new(expr), name);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn operand(&mut self) -> Result<Expr, ParseError> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Ident(name) if !RESERVED.contains(&name.as_str()) => Ok(Expr::Ident(name)),
            TokenKind::LBracket => self.list(),
            TokenKind::LBrace => self.dict(),
            TokenKind::LParen => self.paren(),
            other => Err(ParseError::new(
                tok.line,
                tok.col,
                format!("expected an expression, found {}", describe(&other)),
            )),
        }
    }

    /// Arguments after `(`, through `)`.
    fn call(&mut self, callee: Expr) -> Result<Call, ParseError> {
        let (receiver, func) = match callee {
            Expr::Ident(name) => (None, name),
            Expr::Dot(value, name) => (Some(value), name),
            other => (Some(Box::new(other)), String::new()),
        };
        let mut call = Call {
            receiver,
            func,
            args: Vec::new(),
            trailing: Vec::new(),
        };
        loop {
            let before = self.comments();
            if self.eat(TokenKind::RParen) {
                call.trailing = before;
                return Ok(call);
            }
            let name = self.keyword();
            let value = self.argument()?;
            let (suffix, more) = self.separator();
            call.args.push(Arg {
                comments: Comments { before, suffix },
                name,
                value,
            });
            if !more {
                call.trailing = self.comments();
                self.expect(TokenKind::RParen, "`,` or `)`")?;
                return Ok(call);
            }
        }
    }

    /// An argument or parameter, including the `*args` and `**kwargs` forms.
    fn argument(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            TokenKind::Op("*") => UnaryOp::Star,
            TokenKind::Op("**") => UnaryOp::StarStar,
            _ => return self.test(),
        };
        self.bump();
        Ok(Expr::Unary(op, Box::new(self.test()?)))
    }

    /// Index or slice after `[`, through `]`.
    fn subscript(&mut self, value: Expr) -> Result<Expr, ParseError> {
        let start = self.slice_bound()?;
        if !self.eat(TokenKind::Colon) {
            let Some(index) = start else {
                return Err(self.error_here("expected an index"));
            };
            self.expect(TokenKind::RBracket, "`]`")?;
            return Ok(Expr::Index(Box::new(value), Box::new(index)));
        }
        let stop = self.slice_bound()?;
        let step = if self.eat(TokenKind::Colon) {
            self.slice_bound()?
        } else {
            None
        };
        self.expect(TokenKind::RBracket, "`]`")?;
        Ok(Expr::Slice(Box::new(Slice {
            value,
            start,
            stop,
            step,
        })))
    }

    fn slice_bound(&mut self) -> Result<Option<Expr>, ParseError> {
        match self.peek() {
            TokenKind::Colon | TokenKind::RBracket => Ok(None),
            _ => self.test().map(Some),
        }
    }

    /// List or list comprehension after `[`.
    fn list(&mut self) -> Result<Expr, ParseError> {
        let before = self.comments();
        if self.eat(TokenKind::RBracket) {
            return Ok(Expr::List(List {
                items: Vec::new(),
                trailing: before,
            }));
        }
        let first = self.test()?;
        if self.at_word("for") {
            let clauses = self.clauses()?;
            self.expect(TokenKind::RBracket, "`]`")?;
            return Ok(Expr::Comprehension(Box::new(Comprehension {
                key: None,
                body: first,
                clauses,
            })));
        }
        let (list, _) = self.sequence(before, first, TokenKind::RBracket, "`]`")?;
        Ok(Expr::List(list))
    }

    /// Tuple or parenthesized expression after `(`.
    fn paren(&mut self) -> Result<Expr, ParseError> {
        let before = self.comments();
        if self.eat(TokenKind::RParen) {
            return Ok(Expr::Tuple(List {
                items: Vec::new(),
                trailing: before,
            }));
        }
        let first = self.test()?;
        let (mut list, comma) = self.sequence(before, first, TokenKind::RParen, "`)`")?;
        if !comma && let Some(item) = list.items.pop() {
            return Ok(Expr::Paren(Box::new(item.value)));
        }
        Ok(Expr::Tuple(list))
    }

    /// Remaining elements of a list or tuple whose first element is parsed, through `close`.
    /// Also returns whether any comma was read.
    fn sequence(
        &mut self,
        mut before: Vec<String>,
        first: Expr,
        close: TokenKind,
        what: &str,
    ) -> Result<(List, bool), ParseError> {
        let mut list = List::default();
        let mut value = first;
        let mut comma = false;
        loop {
            let (suffix, more) = self.separator();
            list.items.push(ListItem {
                comments: Comments { before, suffix },
                value,
            });
            if !more {
                list.trailing = self.comments();
                self.expect(close, &format!("`,` or {what}"))?;
                return Ok((list, comma));
            }
            comma = true;
            before = self.comments();
            if self.eat(close.clone()) {
                list.trailing = before;
                return Ok((list, comma));
            }
            value = self.test()?;
        }
    }

    /// Dict or dict comprehension after `{`.
    fn dict(&mut self) -> Result<Expr, ParseError> {
        let mut dict = Dict::default();
        let mut before = self.comments();
        if self.eat(TokenKind::RBrace) {
            dict.trailing = before;
            return Ok(Expr::Dict(dict));
        }
        let (mut key, mut value) = self.dict_entry()?;
        if self.at_word("for") {
            let clauses = self.clauses()?;
            self.expect(TokenKind::RBrace, "`}`")?;
            return Ok(Expr::Comprehension(Box::new(Comprehension {
                key: Some(key),
                body: value,
                clauses,
            })));
        }
        loop {
            let (suffix, more) = self.separator();
            dict.entries.push(DictEntry {
                comments: Comments { before, suffix },
                key,
                value,
            });
            if !more {
                dict.trailing = self.comments();
                self.expect(TokenKind::RBrace, "`,` or `}`")?;
                return Ok(Expr::Dict(dict));
            }
            before = self.comments();
            if self.eat(TokenKind::RBrace) {
                dict.trailing = before;
                return Ok(Expr::Dict(dict));
            }
            (key, value) = self.dict_entry()?;
        }
    }

    fn dict_entry(&mut self) -> Result<(Expr, Expr), ParseError> {
        let key = self.test()?;
        self.expect(TokenKind::Colon, "`:`")?;
        let value = self.test()?;
        Ok((key, value))
    }

    /// `for` and `if` clauses of a comprehension.
    fn clauses(&mut self) -> Result<Vec<Clause>, ParseError> {
        let mut clauses = Vec::new();
        loop {
            if self.at_word("for") {
                self.bump();
                let mut vars = vec![self.postfix()?];
                while self.eat(TokenKind::Comma) {
                    vars.push(self.postfix()?);
                }
                self.expect_word("in")?;
                let iter = self.binary(1)?;
                clauses.push(Clause::For { vars, iter });
            } else if self.at_word("if") {
                self.bump();
                clauses.push(Clause::If(self.binary(1)?));
            } else {
                return Ok(clauses);
            }
        }
    }

    fn lambda(&mut self) -> Result<Expr, ParseError> {
        self.bump();
        let mut params = Vec::new();
        while *self.peek() != TokenKind::Colon {
            let name = self.keyword();
            let value = self.argument()?;
            params.push(Arg {
                comments: Comments::default(),
                name,
                value,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon, "`:`")?;
        let body = self.test()?;
        Ok(Expr::Lambda(Box::new(Lambda { params, body })))
    }

    /// Reads the optional `,` after an element together with the element's trailing comment,
    /// which may sit on either side of the comma. Returns whether a comma was found.
    fn separator(&mut self) -> (Option<String>, bool) {
        let mut suffix = self.suffix();
        let more = self.eat_raw_comma();
        if suffix.is_none() {
            suffix = self.suffix();
        }
        (suffix, more)
    }

    fn eat_raw_comma(&mut self) -> bool {
        if matches!(self.tokens[self.pos].kind, TokenKind::Comma) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

/// `+=` and friends.
fn is_augmented(op: &str) -> bool {
    op.len() >= 2 && op.ends_with('=') && !matches!(op, "==" | "!=" | "<=" | ">=")
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(s) if RESERVED.contains(&s.as_str()) => format!("keyword `{s}`"),
        TokenKind::Ident(s) => format!("identifier `{s}`"),
        TokenKind::Number(n) => format!("number `{n}`"),
        TokenKind::Str(_) => "string".to_string(),
        TokenKind::Op(op) => format!("`{op}`"),
        TokenKind::Comment { .. } => "comment".to_string(),
        TokenKind::Eof => "end of file".to_string(),
        TokenKind::LParen => "`(`".to_string(),
        TokenKind::RParen => "`)`".to_string(),
        TokenKind::LBracket => "`[`".to_string(),
        TokenKind::RBracket => "`]`".to_string(),
        TokenKind::LBrace => "`{`".to_string(),
        TokenKind::RBrace => "`}`".to_string(),
        TokenKind::Comma => "`,`".to_string(),
        TokenKind::Colon => "`:`".to_string(),
        TokenKind::Equals => "`=`".to_string(),
        TokenKind::Dot => "`.`".to_string(),
        TokenKind::Semicolon => "`;`".to_string(),
    }
}
