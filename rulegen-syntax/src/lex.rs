use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    Number(String),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Equals,
    Dot,
    Semicolon,
    /// Operator symbol: arithmetic, comparison, bitwise or augmented assignment (`+=`).
    Op(&'static str),
    /// Comment text including `#`. `own_line` is false when code precedes it on its line.
    Comment { text: String, own_line: bool },
    Eof,
}

/// A token with its source span. `offset..end` are byte offsets; `end_line` differs from `line`
/// only for strings that span lines.
#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
    pub offset: usize,
    pub end: usize,
    pub end_line: usize,
    /// False for the first token of a logical line: one that follows a newline outside any
    /// bracket and without a `\` continuation.
    pub continues: bool,
}

/// Operator symbols, longest first so that `//=` wins over `//` and `/`.
const OPERATORS: &[&str] = &[
    "//=", "<<=", ">>=", "**", "//", "<<", ">>", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "->", "+", "-", "*", "/", "%", "<", ">", "&", "|", "^", "~",
];

pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    col: usize,
    code_on_line: bool,
    fresh_line: bool,
    /// `Token::continues` for the token being read.
    continues: bool,
    /// Positions of the open brackets.
    open: Vec<(char, usize, usize)>,
    out: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
            col: 1,
            code_on_line: false,
            fresh_line: true,
            continues: false,
            open: Vec::new(),
            out: Vec::new(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
            self.code_on_line = false;
            if self.open.is_empty() {
                self.fresh_line = true;
            }
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn offset(&mut self) -> usize {
        match self.chars.peek() {
            Some((i, _)) => *i,
            None => self.src.len(),
        }
    }

    fn push(&mut self, kind: TokenKind, line: usize, col: usize, offset: usize) {
        let continues = self.continues;
        if !matches!(kind, TokenKind::Comment { .. }) {
            self.code_on_line = true;
            self.fresh_line = false;
        }
        let end = self.offset();
        let end_line = self.line;
        self.out.push(Token {
            kind,
            line,
            col,
            offset,
            end,
            end_line,
            continues,
        });
    }

    fn open_bracket(&mut self, c: char, line: usize, col: usize) {
        self.open.push((c, line, col));
    }

    fn close_bracket(&mut self, c: char, line: usize, col: usize) -> Result<(), ParseError> {
        let expected = match c {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.open.pop() {
            Some((open, _, _)) if open == expected => Ok(()),
            _ => Err(ParseError::new(line, col, format!("unmatched `{c}`"))),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(c) = self.peek() {
            let (line, col, offset) = (self.line, self.col, self.offset());
            self.continues = !self.fresh_line || !self.open.is_empty();
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '\\' => {
                    // Explicit line continuation.
                    self.bump();
                    if self.peek() == Some('\r') {
                        self.bump();
                    }
                    if self.peek() != Some('\n') {
                        return Err(ParseError::new(line, col, "stray backslash"));
                    }
                    let fresh_line = self.fresh_line;
                    self.bump();
                    self.fresh_line = fresh_line;
                    self.code_on_line = true;
                }
                '#' => {
                    let own_line = !self.code_on_line;
                    let mut text = String::new();
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        text.push(c);
                        self.bump();
                    }
                    let text = text.trim_end().to_string();
                    self.push(TokenKind::Comment { text, own_line }, line, col, offset);
                }
                '"' | '\'' => {
                    let s = self.string(c, false, line, col)?;
                    self.push(TokenKind::Str(s), line, col, offset);
                }
                c if c.is_ascii_digit() => {
                    let n = self.number();
                    self.push(TokenKind::Number(n), line, col, offset);
                }
                '.' if self.src[offset + 1..].starts_with(|c: char| c.is_ascii_digit()) => {
                    let n = self.number();
                    self.push(TokenKind::Number(n), line, col, offset);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let ident = self.ident();
                    // String prefixes: `r"..."` keeps backslashes, `b"..."` reads as a string.
                    let prefix = ident.to_ascii_lowercase();
                    if matches!(prefix.as_str(), "r" | "b" | "rb" | "br")
                        && let Some(q @ ('"' | '\'')) = self.peek()
                    {
                        let s = self.string(q, prefix.contains('r'), line, col)?;
                        self.push(TokenKind::Str(s), line, col, offset);
                    } else {
                        self.push(TokenKind::Ident(ident), line, col, offset);
                    }
                }
                _ => {
                    let kind = match c {
                        '(' => Some(TokenKind::LParen),
                        ')' => Some(TokenKind::RParen),
                        '[' => Some(TokenKind::LBracket),
                        ']' => Some(TokenKind::RBracket),
                        '{' => Some(TokenKind::LBrace),
                        '}' => Some(TokenKind::RBrace),
                        ',' => Some(TokenKind::Comma),
                        ':' => Some(TokenKind::Colon),
                        '.' => Some(TokenKind::Dot),
                        ';' => Some(TokenKind::Semicolon),
                        '=' if !self.src[offset..].starts_with("==") => Some(TokenKind::Equals),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        match c {
                            ')' | ']' | '}' => self.close_bracket(c, line, col)?,
                            _ => {}
                        }
                        self.bump();
                        self.push(kind, line, col, offset);
                        if matches!(c, '(' | '[' | '{') {
                            self.open_bracket(c, line, col);
                        }
                        continue;
                    }
                    let Some(op) = OPERATORS
                        .iter()
                        .find(|op| self.src[offset..].starts_with(**op))
                    else {
                        return Err(ParseError::new(
                            line,
                            col,
                            format!("unexpected character `{c}`"),
                        ));
                    };
                    for _ in 0..op.len() {
                        self.bump();
                    }
                    self.push(TokenKind::Op(*op), line, col, offset);
                }
            }
        }
        if let Some((c, line, col)) = self.open.pop() {
            return Err(ParseError::new(line, col, format!("unclosed `{c}`")));
        }
        let (line, col, offset) = (self.line, self.col, self.offset());
        self.continues = !self.fresh_line;
        self.push(TokenKind::Eof, line, col, offset);
        Ok(self.out)
    }

    /// Identifier including dotted member access (`native.glob`).
    fn ident(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            let dotted = c == '.'
                && self.src[self.offset() + 1..].starts_with(|n: char| n.is_alphabetic() || n == '_');
            if !(c.is_alphanumeric() || c == '_' || dotted) {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }

    /// Integer or float literal as written, including hex digits and signed exponents.
    fn number(&mut self) -> String {
        let mut n = String::new();
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && n.ends_with(['e', 'E'])
                && !n.starts_with("0x")
                && !n.starts_with("0X");
            if !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign) {
                break;
            }
            n.push(c);
            self.bump();
        }
        n
    }

    fn string(
        &mut self,
        quote: char,
        raw: bool,
        line: usize,
        col: usize,
    ) -> Result<String, ParseError> {
        self.bump();
        let triple = if self.peek() == Some(quote) {
            self.bump();
            if self.peek() == Some(quote) {
                self.bump();
                true
            } else {
                // Empty string.
                return Ok(String::new());
            }
        } else {
            false
        };

        let mut s = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ParseError::new(line, col, "unterminated string"));
            };
            match c {
                '\\' => {
                    let Some(e) = self.bump() else {
                        return Err(ParseError::new(line, col, "unterminated string"));
                    };
                    if raw {
                        s.push('\\');
                        s.push(e);
                        continue;
                    }
                    match e {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        '\\' | '"' | '\'' => s.push(e),
                        '\n' => {}
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                }
                '\n' if !triple => {
                    return Err(ParseError::new(line, col, "newline in string literal"));
                }
                c if c == quote => {
                    if !triple {
                        return Ok(s);
                    }
                    if self.peek() == Some(quote) {
                        self.bump();
                        if self.peek() == Some(quote) {
                            self.bump();
                            return Ok(s);
                        }
                        s.push(quote);
                    }
                    s.push(quote);
                }
                c => s.push(c),
            }
        }
    }
}
