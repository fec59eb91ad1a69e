//! LaTiao Lexer.

use latiao_common::utils::error::SourceSpan;

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal.
    Number(f64),
    /// Quoted string literal, escapes resolved.
    String(String),
    /// Bare field name.
    Ident(String),
    /// Backtick-quoted field name.
    Quoted(String),
    /// Operator name, including the `$` sigil.
    OpName(String),
    /// `out` keyword.
    Out,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `=`
    Eq,
    /// Malformed input.
    Error(String),
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {n}"),
            Self::String(s) => format!("string \"{s}\""),
            Self::Ident(s) | Self::Quoted(s) => format!("identifier \"{s}\""),
            Self::OpName(s) => format!("operator {s}"),
            Self::Out => "\"out\"".to_string(),
            Self::Comma => "\",\"".to_string(),
            Self::Dot => "\".\"".to_string(),
            Self::LParen => "\"(\"".to_string(),
            Self::RParen => "\")\"".to_string(),
            Self::Plus => "\"+\"".to_string(),
            Self::Minus => "\"-\"".to_string(),
            Self::Star => "\"*\"".to_string(),
            Self::Slash => "\"/\"".to_string(),
            Self::Eq => "\"=\"".to_string(),
            Self::Error(msg) => msg.clone(),
            Self::Eof => "end of input".to_string(),
        }
    }

    /// Returns whether an expression can start with this token.
    pub fn starts_expression(&self) -> bool {
        matches!(
            self,
            Self::Number(_)
                | Self::String(_)
                | Self::Ident(_)
                | Self::Quoted(_)
                | Self::OpName(_)
                | Self::LParen
                | Self::Minus
        )
    }
}

/// A token with its position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Byte span in the source.
    pub span: SourceSpan,
}

/// Characters that end a bare name.
const NAME_STOP: &str = "$,.;:'\"`+-~!?<>@#%^&*/\\|()[]{}=";

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !NAME_STOP.contains(c)
}

/// LaTiao lexer.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenizes the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = matches!(token.kind, TokenKind::Eof | TokenKind::Error(_));
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return self.token(TokenKind::Eof, start);
        };

        let kind = match c {
            ',' => self.single(TokenKind::Comma),
            '.' => self.single(TokenKind::Dot),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '=' => self.single(TokenKind::Eq),
            '\'' | '"' => self.scan_string(c),
            '`' => self.scan_quoted(),
            '$' => self.scan_op_name(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if is_name_char(c) => {
                let name = self.take_while(is_name_char);
                if name == "out" {
                    TokenKind::Out
                } else {
                    TokenKind::Ident(name.to_string())
                }
            }
            c => {
                self.bump();
                TokenKind::Error(format!("Unexpected character '{c}'"))
            }
        };
        self.token(kind, start)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: SourceSpan::new(start, self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        // A dot only continues the number when a digit follows, so that
        // `2020.Y`-style member access is not swallowed.
        let rest = &self.input[self.pos..];
        if rest.starts_with('.') && rest[1..].starts_with(|c: char| c.is_ascii_digit()) {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        let rest = &self.input[self.pos..];
        if rest.starts_with(['e', 'E']) {
            let exp = rest[1..].strip_prefix(['+', '-']).unwrap_or(&rest[1..]);
            if exp.starts_with(|c: char| c.is_ascii_digit()) {
                self.pos += rest.len() - exp.len();
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        let text = &self.input[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Error(format!("Invalid number '{text}'")),
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        self.bump();
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                c if c == quote => return TokenKind::String(out),
                '\\' => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some(other) => out.push(other),
                    None => break,
                },
                c => out.push(c),
            }
        }
        TokenKind::Error("Unterminated string literal".to_string())
    }

    fn scan_quoted(&mut self) -> TokenKind {
        self.bump();
        let name = self.take_while(|c| c != '`');
        if self.bump().is_none() {
            return TokenKind::Error("Unterminated quoted name".to_string());
        }
        TokenKind::Quoted(name.to_string())
    }

    fn scan_op_name(&mut self) -> TokenKind {
        self.bump();
        let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
        if name.is_empty() {
            return TokenKind::Error("Expected an operator name after '$'".to_string());
        }
        TokenKind::OpName(format!("${name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_export_statement() {
        assert_eq!(
            kinds("out y = $normalize(price)"),
            vec![
                TokenKind::Out,
                TokenKind::Ident("y".into()),
                TokenKind::Eq,
                TokenKind::OpName("$normalize".into()),
                TokenKind::LParen,
                TokenKind::Ident("price".into()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"1.5e3 'a\'b' "c" `my field`"#),
            vec![
                TokenKind::Number(1500.0),
                TokenKind::String("a'b".into()),
                TokenKind::String("c".into()),
                TokenKind::Quoted("my field".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_member_after_number_and_name() {
        assert_eq!(
            kinds("d.YM 2.Y"),
            vec![
                TokenKind::Ident("d".into()),
                TokenKind::Dot,
                TokenKind::Ident("YM".into()),
                TokenKind::Number(2.0),
                TokenKind::Dot,
                TokenKind::Ident("Y".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_outer_is_a_name() {
        assert_eq!(kinds("outer")[0], TokenKind::Ident("outer".into()));
        assert_eq!(kinds("价格")[0], TokenKind::Ident("价格".into()));
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("out  $f(x)").tokenize();
        assert_eq!(tokens[1].span, SourceSpan::new(5, 7));
        assert_eq!(tokens[3].span, SourceSpan::new(8, 9));
    }

    #[test]
    fn test_errors_stop_tokenizing() {
        let tokens = Lexer::new("'open").tokenize();
        assert!(matches!(tokens.last().unwrap().kind, TokenKind::Error(_)));
        let tokens = Lexer::new("$ x").tokenize();
        assert!(matches!(tokens[0].kind, TokenKind::Error(_)));
    }
}
