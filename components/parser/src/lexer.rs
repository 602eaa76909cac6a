//! Java Lexer - tokenizes statement fragments into tokens

use crate::error::syntax_error;
use core_types::{SourceError, SourcePosition};

/// Java keywords recognised in statement fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// boolean
    Boolean,
    /// byte
    Byte,
    /// char
    Char,
    /// short
    Short,
    /// int
    Int,
    /// long
    Long,
    /// float
    Float,
    /// double
    Double,
    /// void
    Void,
    /// final
    Final,
    /// if
    If,
    /// else
    Else,
    /// while
    While,
    /// do
    Do,
    /// for
    For,
    /// return
    Return,
    /// break
    Break,
    /// continue
    Continue,
    /// throw
    Throw,
    /// new
    New,
    /// this
    This,
    /// super
    Super,
    /// true
    True,
    /// false
    False,
    /// null
    Null,
    /// instanceof
    Instanceof,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "boolean" => Keyword::Boolean,
            "byte" => Keyword::Byte,
            "char" => Keyword::Char,
            "short" => Keyword::Short,
            "int" => Keyword::Int,
            "long" => Keyword::Long,
            "float" => Keyword::Float,
            "double" => Keyword::Double,
            "void" => Keyword::Void,
            "final" => Keyword::Final,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "do" => Keyword::Do,
            "for" => Keyword::For,
            "return" => Keyword::Return,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "throw" => Keyword::Throw,
            "new" => Keyword::New,
            "this" => Keyword::This,
            "super" => Keyword::Super,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            "instanceof" => Keyword::Instanceof,
            _ => return None,
        };
        Some(keyword)
    }

    /// Check if this keyword names a primitive type
    pub fn is_primitive_type(self) -> bool {
        matches!(
            self,
            Keyword::Boolean
                | Keyword::Byte
                | Keyword::Char
                | Keyword::Short
                | Keyword::Int
                | Keyword::Long
                | Keyword::Float
                | Keyword::Double
        )
    }
}

/// Reserved words outside the supported subset; rejected as identifiers
const RESERVED: &[&str] = &[
    "abstract", "assert", "case", "catch", "class", "const", "default", "enum", "extends",
    "finally", "goto", "implements", "import", "interface", "native", "package", "private",
    "protected", "public", "static", "strictfp", "switch", "synchronized", "throws",
    "transient", "try", "volatile",
];

/// Java operators and delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// [
    LBracket,
    /// ]
    RBracket,
    /// ;
    Semicolon,
    /// ,
    Comma,
    /// .
    Dot,
    /// ?
    Question,
    /// :
    Colon,
    /// =
    Assign,
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// ++
    PlusPlus,
    /// --
    MinusMinus,
    /// ==
    EqEq,
    /// !=
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// &&
    AndAnd,
    /// ||
    OrOr,
    /// !
    Not,
    /// &
    And,
    /// |
    Or,
    /// ^
    Xor,
    /// ~
    Tilde,
    /// <<
    LtLt,
    /// >>
    GtGt,
    /// >>>
    GtGtGt,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,
    /// %=
    PercentEq,
    /// &=
    AndEq,
    /// |=
    OrEq,
    /// ^=
    XorEq,
    /// <<=
    LtLtEq,
    /// >>=
    GtGtEq,
    /// >>>=
    GtGtGtEq,
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier
    Identifier(String),
    /// Integer literal without suffix
    ///
    /// Hex, octal and binary literals arrive already wrapped into the `int`
    /// range; a decimal literal may be 2147483648, valid only when negated.
    IntLiteral(i64),
    /// Integer literal with `L` suffix, same conventions as `IntLiteral`
    LongLiteral(i128),
    /// Float literal with `f` suffix
    FloatLiteral(f32),
    /// Double literal
    DoubleLiteral(f64),
    /// Character literal as a UTF-16 code unit
    CharLiteral(u16),
    /// String literal
    StringLiteral(String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// End of file
    EOF,
}

impl Token {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::IntLiteral(n) => format!("number {}", n),
            Token::LongLiteral(n) => format!("number {}L", n),
            Token::FloatLiteral(n) => format!("number {}", n),
            Token::DoubleLiteral(n) => format!("number {}", n),
            Token::CharLiteral(_) => "character literal".to_string(),
            Token::StringLiteral(_) => "string literal".to_string(),
            Token::Keyword(k) => format!("'{}'", format!("{:?}", k).to_lowercase()),
            Token::Punctuator(p) => format!("{:?}", p),
            Token::EOF => "end of input".to_string(),
        }
    }
}

/// Saved lexer position for speculative parsing
#[derive(Debug, Clone)]
pub struct LexerState {
    position: usize,
    line: u32,
    column: u32,
    current_token: Option<Token>,
    token_position: SourcePosition,
}

/// Lexer for Java statement fragments
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    /// Character offset of the next unscanned character
    pub position: usize,
    /// Current line (1-based)
    pub line: u32,
    /// Current column (1-based)
    pub column: u32,
    /// Token scanned by `peek_token` and not yet consumed
    pub current_token: Option<Token>,
    token_position: SourcePosition,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            current_token: None,
            token_position: SourcePosition::new(1, 1, 0),
        }
    }

    /// The source text being scanned
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Result<Token, SourceError> {
        if let Some(token) = self.current_token.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> Result<&Token, SourceError> {
        let token = match self.current_token.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        Ok(self.current_token.insert(token))
    }

    /// Start position of the most recently scanned token
    pub fn token_position(&self) -> SourcePosition {
        self.token_position
    }

    /// Save the lexer state for later backtracking
    pub fn save(&self) -> LexerState {
        LexerState {
            position: self.position,
            line: self.line,
            column: self.column,
            current_token: self.current_token.clone(),
            token_position: self.token_position,
        }
    }

    /// Restore a previously saved state
    pub fn restore(&mut self, state: LexerState) {
        self.position = state.position;
        self.line = state.line;
        self.column = state.column;
        self.current_token = state.current_token;
        self.token_position = state.token_position;
    }

    fn scan_token(&mut self) -> Result<Token, SourceError> {
        self.skip_whitespace_and_comments()?;

        self.token_position = self.current_position();
        if self.is_at_end() {
            return Ok(Token::EOF);
        }

        let start_pos = self.token_position;
        let ch = self.advance();

        let token = match ch {
            '(' => Token::Punctuator(Punctuator::LParen),
            ')' => Token::Punctuator(Punctuator::RParen),
            '{' => Token::Punctuator(Punctuator::LBrace),
            '}' => Token::Punctuator(Punctuator::RBrace),
            '[' => Token::Punctuator(Punctuator::LBracket),
            ']' => Token::Punctuator(Punctuator::RBracket),
            ';' => Token::Punctuator(Punctuator::Semicolon),
            ',' => Token::Punctuator(Punctuator::Comma),
            '?' => Token::Punctuator(Punctuator::Question),
            ':' => Token::Punctuator(Punctuator::Colon),
            '~' => Token::Punctuator(Punctuator::Tilde),

            '.' => {
                if self.peek().is_ascii_digit() {
                    return self.scan_number('.');
                }
                Token::Punctuator(Punctuator::Dot)
            }

            '=' => self.choose('=', Punctuator::EqEq, Punctuator::Assign),
            '!' => self.choose('=', Punctuator::NotEq, Punctuator::Not),
            '*' => self.choose('=', Punctuator::StarEq, Punctuator::Star),
            '/' => self.choose('=', Punctuator::SlashEq, Punctuator::Slash),
            '%' => self.choose('=', Punctuator::PercentEq, Punctuator::Percent),
            '^' => self.choose('=', Punctuator::XorEq, Punctuator::Xor),

            '+' => {
                if self.match_char('+') {
                    Token::Punctuator(Punctuator::PlusPlus)
                } else {
                    self.choose('=', Punctuator::PlusEq, Punctuator::Plus)
                }
            }

            '-' => {
                if self.match_char('-') {
                    Token::Punctuator(Punctuator::MinusMinus)
                } else {
                    self.choose('=', Punctuator::MinusEq, Punctuator::Minus)
                }
            }

            '&' => {
                if self.match_char('&') {
                    Token::Punctuator(Punctuator::AndAnd)
                } else {
                    self.choose('=', Punctuator::AndEq, Punctuator::And)
                }
            }

            '|' => {
                if self.match_char('|') {
                    Token::Punctuator(Punctuator::OrOr)
                } else {
                    self.choose('=', Punctuator::OrEq, Punctuator::Or)
                }
            }

            '<' => {
                if self.match_char('<') {
                    self.choose('=', Punctuator::LtLtEq, Punctuator::LtLt)
                } else {
                    self.choose('=', Punctuator::LtEq, Punctuator::Lt)
                }
            }

            '>' => {
                if self.match_char('>') {
                    if self.match_char('>') {
                        self.choose('=', Punctuator::GtGtGtEq, Punctuator::GtGtGt)
                    } else {
                        self.choose('=', Punctuator::GtGtEq, Punctuator::GtGt)
                    }
                } else {
                    self.choose('=', Punctuator::GtEq, Punctuator::Gt)
                }
            }

            '"' => return self.scan_string(start_pos),
            '\'' => return self.scan_char(start_pos),

            _ if ch.is_ascii_digit() => return self.scan_number(ch),

            _ if is_id_start(ch) => return self.scan_identifier(ch, start_pos),

            _ => {
                return Err(syntax_error(
                    format!("Unexpected character: '{}'", ch),
                    Some(start_pos),
                ))
            }
        };
        Ok(token)
    }

    fn choose(&mut self, next: char, matched: Punctuator, otherwise: Punctuator) -> Token {
        if self.match_char(next) {
            Token::Punctuator(matched)
        } else {
            Token::Punctuator(otherwise)
        }
    }

    fn scan_string(&mut self, start_pos: SourcePosition) -> Result<Token, SourceError> {
        let mut value = String::new();

        loop {
            if self.is_at_end() || self.peek() == '\n' || self.peek() == '\r' {
                return Err(syntax_error("Unterminated string literal", Some(start_pos)));
            }
            match self.advance() {
                '"' => break,
                '\\' => {
                    let unit = self.scan_escape(start_pos)?;
                    let decoded = char::from_u32(unit as u32).ok_or_else(|| {
                        syntax_error("Unpaired surrogate in string literal", Some(start_pos))
                    })?;
                    value.push(decoded);
                }
                ch => value.push(ch),
            }
        }

        Ok(Token::StringLiteral(value))
    }

    fn scan_char(&mut self, start_pos: SourcePosition) -> Result<Token, SourceError> {
        if self.is_at_end() || self.peek() == '\'' || self.peek() == '\n' {
            return Err(syntax_error("Empty character literal", Some(start_pos)));
        }
        let unit = match self.advance() {
            '\\' => self.scan_escape(start_pos)?,
            ch => {
                let code = ch as u32;
                if code > 0xFFFF {
                    return Err(syntax_error(
                        "Character literal does not fit in a char",
                        Some(start_pos),
                    ));
                }
                code as u16
            }
        };
        if !self.match_char('\'') {
            return Err(syntax_error("Unterminated character literal", Some(start_pos)));
        }
        Ok(Token::CharLiteral(unit))
    }

    /// Scan the escape after a backslash, returning a UTF-16 code unit
    fn scan_escape(&mut self, start_pos: SourcePosition) -> Result<u16, SourceError> {
        if self.is_at_end() {
            return Err(syntax_error("Unterminated escape sequence", Some(start_pos)));
        }
        let escaped = self.advance();
        let unit = match escaped {
            'n' => '\n' as u16,
            't' => '\t' as u16,
            'r' => '\r' as u16,
            'b' => 0x08,
            'f' => 0x0c,
            's' => ' ' as u16,
            '\\' => '\\' as u16,
            '\'' => '\'' as u16,
            '"' => '"' as u16,
            'u' => {
                while self.peek() == 'u' {
                    self.advance();
                }
                let mut code = 0u16;
                for _ in 0..4 {
                    let digit = self.peek().to_digit(16).ok_or_else(|| {
                        syntax_error("Invalid unicode escape", Some(self.current_position()))
                    })?;
                    self.advance();
                    code = code * 16 + digit as u16;
                }
                code
            }
            '0'..='7' => {
                // octal escape, at most \377
                let mut code = escaped.to_digit(8).unwrap_or(0);
                let max_digits = if escaped <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek().to_digit(8) {
                        Some(digit) => {
                            self.advance();
                            code = code * 8 + digit;
                        }
                        None => break,
                    }
                }
                code as u16
            }
            other => {
                return Err(syntax_error(
                    format!("Illegal escape character: '\\{}'", other),
                    Some(start_pos),
                ))
            }
        };
        Ok(unit)
    }

    fn scan_number(&mut self, first: char) -> Result<Token, SourceError> {
        let start_pos = self.token_position;

        if first == '0' && matches!(self.peek(), 'x' | 'X' | 'b' | 'B') {
            let radix = if matches!(self.advance(), 'x' | 'X') { 16 } else { 2 };
            let digits = self.scan_digits(radix);
            if digits.is_empty() {
                return Err(syntax_error("Malformed number literal", Some(start_pos)));
            }
            let is_long = self.match_char('L') || self.match_char('l');
            return self.integer_token(&digits, radix, is_long, start_pos);
        }

        let mut text = String::new();
        let mut is_float = false;
        if first == '.' {
            text.push_str("0.");
            is_float = true;
        } else {
            text.push(first);
        }
        text.push_str(&self.scan_digits(10));

        if !is_float && self.peek() == '.' && self.peek_next().map_or(true, |c| !is_id_start(c)) {
            self.advance();
            text.push('.');
            is_float = true;
        }
        if is_float {
            text.push_str(&self.scan_digits(10));
        }

        if matches!(self.peek(), 'e' | 'E') {
            self.advance();
            text.push('e');
            if matches!(self.peek(), '+' | '-') {
                text.push(self.advance());
            }
            let exponent = self.scan_digits(10);
            if exponent.is_empty() {
                return Err(syntax_error("Malformed exponent", Some(start_pos)));
            }
            text.push_str(&exponent);
            is_float = true;
        }

        match self.peek() {
            'f' | 'F' => {
                self.advance();
                let value: f32 = text
                    .parse()
                    .map_err(|_| syntax_error("Malformed float literal", Some(start_pos)))?;
                return Ok(Token::FloatLiteral(value));
            }
            'd' | 'D' => {
                self.advance();
                is_float = true;
            }
            'L' | 'l' if !is_float => {
                self.advance();
                return self.integer_token(&text, octal_or_decimal(&text), true, start_pos);
            }
            _ => {}
        }

        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| syntax_error("Malformed double literal", Some(start_pos)))?;
            return Ok(Token::DoubleLiteral(value));
        }

        self.integer_token(&text, octal_or_decimal(&text), false, start_pos)
    }

    fn integer_token(
        &self,
        digits: &str,
        radix: u32,
        is_long: bool,
        start_pos: SourcePosition,
    ) -> Result<Token, SourceError> {
        let value = u64::from_str_radix(digits, radix)
            .map_err(|_| syntax_error("Integer number too large", Some(start_pos)))?;
        // hex, octal and binary literals may fill the full unsigned width
        let limit = match (radix == 10, is_long) {
            (true, true) => 1u64 << 63,
            (true, false) => 1u64 << 31,
            (false, true) => u64::MAX,
            (false, false) => u32::MAX as u64,
        };
        if value > limit {
            return Err(syntax_error("Integer number too large", Some(start_pos)));
        }
        Ok(match (radix == 10, is_long) {
            (true, true) => Token::LongLiteral(value as i128),
            (true, false) => Token::IntLiteral(value as i64),
            (false, true) => Token::LongLiteral(value as i64 as i128),
            (false, false) => Token::IntLiteral(value as u32 as i32 as i64),
        })
    }

    /// Scan digits of the given radix, dropping `_` separators
    fn scan_digits(&mut self, radix: u32) -> String {
        let mut digits = String::new();
        while !self.is_at_end() {
            let ch = self.peek();
            if ch.is_digit(radix) {
                digits.push(self.advance());
            } else if ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    fn scan_identifier(
        &mut self,
        first: char,
        start_pos: SourcePosition,
    ) -> Result<Token, SourceError> {
        let mut name = String::new();
        name.push(first);
        while !self.is_at_end() && is_id_continue(self.peek()) {
            name.push(self.advance());
        }

        if let Some(keyword) = Keyword::from_word(&name) {
            return Ok(Token::Keyword(keyword));
        }
        if RESERVED.contains(&name.as_str()) {
            return Err(syntax_error(
                format!("'{}' is not supported in a statement fragment", name),
                Some(start_pos),
            ));
        }
        Ok(Token::Identifier(name))
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), SourceError> {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\t' | '\u{000C}' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                '\r' => {
                    self.advance();
                    if self.peek() == '\n' {
                        self.advance();
                    }
                    self.line += 1;
                    self.column = 1;
                }
                '/' if self.peek_next() == Some('/') => {
                    while !self.is_at_end() && self.peek() != '\n' && self.peek() != '\r' {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == Some('*') => {
                    let start = self.current_position();
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(syntax_error("Unterminated comment", Some(start)));
                        }
                        if self.peek() == '*' && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.advance() == '\n' {
                            self.line += 1;
                            self.column = 1;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.position]
        }
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        self.column += 1;
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.position] != expected {
            false
        } else {
            self.position += 1;
            self.column += 1;
            true
        }
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition {
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }
}

fn octal_or_decimal(digits: &str) -> u32 {
    if digits.len() > 1 && digits.starts_with('0') {
        8
    } else {
        10
    }
}

fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

fn is_id_continue(ch: char) -> bool {
    is_id_start(ch) || ch.is_ascii_digit() || ch.is_numeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token == Token::EOF {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn test_lexer_empty_source() {
        let mut lexer = Lexer::new("");
        assert!(matches!(lexer.next_token().unwrap(), Token::EOF));
    }

    #[test]
    fn test_lexer_declaration() {
        assert_eq!(
            tokens("int x = 5;"),
            vec![
                Token::Keyword(Keyword::Int),
                Token::Identifier("x".to_string()),
                Token::Punctuator(Punctuator::Assign),
                Token::IntLiteral(5),
                Token::Punctuator(Punctuator::Semicolon),
            ]
        );
    }

    #[test]
    fn test_lexer_numbers() {
        assert_eq!(tokens("42L"), vec![Token::LongLiteral(42)]);
        assert_eq!(tokens("1.5f"), vec![Token::FloatLiteral(1.5)]);
        assert_eq!(tokens("2.0"), vec![Token::DoubleLiteral(2.0)]);
        assert_eq!(tokens(".5"), vec![Token::DoubleLiteral(0.5)]);
        assert_eq!(tokens("1e3"), vec![Token::DoubleLiteral(1000.0)]);
        assert_eq!(tokens("3d"), vec![Token::DoubleLiteral(3.0)]);
        assert_eq!(tokens("0xFF"), vec![Token::IntLiteral(255)]);
        assert_eq!(tokens("0b101"), vec![Token::IntLiteral(5)]);
        assert_eq!(tokens("017"), vec![Token::IntLiteral(15)]);
        assert_eq!(tokens("1_000"), vec![Token::IntLiteral(1000)]);
    }

    #[test]
    fn test_lexer_int_range() {
        assert_eq!(tokens("2147483648"), vec![Token::IntLiteral(2147483648)]);
        assert!(Lexer::new("2147483649").next_token().is_err());
        assert_eq!(tokens("0xFFFFFFFF"), vec![Token::IntLiteral(-1)]);
        assert_eq!(
            tokens("9223372036854775808L"),
            vec![Token::LongLiteral(1i128 << 63)]
        );
    }

    #[test]
    fn test_lexer_strings_and_chars() {
        assert_eq!(
            tokens(r#""a\tb""#),
            vec![Token::StringLiteral("a\tb".to_string())]
        );
        assert_eq!(tokens(r"'\n'"), vec![Token::CharLiteral(10)]);
        assert_eq!(tokens(r"'A'"), vec![Token::CharLiteral(65)]);
        assert_eq!(tokens(r"'\101'"), vec![Token::CharLiteral(65)]);
        assert!(Lexer::new("\"open").next_token().is_err());
    }

    #[test]
    fn test_lexer_shift_operators() {
        assert_eq!(
            tokens(">>>= >>= >> <<"),
            vec![
                Token::Punctuator(Punctuator::GtGtGtEq),
                Token::Punctuator(Punctuator::GtGtEq),
                Token::Punctuator(Punctuator::GtGt),
                Token::Punctuator(Punctuator::LtLt),
            ]
        );
    }

    #[test]
    fn test_lexer_comments_and_positions() {
        let mut lexer = Lexer::new("// note\n  /* block */ x");
        let token = lexer.next_token().unwrap();
        assert_eq!(token, Token::Identifier("x".to_string()));
        let pos = lexer.token_position();
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 15);
    }

    #[test]
    fn test_lexer_save_restore() {
        let mut lexer = Lexer::new("a b");
        let state = lexer.save();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.restore(state);
        assert_eq!(lexer.next_token().unwrap(), Token::Identifier("a".to_string()));
    }

    #[test]
    fn test_lexer_reserved_word() {
        let err = Lexer::new("switch").next_token().unwrap_err();
        assert!(err.message.contains("switch"));
    }
}
