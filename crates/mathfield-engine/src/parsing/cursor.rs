use mathfield_syntax::{Token, TokenKind};

/// How many tokens on each side of the cursor end up in an error context.
const CONTEXT_RADIUS: usize = 3;

/// A cursor over a token stream with one-token lookahead.
#[derive(Clone)]
pub struct TokenCursor {
    tokens: Vec<Token>,
    /// Index of the next token to be consumed.
    pub i: usize,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, i: 0 }
    }

    /// Returns true once every token has been consumed.
    pub fn eof(&self) -> bool {
        self.i >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.i)
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(Token::kind)
    }

    /// Checks whether the next token is the literal `s`.
    pub fn at_literal(&self, s: &str) -> bool {
        self.peek().and_then(Token::as_literal) == Some(s)
    }

    /// Advances by one token, returning the consumed token.
    pub fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.i).cloned()?;
        self.i += 1;
        Some(token)
    }

    pub fn skip_spaces(&mut self) {
        while self.peek_kind() == Some(TokenKind::Space) {
            self.i += 1;
        }
    }

    /// Markup around the cursor, for error reports.
    pub fn context(&self) -> String {
        let start = self.i.saturating_sub(CONTEXT_RADIUS);
        let end = (self.i + CONTEXT_RADIUS).min(self.tokens.len());
        self.tokens[start..end].iter().map(Token::to_string).collect()
    }
}
