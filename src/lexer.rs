//! Lexical analysis of one input line into pipeline stages.
//!
//! The lexer is a single forward scan over the line with three states: outside
//! quotes, inside single quotes, inside double quotes. A `|` only splits stages
//! outside quotes, and only one kind of quote can be open at a time. Tokens are
//! substituted as they are emitted, so the resulting [`Pipeline`] is final.

use crate::env::VariableStore;
use crate::substitution::substitute;
use thiserror::Error;

/// How a token was written on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    /// A whitespace-delimited run outside any quotes.
    Unquoted,
    /// The interior of `'...'`, stored verbatim.
    SingleQuoted,
    /// The interior of `"..."`, with variables substituted.
    DoubleQuoted,
}

/// A quote-classified, substitution-resolved unit of text within a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    text: String,
    kind: QuoteKind,
}

impl Token {
    /// Build a token from final text. No substitution happens here.
    pub fn new(text: impl Into<String>, kind: QuoteKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Self::new(text, QuoteKind::Unquoted)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> QuoteKind {
        self.kind
    }
}

/// One pipe-delimited segment of a pipeline. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    tokens: Vec<Token>,
}

impl Stage {
    /// Returns `None` for an empty token list.
    pub fn new(tokens: Vec<Token>) -> Option<Self> {
        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    /// The token that decides how the stage is dispatched.
    pub fn head(&self) -> &Token {
        &self.tokens[0]
    }

    /// Every token after the head.
    pub fn arguments(&self) -> &[Token] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// Stages of one input line, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// A blank line lexes to a pipeline without stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Errors that reject a whole line before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A quote opened at `offset` (in characters) was never closed.
    #[error("unterminated {quote} quote starting at column {offset}")]
    UnterminatedQuote { quote: char, offset: usize },
    /// A `|` left the stage at `index` without any tokens.
    #[error("empty command in pipeline at stage {index}")]
    EmptyStage { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Unquoted,
    SingleQuote,
    DoubleQuote,
}

struct LexingFSM<'a> {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    quote_start: usize,
    store: &'a VariableStore,
    stages: Vec<Vec<Token>>,
    current: Vec<Token>,
    buffer: String,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &str, store: &'a VariableStore) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Unquoted,
            quote_start: 0,
            store,
            stages: Vec::new(),
            current: Vec::new(),
            buffer: String::new(),
        }
    }

    /// Runs the scan to the end of the line and assembles the pipeline.
    fn make_pipeline(mut self) -> Result<Pipeline, LexError> {
        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Unquoted => self.handle_unquoted(ch),
                LexingState::SingleQuote => self.handle_single_quote(ch),
                LexingState::DoubleQuote => self.handle_double_quote(ch),
            }
        }

        match self.state {
            LexingState::SingleQuote => {
                return Err(LexError::UnterminatedQuote {
                    quote: '\'',
                    offset: self.quote_start,
                });
            }
            LexingState::DoubleQuote => {
                return Err(LexError::UnterminatedQuote {
                    quote: '"',
                    offset: self.quote_start,
                });
            }
            LexingState::Unquoted => {}
        }

        self.finish_word();
        self.stages.push(std::mem::take(&mut self.current));

        if self.stages.len() == 1 && self.stages[0].is_empty() {
            return Ok(Pipeline::default());
        }

        let mut stages = Vec::with_capacity(self.stages.len());
        for (index, tokens) in self.stages.into_iter().enumerate() {
            stages.push(Stage::new(tokens).ok_or(LexError::EmptyStage { index })?);
        }
        Ok(Pipeline { stages })
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_unquoted(&mut self, ch: char) {
        match ch {
            '|' => {
                self.finish_word();
                self.stages.push(std::mem::take(&mut self.current));
            }
            '\'' => self.open_quote(LexingState::SingleQuote),
            '"' => self.open_quote(LexingState::DoubleQuote),
            c if c.is_whitespace() => self.finish_word(),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => {
                let text = std::mem::take(&mut self.buffer);
                self.current.push(Token::new(text, QuoteKind::SingleQuoted));
                self.state = LexingState::Unquoted;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => {
                let text = substitute(&std::mem::take(&mut self.buffer), self.store);
                self.current.push(Token::new(text, QuoteKind::DoubleQuoted));
                self.state = LexingState::Unquoted;
            }
            c => self.buffer.push(c),
        }
    }

    /// An opening quote also ends whatever unquoted word precedes it.
    fn open_quote(&mut self, state: LexingState) {
        self.finish_word();
        self.quote_start = self.pos - 1;
        self.state = state;
    }

    fn finish_word(&mut self) {
        if !self.buffer.is_empty() {
            let text = substitute(&std::mem::take(&mut self.buffer), self.store);
            self.current.push(Token::new(text, QuoteKind::Unquoted));
        }
    }
}

/// Split `line` into substituted stages.
///
/// # Arguments
/// * `line` - One line of user input, without the trailing newline.
/// * `store` - Variables used to expand `$name` in unquoted and double-quoted text.
///
/// # Returns
/// The [`Pipeline`] on success (empty for a blank line), or a [`LexError`] if a
/// quote is left open or a `|` produces an empty stage. No partial pipeline is
/// ever returned.
pub fn lex(line: &str, store: &VariableStore) -> Result<Pipeline, LexError> {
    LexingFSM::new(line, store).make_pipeline()
}
