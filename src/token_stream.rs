//! The token-providing collaborator named in SPEC_FULL.md sec 6. Out of
//! scope to implement a real lexer-backed stream here, but the simulator
//! and interpreter are written entirely against this trait, and a small
//! in-memory implementation (`VecTokenStream`) is provided so the rest of
//! the crate is exercisable without one.

use crate::int_stream::{IntStream, EOF};
use crate::token::{CommonToken, Token};

pub trait TokenStream<'input>: IntStream {
    type Tok: Token;

    fn lt(&mut self, k: isize) -> Option<&Self::Tok>;
    fn get(&self, index: usize) -> &Self::Tok;
    fn get_token_source_name(&self) -> String;
}

/// A `TokenStream` over a pre-lexed, owned `Vec<CommonToken>`. Good enough
/// to drive the interpreter in tests and examples.
pub struct VecTokenStream {
    tokens: Vec<CommonToken>,
    index: usize,
    source_name: String,
}

impl VecTokenStream {
    pub fn new(mut tokens: Vec<CommonToken>, source_name: impl Into<String>) -> Self {
        for (i, t) in tokens.iter_mut().enumerate() {
            t.token_index = i as isize;
        }
        if tokens.last().map(|t| t.token_type) != Some(crate::token::TOKEN_EOF) {
            let mut eof = CommonToken::eof();
            eof.token_index = tokens.len() as isize;
            tokens.push(eof);
        }
        VecTokenStream { tokens, index: 0, source_name: source_name.into() }
    }
}

impl IntStream for VecTokenStream {
    fn consume(&mut self) {
        if self.la(1) == EOF {
            panic!("cannot consume EOF");
        }
        self.index += 1;
    }

    fn la(&mut self, i: isize) -> isize {
        if i == 0 {
            panic!("la(0) is undefined");
        }
        let pos = self.index as isize + i - 1;
        if pos < 0 || pos as usize >= self.tokens.len() {
            return EOF;
        }
        let tt = self.tokens[pos as usize].token_type;
        if tt == crate::token::TOKEN_EOF {
            EOF
        } else {
            tt
        }
    }

    fn mark(&mut self) -> isize {
        -1
    }

    fn release(&mut self, _marker: isize) {}

    fn index(&self) -> isize {
        self.index as isize
    }

    fn seek(&mut self, index: isize) {
        self.index = index.max(0) as usize;
    }

    fn size(&self) -> isize {
        self.tokens.len() as isize
    }

    fn get_source_name(&self) -> String {
        self.source_name.clone()
    }
}

impl<'input> TokenStream<'input> for VecTokenStream {
    type Tok = CommonToken;

    fn lt(&mut self, k: isize) -> Option<&CommonToken> {
        if k == 0 {
            return None;
        }
        let pos = self.index as isize + k - 1;
        if pos < 0 {
            return None;
        }
        self.tokens.get(pos as usize)
    }

    fn get(&self, index: usize) -> &CommonToken {
        &self.tokens[index]
    }

    fn get_token_source_name(&self) -> String {
        self.source_name.clone()
    }
}
