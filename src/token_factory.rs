//! Token construction is a generated-parser/lexer concern; we only name the
//! seam a custom factory would plug into.

use crate::token::CommonToken;

pub trait TokenAware<'input> {
    type TF: TokenFactory<'input>;
}

pub trait TokenFactory<'input> {
    type Tok: crate::token::Token + Clone;

    fn create(
        &self,
        token_type: isize,
        text: &str,
        start: isize,
        stop: isize,
        line: isize,
        column: isize,
    ) -> Self::Tok;
}

/// Factory used when no generated lexer is present; builds [`CommonToken`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonTokenFactory;

impl<'input> TokenFactory<'input> for CommonTokenFactory {
    type Tok = CommonToken;

    fn create(
        &self,
        token_type: isize,
        text: &str,
        start: isize,
        stop: isize,
        line: isize,
        column: isize,
    ) -> CommonToken {
        CommonToken {
            token_type,
            channel: crate::token::TOKEN_DEFAULT_CHANNEL,
            start,
            stop,
            line,
            column,
            text: text.to_owned(),
            token_index: -1,
        }
    }
}
