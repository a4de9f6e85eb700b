use thiserror::Error;

use crate::bits::NumberError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("unknown register `{0}`")]
    UnknownRegister(String),
    #[error("malformed number `{0}`")]
    MalformedNumber(String),
    #[error("value `{text}` out of range [{min}, {max}]")]
    ValueOutOfRange { text: String, min: i128, max: i128 },
    #[error("branch offset `{0}` is not a multiple of 2")]
    MisalignedOffset(String),
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    #[error("undefined label `{0}`")]
    UndefinedLabel(String),
    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscapeSequence(char),
    #[error("unsupported operation `{0}`")]
    UnsupportedOperation(String),
    #[error("invalid label `{0}`")]
    InvalidLabel(String),
    #[error("`{mnemonic}` expects {expected} operands")]
    MissingOperand { mnemonic: String, expected: usize },
    #[error("unexpected text `{0}`")]
    UnexpectedText(String),
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<AsmError>,
    },
}

impl AsmError {
    /// Attaches a 1-based source line number.
    pub fn at(self, line: usize) -> Self {
        match self {
            AsmError::AtLine { .. } => self,
            other => AsmError::AtLine {
                line,
                source: Box::new(other),
            },
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The error without its line context.
    pub fn kind(&self) -> &AsmError {
        match self {
            AsmError::AtLine { source, .. } => source.kind(),
            other => other,
        }
    }
}

impl From<NumberError> for AsmError {
    fn from(err: NumberError) -> Self {
        match err {
            NumberError::Malformed(text) => AsmError::MalformedNumber(text),
            NumberError::OutOfRange { text, min, max } => AsmError::ValueOutOfRange { text, min, max },
        }
    }
}
