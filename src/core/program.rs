//! Program images.
//!
//! A [`Program`] is the initial memory image handed to the VM. It is never
//! mutated after construction; every [`Machine`](crate::Machine) loads its
//! own copy.

use std::fmt;
use std::num::ParseIntError;
use std::ops::Deref;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing comma-separated program text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseProgramError {
    #[error("program text is empty")]
    Empty,
    #[error("invalid integer {token:?} at position {index}: {source}")]
    InvalidInteger {
        index: usize,
        token: String,
        #[source]
        source: ParseIntError,
    },
}

/// Immutable Intcode program image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    words: Vec<i64>,
}

impl Program {
    pub fn new(words: Vec<i64>) -> Self {
        Self { words }
    }

    /// Raw words of the image
    pub fn words(&self) -> &[i64] {
        &self.words
    }
}

impl Deref for Program {
    type Target = [i64];

    fn deref(&self) -> &[i64] {
        &self.words
    }
}

impl From<Vec<i64>> for Program {
    fn from(words: Vec<i64>) -> Self {
        Self::new(words)
    }
}

impl From<&[i64]> for Program {
    fn from(words: &[i64]) -> Self {
        Self::new(words.to_vec())
    }
}

impl FromStr for Program {
    type Err = ParseProgramError;

    /// Parse `1,0,0,3,99` style text. Surrounding whitespace and a single
    /// trailing comma are tolerated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(ParseProgramError::Empty);
        }

        let words = trimmed
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                token
                    .parse::<i64>()
                    .map_err(|source| ParseProgramError::InvalidInteger {
                        index,
                        token: token.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { words })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{word}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_program_text() {
        let program: Program = " 1,9, 10,-3,\n2,3,11,0,99,30,40,50\n".parse().unwrap();
        assert_eq!(program.len(), 12);
        assert_eq!(program[3], -3);
        assert_eq!(program.to_string(), "1,9,10,-3,2,3,11,0,99,30,40,50");
    }

    #[test]
    fn parse_rejects_bad_tokens() {
        let err = "1,2,x,4".parse::<Program>().unwrap_err();
        assert!(matches!(
            err,
            ParseProgramError::InvalidInteger { index: 2, ref token, .. } if token == "x"
        ));
        assert_eq!("  ".parse::<Program>(), Err(ParseProgramError::Empty));
    }

    #[test]
    fn trailing_comma_is_accepted() {
        let program: Program = "99,".parse().unwrap();
        assert_eq!(program.words(), &[99]);
    }
}
