//! Program representation

use log::{debug, warn};
use std::{collections::HashMap, fmt};

use crate::{
    error::{Fault, ParseError},
    lexer::Lexer,
    token::{Op, Token},
};

/// Representation of a parsed program. Immutable once built.
#[derive(Debug, Default)]
pub struct Program<'a> {
    /// Array of instructions from top to bottom
    instructions: Vec<Instruction<'a>>,
    /// Label table which maps a label to the first instruction after it.
    /// A label with nothing after it points one past the last instruction.
    labels: HashMap<&'a str, usize>,
}

impl<'a> Program<'a> {
    pub fn instructions(&self) -> &[Instruction<'a>] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Index of the instruction a jump to `name` lands on
    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }
}

impl fmt::Display for Program<'_> {
    /// Index-prefixed listing with labels placed above their targets
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<_> = self.labels.iter().collect();
        labels.sort_by(|(ln, lp), (rn, rp)| lp.cmp(rp).then(ln.cmp(rn)));
        let mut labels = labels.into_iter().peekable();

        for (ptr, instruction) in self.instructions.iter().enumerate() {
            while let Some((name, _)) = labels.next_if(|(_, target)| **target == ptr) {
                writeln!(f, "{}:", name)?;
            }
            writeln!(f, "{:>4}  {}", ptr, instruction)?;
        }
        for (name, _) in labels {
            writeln!(f, "{}:", name)?;
        }

        Ok(())
    }
}

/// A single instruction. Arguments are checked when the instruction runs, not here.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Instruction<'a> {
    pub op: Op,
    /// Mnemonic as it is written in the source
    pub mnemonic: &'a str,
    /// Identifier, string and number literals in source order
    pub args: Vec<Token<'a>>,
}

impl<'a> Instruction<'a> {
    /// Argument at `index`, or a fault if the instruction was written without it
    pub fn arg(&self, index: usize) -> Result<&Token<'a>, Fault> {
        self.args
            .get(index)
            .ok_or(Fault::MissingOperand { op: self.op, index })
    }
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)?;
        for (i, arg) in self.args.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, arg)?;
        }
        Ok(())
    }
}

/// Parser to generate a `Program` from text
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    strict: bool,
}

impl<'a> Parser<'a> {
    /// Initialize the parser
    ///
    /// * `program` program to parse
    pub fn new(program: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(program),
            strict: false,
        }
    }

    /// Reject unknown mnemonics instead of keeping them as no-ops
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Parse `program` in a single pass and generate a `Program`
    pub fn parse(mut self) -> anyhow::Result<Program<'a>> {
        let mut program = Program::default();

        // The instruction being built from the current line
        let mut mnemonic: Option<&'a str> = None;
        let mut args = Vec::new();
        // Position of the token within the current line
        let mut position = 0;
        let mut line = 1;

        while let Some(token) = self.lexer.next_token() {
            match token {
                Token::EndOfLine => {
                    // Lines without a mnemonic (blank, label-only, stray operands) are dropped
                    if let Some(mnemonic) = mnemonic.take() {
                        let op = Op::from_mnemonic(mnemonic);
                        if op == Op::Unknown && self.strict {
                            return Err(ParseError::UnknownMnemonic {
                                line,
                                mnemonic: mnemonic.to_string(),
                            }
                            .into());
                        }

                        program.instructions.push(Instruction {
                            op,
                            mnemonic,
                            args: std::mem::take(&mut args),
                        });
                    }

                    args.clear();
                    position = 0;
                    line += 1;
                    continue;
                }
                Token::Label(name) => {
                    let ptr = program.instructions.len();
                    if let Some(old) = program.labels.insert(name, ptr) {
                        warn!("line {}: label '{}' redefined ({} -> {})", line, name, old, ptr);
                    } else {
                        debug!("line {}: label '{}' -> {}", line, name, ptr);
                    }
                }
                Token::Identifier(name) if position == 0 => mnemonic = Some(name),
                arg => args.push(arg),
            }

            position += 1;
        }

        debug!(
            "parsed {} instructions and {} labels",
            program.instructions.len(),
            program.labels.len()
        );

        Ok(program)
    }
}
