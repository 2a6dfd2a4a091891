//! Virtual machine that runs the program

use crate::{
    bytecode::{Instruction, Program},
    error::Fault,
    token::{Op, Token},
};
use anyhow::{anyhow, Context};
use log::{debug, trace};
use std::{collections::HashMap, fmt::Write, num::ParseIntError};

/// Comparison results. `cmp` only adds bits; a taken conditional jump clears them all.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct Flags(u8);

impl Flags {
    pub const EQUALS: Flags = Flags(1 << 0);
    pub const GREATER: Flags = Flags(1 << 1);
    pub const LESS: Flags = Flags(1 << 2);

    pub fn intersects(self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Mutable state of a single execution
#[derive(Debug, Default)]
pub struct VmState<'a> {
    registers: HashMap<&'a str, i32>,
    pc: usize,                // next instruction to run
    flags: Flags,             // result of the `cmp`s since the last taken jump
    call_stack: Vec<usize>,   // return addresses
    output: String,           // everything `msg` produced so far
}

impl<'a> VmState<'a> {
    /// Value of a register, `None` if it was never written
    pub fn register(&self, name: &str) -> Option<i32> {
        self.registers.get(name).copied()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

/// What the dispatch loop does after an instruction
#[derive(Debug, Eq, PartialEq)]
enum Flow {
    Next,
    Jump(usize),
    Halt,
}

type BinaryFn = fn(i32, i32) -> Result<i32, Fault>;

/// Parse an integer literal. Callers decide what a malformed literal means.
pub fn parse_literal(text: &str) -> Result<i32, ParseIntError> {
    text.parse::<i32>()
}

/// Virtual machine representation
pub struct Vm<'p, 'a> {
    program: &'p Program<'a>,
    state: VmState<'a>,
    last_op: Option<Op>, // op of the last executed instruction
}

impl<'p, 'a> Vm<'p, 'a> {
    /// Create a VM with fresh state for `program`
    pub fn new(program: &'p Program<'a>) -> Self {
        Vm {
            program,
            state: VmState::default(),
            last_op: None,
        }
    }

    pub fn state(&self) -> &VmState<'a> {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.pc >= self.program.len()
    }

    /// Run until the program counter leaves the program.
    ///
    /// Returns the output if the last executed instruction was `end`, `None` otherwise.
    /// A fatal fault is returned as an error that downcasts to [`Fault`].
    pub fn run(mut self) -> anyhow::Result<Option<String>> {
        while !self.is_finished() {
            self.next_instruction()?;
        }

        match self.last_op {
            // Nothing ran, so nothing failed to end
            Some(Op::End) | None => {
                debug!("program ended, {} bytes of output", self.state.output.len());
                Ok(Some(self.state.output))
            }
            Some(op) => {
                debug!("program ran off its end after {:?}", op);
                Ok(None)
            }
        }
    }

    pub fn next_instruction(&mut self) -> anyhow::Result<()> {
        let program = self.program;
        let ptr = self.state.pc;
        let instruction = program
            .instructions()
            .get(ptr)
            .ok_or_else(|| anyhow!("Program is already ended."))?;

        trace!("{:>4}  {}", ptr, instruction);

        let flow = match instruction.op {
            Op::Mov => self.ins_mov(instruction),
            Op::Inc => self.ins_unary(instruction, |a| a.wrapping_add(1)),
            Op::Dec => self.ins_unary(instruction, |a| a.wrapping_sub(1)),
            Op::Add => self.ins_binary(instruction, |a, b| Ok(a.wrapping_add(b))),
            Op::Sub => self.ins_binary(instruction, |a, b| Ok(a.wrapping_sub(b))),
            Op::Mul => self.ins_binary(instruction, |a, b| Ok(a.wrapping_mul(b))),
            Op::Div => self.ins_binary(instruction, |a, b| match b {
                0 => Err(Fault::DivisionByZero),
                b => Ok(a.wrapping_div(b)),
            }),
            Op::Cmp => self.ins_cmp(instruction),
            Op::Jmp => self.ins_jmp(instruction),
            Op::Je => self.ins_jmp_if(instruction, Flags::EQUALS, true),
            Op::Jne => self.ins_jmp_if(instruction, Flags::EQUALS, false),
            Op::Jg => self.ins_jmp_if(instruction, Flags::GREATER, true),
            Op::Jge => self.ins_jmp_if(instruction, Flags::GREATER | Flags::EQUALS, true),
            Op::Jl => self.ins_jmp_if(instruction, Flags::LESS, true),
            Op::Jle => self.ins_jmp_if(instruction, Flags::LESS | Flags::EQUALS, true),
            Op::Call => self.ins_call(instruction),
            Op::Ret => self.ins_ret(),
            Op::End => Ok(Flow::Halt),
            Op::Msg => self.ins_msg(instruction),
            Op::Unknown => Ok(Flow::Next),
        }
        .with_context(|| format!("instruction {} `{}`", ptr, instruction))?;

        self.last_op = Some(instruction.op);
        self.state.pc = match flow {
            Flow::Next => ptr + 1,
            Flow::Jump(target) => target,
            Flow::Halt => program.len(),
        };

        Ok(())
    }

    /// Value of a `mov`/arithmetic source: unset registers read as 0.
    /// `None` if the operand carries no integer.
    fn source(&self, token: &Token<'a>) -> Option<i32> {
        match token {
            Token::Identifier(name) => Some(self.state.register(name).unwrap_or(0)),
            Token::NumberLiteral(text) => match parse_literal(text) {
                Ok(value) => Some(value),
                Err(err) => {
                    trace!("ignoring malformed literal '{}': {}", text, err);
                    None
                }
            },
            _ => None,
        }
    }

    /// Value of a `cmp` operand. Unlike `source`, a register that was never written is unresolved.
    fn operand(&self, token: &Token<'a>) -> Option<i32> {
        match token {
            Token::Identifier(name) => self.state.register(name),
            Token::NumberLiteral(text) => parse_literal(text).ok(),
            _ => None,
        }
    }

    /// Resolve a jump target
    fn label(&self, token: &Token<'a>) -> Result<usize, Fault> {
        match token {
            Token::Identifier(name) => self
                .program
                .label(name)
                .ok_or_else(|| Fault::UndefinedLabel(name.to_string())),
            token => Err(Fault::UndefinedLabel(token.to_string())),
        }
    }

    /// Register written by `mov` and arithmetic. A quoted name is the same register as the bare
    /// one; a number literal names nothing.
    fn destination(token: &Token<'a>) -> Option<&'a str> {
        match token {
            Token::Identifier(name) | Token::StringLiteral(name) => Some(*name),
            _ => None,
        }
    }

    /// Copy a register or a literal into a register
    fn ins_mov(&mut self, instruction: &Instruction<'a>) -> Result<Flow, Fault> {
        let dst = instruction.arg(0)?;
        let src = instruction.arg(1)?;

        if let (Some(dst), Some(value)) = (Self::destination(dst), self.source(src)) {
            self.state.registers.insert(dst, value);
        }

        Ok(Flow::Next)
    }

    /// Apply `f` to a register in place
    fn ins_unary(
        &mut self,
        instruction: &Instruction<'a>,
        f: fn(i32) -> i32,
    ) -> Result<Flow, Fault> {
        if let Token::Identifier(dst) = instruction.arg(0)? {
            let value = self.state.registers.entry(*dst).or_insert(0);
            *value = f(*value);
        }

        Ok(Flow::Next)
    }

    /// `dst <- f(dst, src)`. A malformed source literal leaves `dst` as it was.
    fn ins_binary(&mut self, instruction: &Instruction<'a>, f: BinaryFn) -> Result<Flow, Fault> {
        let dst = instruction.arg(0)?;
        let src = instruction.arg(1)?;

        if let (Some(dst), Some(rhs)) = (Self::destination(dst), self.source(src)) {
            let lhs = self.state.register(dst).unwrap_or(0);
            self.state.registers.insert(dst, f(lhs, rhs)?);
        }

        Ok(Flow::Next)
    }

    /// Compare two values and add the result to the flags
    fn ins_cmp(&mut self, instruction: &Instruction<'a>) -> Result<Flow, Fault> {
        let lhs = self.operand(instruction.arg(0)?);
        let rhs = self.operand(instruction.arg(1)?);

        if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
            self.state.flags.insert(match lhs.cmp(&rhs) {
                std::cmp::Ordering::Equal => Flags::EQUALS,
                std::cmp::Ordering::Greater => Flags::GREATER,
                std::cmp::Ordering::Less => Flags::LESS,
            });
        } else {
            trace!("cmp operands unresolved, flags untouched");
        }

        Ok(Flow::Next)
    }

    /// Unconditionally jump to a label
    fn ins_jmp(&mut self, instruction: &Instruction<'a>) -> Result<Flow, Fault> {
        Ok(Flow::Jump(self.label(instruction.arg(0)?)?))
    }

    /// Jump if any of `flags` is set (or, with `set == false`, if none is).
    /// Taking the jump clears the flags.
    fn ins_jmp_if(
        &mut self,
        instruction: &Instruction<'a>,
        flags: Flags,
        set: bool,
    ) -> Result<Flow, Fault> {
        if self.state.flags.intersects(flags) != set {
            return Ok(Flow::Next);
        }

        let target = self.label(instruction.arg(0)?)?;
        self.state.flags.clear();
        Ok(Flow::Jump(target))
    }

    /// Call a subroutine
    fn ins_call(&mut self, instruction: &Instruction<'a>) -> Result<Flow, Fault> {
        let target = self.label(instruction.arg(0)?)?;

        // pc + 1: not to call the subroutine again on return
        self.state.call_stack.push(self.state.pc + 1);
        Ok(Flow::Jump(target))
    }

    /// Return from a subroutine
    fn ins_ret(&mut self) -> Result<Flow, Fault> {
        match self.state.call_stack.pop() {
            Some(ret_addr) => Ok(Flow::Jump(ret_addr)),
            None => Err(Fault::EmptyCallStack),
        }
    }

    /// Append registers and string literals to the output. Number literals are skipped.
    fn ins_msg(&mut self, instruction: &Instruction<'a>) -> Result<Flow, Fault> {
        for arg in &instruction.args {
            match arg {
                Token::Identifier(name) => {
                    let value = self.state.register(name).unwrap_or(0);
                    let _ = write!(self.state.output, "{}", value);
                }
                Token::StringLiteral(text) => self.state.output.push_str(text),
                _ => {}
            }
        }

        Ok(Flow::Next)
    }
}
