//! Assembler interpreter (asmi) runs small assembly-like programs on a register machine
//! and returns what they print.
//!
//! # Example
//!
//! ```text
//! ; factorial of 5
//! mov   a, 5
//! mov   r, 1
//! call  fact
//! msg   'fact(5) = ', r
//! end
//!
//! fact:
//!     cmp   a, 1
//!     jle   done
//!     mul   r, a
//!     dec   a
//!     jmp   fact
//! done:
//!     ret
//! ```
//!
//! ```
//! let output = asmi::interpret("mov a, 5\ninc a\nmsg 'a=', a\nend").unwrap();
//! assert_eq!(output.as_deref(), Some("a=6"));
//! ```
//!
//! # Instructions
//!
//! | Instruction | Usage          | Brief   |
//! |-------------|----------------|---------|
//! | Mov         | `mov x, y`     | Copy `y` (register or integer) into register `x`. |
//! | Inc         | `inc x`        | Increment register `x`. |
//! | Dec         | `dec x`        | Decrement register `x`. |
//! | Add         | `add x, y`     | `x = x + y` |
//! | Sub         | `sub x, y`     | `x = x - y` |
//! | Mul         | `mul x, y`     | `x = x * y` |
//! | Div         | `div x, y`     | `x = x / y`, truncating. Dividing by zero is fatal. |
//! | Jmp         | `jmp lbl`      | Jump to the first instruction after `lbl:`. |
//! | Cmp         | `cmp x, y`     | Compare `x` with `y` and add the result to the flags. |
//! | Je/Jne      | `je lbl`       | Jump if the flags say equal / not equal. |
//! | Jg/Jge      | `jg lbl`       | Jump if greater / greater or equal. |
//! | Jl/Jle      | `jl lbl`       | Jump if less / less or equal. |
//! | Call        | `call lbl`     | Jump to `lbl`, remembering where to come back. |
//! | Ret         | `ret`          | Return to the instruction after the last `call`. |
//! | Msg         | `msg 'x=', x`  | Append string literals and register values to the output. |
//! | End         | `end`          | Stop and return the output. |
//!
//! # Important notes
//!
//! - Registers are named by identifiers, hold 32-bit signed integers and start at 0.
//! - `cmp` never clears the flags. Only a conditional jump that is taken clears them.
//! - A program that stops without executing `end` as its last instruction fails: [`interpret`]
//!   returns `Ok(None)`, never a partial output.
//! - Undefined labels, `ret` without `call` and division by zero abort the run with a [`Fault`].
//! - Unknown mnemonics are no-ops unless [`Options::strict`] is set.
//! - `;` starts a comment, `,` separates operands. Each instruction is on its own line.

pub mod bytecode;
pub mod error;
mod lexer;
pub mod token;
pub mod vm;

pub use error::{Fault, ParseError};

use bytecode::Parser;
use vm::Vm;

/// Interpreter configuration
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Reject unknown mnemonics while parsing instead of running them as no-ops
    pub strict: bool,
}

/// Run `source` with the default (lenient) options.
pub fn interpret(source: &str) -> anyhow::Result<Option<String>> {
    interpret_with(source, &Options::default())
}

/// Parse and run `source`.
///
/// * `Ok(Some(output))` the program ended with `end`
/// * `Ok(None)` the program ran off its end without `end`
/// * `Err(_)` a [`Fault`] aborted the run, or strict parsing failed with a [`ParseError`]
pub fn interpret_with(source: &str, options: &Options) -> anyhow::Result<Option<String>> {
    let program = Parser::new(source).strict(options.strict).parse()?;
    Vm::new(&program).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_and_msg() {
        let program = "mov a,5\ninc a\nmsg 'a=',a\nend";
        assert_eq!(interpret(program).unwrap(), Some("a=6".to_string()));
    }

    #[test]
    fn subroutine() {
        let program = "mov a,6\ncall halve\nmsg 'half=',a\nend\nhalve:\ndiv a,2\nret";
        assert_eq!(interpret(program).unwrap(), Some("half=3".to_string()));
    }

    #[test]
    fn countdown_loop() {
        let program = r"
            mov a, 3
            loop:
                msg a, ' '
                dec a
                cmp a, 0
                jne loop
            end";
        assert_eq!(interpret(program).unwrap(), Some("3 2 1 ".to_string()));
    }

    #[test]
    fn missing_end() {
        assert_eq!(interpret("mov a,1").unwrap(), None);
    }

    #[test]
    fn ret_without_call() {
        let err = interpret("mov a,1\nret\nend").unwrap_err();
        assert_eq!(err.downcast_ref::<Fault>(), Some(&Fault::EmptyCallStack));
    }

    #[test]
    fn deterministic() {
        let program = "mov a, 10\nmov b, 0\nl:\nadd b, a\ndec a\ncmp a, 0\njg l\nmsg 'sum=', b\nend";
        let first = interpret(program).unwrap();
        assert_eq!(first, Some("sum=55".to_string()));
        for _ in 0..3 {
            assert_eq!(interpret(program).unwrap(), first);
        }
    }

    #[test]
    fn flags_from_either_cmp() {
        let program = |a: i32, b: i32| {
            format!(
                "cmp {}, 0\ncmp {}, 0\nje zero\nmsg 'none'\nend\nzero:\nmsg 'zero'\nend",
                a, b
            )
        };
        assert_eq!(interpret(&program(0, 1)).unwrap().unwrap(), "zero");
        assert_eq!(interpret(&program(1, 0)).unwrap().unwrap(), "zero");
        assert_eq!(interpret(&program(1, 2)).unwrap().unwrap(), "none");
    }

    #[test]
    fn label_lands_after_stacked_labels() {
        let program = "jmp a\nmsg 'skipped'\na:\nb:\n; comment\n\nmsg 'landed'\nend";
        assert_eq!(interpret(program).unwrap(), Some("landed".to_string()));
    }

    #[test]
    fn factorial() {
        let program = r"
            ; factorial of 5
            mov   a, 5
            mov   r, 1
            call  fact
            msg   'fact(5) = ', r
            end

            fact:
                cmp   a, 1
                jle   done
                mul   r, a
                dec   a
                jmp   fact
            done:
                ret";
        assert_eq!(interpret(program).unwrap(), Some("fact(5) = 120".to_string()));
    }

    #[test]
    fn strict_mode() {
        let program = "mov a, 1\npush a\nend";
        assert_eq!(interpret(program).unwrap(), Some(String::new()));

        let err = interpret_with(program, &Options { strict: true }).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParseError>(),
            Some(&ParseError::UnknownMnemonic {
                line: 2,
                mnemonic: "push".to_string()
            })
        );
    }

    #[test]
    fn vertical_tab_separates_operands() {
        assert_eq!(interpret("mov\x0Ba, 5\nmsg a\nend").unwrap(), Some("5".to_string()));
    }

    #[test]
    fn empty_output_is_not_failure() {
        assert_eq!(interpret("mov a, 1\nend").unwrap(), Some(String::new()));
        assert_eq!(interpret("mov a, 1\nend\n").unwrap(), Some(String::new()));
    }
}
