use std::fmt;

/// Opcodes of the instruction set. Mnemonics are mapped once at parse time.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Op {
    Mov,
    Inc,
    Dec,
    Add,
    Sub,
    Mul,
    Div,
    Jmp,
    Cmp,
    Je,
    Jne,
    Jg,
    Jge,
    Jl,
    Jle,
    Call,
    Ret,
    End,
    Msg,
    /// Any mnemonic outside the instruction set. Executes as a no-op.
    Unknown,
}

impl Op {
    pub fn from_mnemonic(mnemonic: &str) -> Self {
        match mnemonic {
            "mov" => Op::Mov,
            "inc" => Op::Inc,
            "dec" => Op::Dec,
            "add" => Op::Add,
            "sub" => Op::Sub,
            "mul" => Op::Mul,
            "div" => Op::Div,
            "jmp" => Op::Jmp,
            "cmp" => Op::Cmp,
            "je" => Op::Je,
            "jne" => Op::Jne,
            "jg" => Op::Jg,
            "jge" => Op::Jge,
            "jl" => Op::Jl,
            "jle" => Op::Jle,
            "call" => Op::Call,
            "ret" => Op::Ret,
            "end" => Op::End,
            "msg" => Op::Msg,
            _ => Op::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Token<'a> {
    Identifier(&'a str),
    /// Text between single quotes, taken verbatim.
    StringLiteral(&'a str),
    /// Raw numeric text. It is only parsed when an instruction reads it.
    NumberLiteral(&'a str),
    /// Label name without the trailing ':'
    Label(&'a str),
    EndOfLine,
}

impl<'a> Token<'a> {
    /// Classify a bare atom (a run of characters without whitespace, ',' or ';').
    pub fn new(atom: &'a str) -> Self {
        if atom.starts_with('-') || atom.starts_with(|ch: char| ch.is_ascii_digit()) {
            Token::NumberLiteral(atom)
        } else if let Some(label) = atom.strip_suffix(':') {
            Token::Label(label)
        } else {
            Token::Identifier(atom)
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) | Token::NumberLiteral(name) => write!(f, "{}", name),
            Token::StringLiteral(text) => write!(f, "'{}'", text),
            Token::Label(name) => write!(f, "{}:", name),
            Token::EndOfLine => writeln!(f),
        }
    }
}
