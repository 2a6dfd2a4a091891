use asmi::{bytecode::Parser, vm::Vm};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{
    fs,
    io::{self, Write},
    process,
};

fn args() -> ArgMatches {
    Command::new("runner")
        .about("runs an assembler program and prints its output")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("file")
                .required(true)
                .help("program source file"),
        )
        .arg(
            Arg::new("strict")
                .short('s')
                .long("strict")
                .action(ArgAction::SetTrue)
                .help("rejects unknown mnemonics instead of skipping them"),
        )
        .arg(
            Arg::new("ir")
                .short('i')
                .long("ir")
                .action(ArgAction::SetTrue)
                .help("prints the parsed instructions and labels before running"),
        )
        .get_matches()
}

/// Parse and run `source`, writing the listing to `out` first when `ir` is set
fn execute(
    source: &str,
    strict: bool,
    ir: bool,
    out: &mut impl Write,
) -> anyhow::Result<Option<String>> {
    let program = Parser::new(source).strict(strict).parse()?;

    if ir {
        write!(out, "{}", program)?;
        writeln!(out, "----")?;
    }

    Vm::new(&program).run()
}

/// Print the result of a run and map it to the process exit code
fn report(
    result: anyhow::Result<Option<String>>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> i32 {
    match result {
        Ok(Some(output)) => {
            let _ = writeln!(out, "{}", output);
            0
        }
        Ok(None) => {
            let _ = writeln!(err, "program did not terminate with `end`");
            1
        }
        Err(e) => {
            let _ = writeln!(err, "{:#}", e);
            2
        }
    }
}

fn main() {
    env_logger::init();

    let matches = args();
    let mut stdout = io::stdout();
    let result = matches
        .get_one::<String>("file")
        .ok_or_else(|| anyhow::anyhow!("An assembler file should be provided."))
        .and_then(|path| Ok(fs::read_to_string(path)?))
        .and_then(|source| {
            execute(
                &source,
                matches.get_flag("strict"),
                matches.get_flag("ir"),
                &mut stdout,
            )
        });

    process::exit(report(result, &mut stdout, &mut io::stderr()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_code(source: &str, strict: bool) -> (i32, String, String) {
        let mut out: Vec<u8> = Vec::new();
        let mut err: Vec<u8> = Vec::new();
        let result = execute(source, strict, false, &mut out);
        let code = report(result, &mut out, &mut err);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn success() {
        assert_eq!(
            exit_code("msg 'hi'\nend", false),
            (0, "hi\n".to_string(), String::new())
        );
    }

    #[test]
    fn missing_end() {
        let (code, out, err) = exit_code("msg 'hi'", false);
        assert_eq!(code, 1);
        assert_eq!(out, "");
        assert_eq!(err, "program did not terminate with `end`\n");
    }

    #[test]
    fn fault_and_parse_error() {
        let (code, _, err) = exit_code("ret\nend", false);
        assert_eq!(code, 2);
        assert!(err.contains("ret with an empty call stack"));

        let (code, _, err) = exit_code("nop\nend", true);
        assert_eq!(code, 2);
        assert!(err.contains("unknown mnemonic 'nop'"));
    }

    #[test]
    fn unreadable_file() {
        let result = fs::read_to_string("/nonexistent/program.asm").map_err(anyhow::Error::from);
        let code = report(result.map(|_| None), &mut io::sink(), &mut io::sink());
        assert_eq!(code, 2);
    }

    #[test]
    fn listing_before_output() {
        let mut out: Vec<u8> = Vec::new();
        let result = execute("l:\nmsg 'x'\nend", false, true, &mut out);
        assert_eq!(report(result, &mut out, &mut io::sink()), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "l:\n   0  msg 'x'\n   1  end\n----\nx\n"
        );
    }
}
