use criterion::{criterion_group, criterion_main, Criterion};

const COUNTDOWN: &str = r"
    mov a, 1000
    mov s, 0
    loop:
        add s, a
        dec a
        cmp a, 0
        jne loop
    msg 'sum=', s
    end";

pub fn interpret_benchmark(c: &mut Criterion) {
    c.bench_function("interpret", |b| {
        b.iter(|| -> anyhow::Result<()> {
            let output = asmi::interpret(COUNTDOWN)?;
            assert_eq!(output.as_deref(), Some("sum=500500"));

            Ok(())
        })
    });
}

pub fn parse_benchmark(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| -> anyhow::Result<()> {
            let program = asmi::bytecode::Parser::new(COUNTDOWN).parse()?;
            assert_eq!(program.len(), 8);

            Ok(())
        })
    });
}

criterion_group!(interpreter, interpret_benchmark, parse_benchmark);
criterion_main!(interpreter);
