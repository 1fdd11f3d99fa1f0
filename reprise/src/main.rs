//! Self-test harness for the reprise engine.
//!
//! Registers a handful of cases covering nested sections, generators and
//! failure pruning, then runs them through the regular session. The
//! `expected_failure_*` cases fail on purpose.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use reprise::generators::{random, range, values};
use reprise::session::{SessionArgs, run_session};
use reprise::{
    TestContext, TestResult, TestSuite, check, exit_codes, generate, logging, require, section,
    test_case,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    logging::init();
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(%info, "test body panicked");
    }));

    let args = SessionArgs::parse();
    let suite = suite()?;
    let mut stdout = std::io::stdout().lock();
    let code = run_session(&suite, args, &mut stdout)?;
    stdout.flush().context("flush stdout")?;
    if code != exit_codes::OK {
        std::process::exit(code);
    }
    Ok(())
}

fn suite() -> Result<TestSuite> {
    let mut suite = TestSuite::new();
    suite
        .add(test_case!("vector_sizes", vector_sizes))?
        .add(test_case!("generator_in_section", generator_in_section))?
        .add(test_case!("generator_product", generator_product))?
        .add(test_case!("seeded_dice", seeded_dice))?
        .add(test_case!("expected_failure_sibling", expected_failure_sibling))?
        .add(test_case!("expected_failure_panic", expected_failure_panic))?;
    Ok(suite)
}

fn vector_sizes(cx: &TestContext) -> TestResult {
    let mut v: Vec<u32> = vec![0; 5];
    require!(cx, v.len() == 5);

    section!(cx, "resizing bigger changes size", {
        v.resize(10, 0);
        check!(cx, v.len() == 10);
    })?;
    section!(cx, "resizing smaller changes size", {
        v.resize(0, 0);
        check!(cx, v.is_empty());
    })?;
    section!(cx, "reserving keeps size", {
        v.reserve(10);
        check!(cx, v.len() == 5);
        check!(cx, v.capacity() >= 10);

        section!(cx, "reserving smaller does not shrink", {
            v.reserve(0);
            check!(cx, v.capacity() >= 10);
        })?;
    })?;
    Ok(())
}

fn generator_in_section(cx: &TestContext) -> TestResult {
    section!(cx, "A", {
        let n: i32 = generate!(cx, values([1, 2, 3]))?;
        check!(cx, (1..=3).contains(&n));
    })?;
    section!(cx, "B", {
        check!(cx, cx.pass() == 4);
    })?;
    Ok(())
}

fn generator_product(cx: &TestContext) -> TestResult {
    let a: u32 = generate!(cx, range(1, 3))?;
    let b: u32 = generate!(cx, values([10, 20]))?;
    check!(cx, a * b >= 10);
    Ok(())
}

fn seeded_dice(cx: &TestContext) -> TestResult {
    let roll: u8 = generate!(cx, random(1, 6, cx.seed())?.take(3))?;
    check!(cx, (1..=6).contains(&roll));
    Ok(())
}

fn expected_failure_sibling(cx: &TestContext) -> TestResult {
    section!(cx, "fails", {
        anyhow::bail!("deliberate failure");
    })?;
    section!(cx, "still explored", {
        check!(cx, true);
    })?;
    Ok(())
}

fn expected_failure_panic(cx: &TestContext) -> TestResult {
    section!(cx, "panics", {
        let empty: Vec<u8> = Vec::new();
        check!(cx, empty.first().copied().unwrap_or_else(|| panic!("no element")) == 0);
    })?;
    section!(cx, "after the panic", {
        check!(cx, true);
    })?;
    Ok(())
}
