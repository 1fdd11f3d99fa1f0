//! Property tests for pass counts over random section/generator shapes.

use std::cell::RefCell;

use proptest::prelude::*;
use reprise::test_support::run_recorded;
use reprise::{TestContext, TestResult, check, location};

/// One call site in a test body. A generator scopes everything after it in
/// the same block.
#[derive(Debug, Clone)]
enum Shape {
    Section(Vec<Shape>),
    Generator(u32),
}

thread_local! {
    static SHAPE: RefCell<Vec<Shape>> = const { RefCell::new(Vec::new()) };
    static ENTERED: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Number of distinct live paths through `items`; `base` is what an empty
/// scope contributes (nothing at the root, one path inside a section or
/// generator round).
fn live_paths(items: &[Shape], base: u64) -> u64 {
    match items.split_first() {
        None => base,
        Some((Shape::Section(children), rest)) => live_paths(children, 1) + live_paths(rest, 0),
        Some((Shape::Generator(k), rest)) => u64::from(*k) * live_paths(rest, 1),
    }
}

/// Runs `items`, ending with a check wherever a path ends: `leaf` tracks
/// whether the scope so far would be its own path, mirroring `base` in
/// [`live_paths`].
fn run_items(cx: &TestContext, items: &[Shape], prefix: &str, mut leaf: bool) -> TestResult {
    for (index, item) in items.iter().enumerate() {
        match item {
            Shape::Section(children) => {
                let name = format!("{}s{}", prefix, index);
                let section = cx.section(&name, location!())?;
                section.run(|| {
                    ENTERED.with(|entered| entered.borrow_mut().push(name.clone()));
                    run_items(cx, children, &format!("{}.", name), true)
                })?;
                leaf = false;
            }
            Shape::Generator(k) => {
                let name = format!("{}g{}", prefix, index);
                let k = *k;
                let _: u32 = cx.generate(&name, location!(), || Ok(0..k))?;
                leaf = true;
            }
        }
    }
    if leaf {
        check!(cx, true);
    }
    Ok(())
}

fn interpret(cx: &TestContext) -> TestResult {
    let items = SHAPE.with(|shape| shape.borrow().clone());
    run_items(cx, &items, "", false)
}

fn body_strategy() -> impl Strategy<Value = Vec<Shape>> {
    let leaf = prop_oneof![
        Just(Shape::Section(Vec::new())),
        (1u32..=2).prop_map(Shape::Generator),
    ];
    let item = leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner, 0..4).prop_map(Shape::Section),
            (1u32..=2).prop_map(Shape::Generator),
        ]
    });
    prop::collection::vec(item, 0..4)
}

#[test]
fn passes_equal_live_paths_plus_confirmation() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&body_strategy(), |items| {
            let expected = live_paths(&items, 0) + 1;
            SHAPE.with(|shape| *shape.borrow_mut() = items.clone());
            ENTERED.with(|entered| entered.borrow_mut().clear());

            let (outcome, _) = run_recorded("shape", interpret);

            prop_assert!(outcome.passed(), "failures: {:?}", outcome.failures);
            prop_assert_eq!(u64::from(outcome.passes), expected);
            prop_assert_eq!(outcome.assertions.passed, expected - 1);
            Ok(())
        })
        .expect("pass count property");
}

#[test]
fn top_level_sections_are_first_entered_in_source_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&body_strategy(), |items| {
            SHAPE.with(|shape| *shape.borrow_mut() = items.clone());
            ENTERED.with(|entered| entered.borrow_mut().clear());

            run_recorded("shape", interpret);

            let entered = ENTERED.with(|entered| entered.borrow().clone());
            let mut first_seen: Vec<String> = Vec::new();
            for name in entered {
                if !name.contains('.') && !first_seen.contains(&name) {
                    first_seen.push(name);
                }
            }
            let mut sorted = first_seen.clone();
            sorted.sort_by_key(|name| name[1..].parse::<usize>().unwrap_or(usize::MAX));
            prop_assert_eq!(first_seen, sorted);
            Ok(())
        })
        .expect("section order property");
}
