//! Call-site macros for test bodies.
//!
//! Each macro takes the `&TestContext` explicitly and captures its own
//! source location, which becomes part of the tracker key.

/// The current source position as a [`SourceLocation`](crate::SourceLocation).
#[macro_export]
macro_rules! location {
    () => {
        $crate::SourceLocation::new(file!(), line!(), column!())
    };
}

/// Run `body` only on passes where the section is live.
///
/// Evaluates to `anyhow::Result<()>`. `?` inside the body exits the section
/// early; propagate the macro's result with `?` to end the pass.
///
/// ```ignore
/// section!(cx, "empty vector", {
///     check!(cx, Vec::<u8>::new().is_empty());
/// })?;
/// ```
#[macro_export]
macro_rules! section {
    ($cx:expr, $name:expr, $body:block) => {
        match $cx.section($name, $crate::location!()) {
            Ok(section) => section.run(|| {
                #[allow(unreachable_code)]
                let result: $crate::TestResult = {
                    $body;
                    Ok(())
                };
                result
            }),
            Err(err) => Err($crate::TestError::from(err)),
        }
    };
}

/// Current element of a generator; the sequence expression is evaluated only
/// the first time the call site is reached.
///
/// Evaluates to `Result<T, TrackerError>`. Fallible builders may use `?`
/// inside the sequence expression.
#[macro_export]
macro_rules! generate {
    ($cx:expr, $seq:expr) => {
        $cx.generate(stringify!($seq), $crate::location!(), || {
            Ok::<_, $crate::TrackerError>($seq)
        })
    };
}

/// Non-fatal check; evaluates to the condition.
#[macro_export]
macro_rules! check {
    ($cx:expr, $cond:expr) => {
        $cx.check($cond, stringify!($cond), $crate::location!())
    };
}

/// Fatal check: returns an error from the enclosing body when false.
#[macro_export]
macro_rules! require {
    ($cx:expr, $cond:expr) => {
        $cx.require($cond, stringify!($cond), $crate::location!())?
    };
}
