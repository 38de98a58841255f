//! Example walking through single and nested differentiation.
//!
//! Each `diff` call opens its own session, so derivatives can be taken
//! inside derivatives without their tangents mixing.
//!
//! Run with: `RUST_LOG=trace cargo run --example nested_diff`

use dualtag::{diff, Catalog, CatalogEntry, Engine, Num, BASE_NAMESPACE};

fn main() {
    env_logger::init();

    println!("=== Session-Tagged Dual Numbers ===\n");

    // Example 1: Elementary function
    // f(x) = sin(x²) at x=2
    println!("Example 1: f(x) = sin(x²) at x=2");
    let d = diff(|x: Num<f64>| x.powi(2).sin(), 2.0).unwrap();
    println!("  f'(2) = {}", d);
    println!("  expected: cos(4)·4 = {}", 4.0_f64.cos() * 4.0);
    println!();

    // Example 2: Constant function
    println!("Example 2: f(x) = 5 at x=3");
    let d = diff(|_: Num<f64>| 5.0, 3.0).unwrap();
    println!("  f'(3) = {} (expected: 0)", d);
    println!();

    // Example 3: Derivative inside a derivative
    // f(x) = x · (d/dy y²)|y=x = 2x², f'(x) = 4x
    println!("Example 3: f(x) = x · d/dy[y²](x) at x=3");
    let d = diff(
        |x: Num<f64>| {
            let inner = diff(|y: Num<f64>| &y * &y, x.clone()).unwrap();
            println!("  inner derivative, still tracking x: {}", inner);
            x * inner
        },
        3.0,
    )
    .unwrap();
    println!("  f'(3) = {} (expected: 12)", d);
    println!();

    // Example 4: Perturbation confusion
    // f(x) = x · d/dy[x + y] = x, f'(x) = 1
    println!("Example 4: f(x) = x · d/dy[x + y](1) at x=1");
    let d = diff(
        |x: Num<f64>| {
            let inner = diff(|y: Num<f64>| &x + &y, 1.0).unwrap();
            &x * &inner
        },
        1.0,
    )
    .unwrap();
    println!("  f'(1) = {} (expected: 1, a shared tangent would give 2)", d);
    println!();

    // Example 5: Second derivative
    // f(x) = x³, f''(x) = 6x
    println!("Example 5: f(x) = x³, f''(x) at x=2");
    let d = diff(|x: Num<f64>| diff(|y: Num<f64>| y.powi(3), x).unwrap(), 2.0).unwrap();
    println!("  f''(2) = {} (expected: 12)", d);
    println!();

    // Example 6: A reduced rule set
    println!("Example 6: engine knowing only `*` and `exp`");
    let catalog: Catalog = [
        CatalogEntry::new(BASE_NAMESPACE, "*", 2, ["y", "x"]),
        CatalogEntry::new(BASE_NAMESPACE, "exp", 1, ["exp(x)"]),
    ]
    .into_iter()
    .collect();
    let engine = Engine::new(&catalog).unwrap();
    println!("  {} rules in namespace `{}`", engine.rules().len(), engine.rules().namespace());
    let (y, dy) = engine
        .value_and_diff(|x: Num<f64>| &x * x.exp(), 1.0)
        .unwrap();
    println!("  f(1) = {}, f'(1) = {} (expected: 2e = {})", y, dy, 2.0 * std::f64::consts::E);
    println!();

    // Example 7: Rejected shapes
    println!("Example 7: non-scalar result");
    match diff(|x: Num<f64>| vec![x.sin(), x.cos()], 0.0) {
        Ok(d) => println!("  unexpected: {}", d),
        Err(err) => println!("  error: {}", err),
    }
}
