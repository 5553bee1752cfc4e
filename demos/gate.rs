/* demos/gate.rs */

use http::StatusCode;
use reflip::flag::{Flag, Predicate};
use reflip::{BufferedResponse, Chain, ChainOutcome, Context, FlagTable, Registry, ResponseSink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
	// 1. A pre-built table, no storage
	let table = FlagTable::from_flags([
		Flag::boolean("aardvarks", true)?,
		Flag::metered("archaeopteryx", 25.0)?,
		Flag::custom(
			"staff",
			Predicate::new(|ctx| ctx.attribute("role") == Some("staff")),
		)?,
	])?;
	let registry = Registry::builder().features(table).http_code(403).seed(7).build()?;

	// 2. Staff-only pipeline with a custom refusal
	let chain = Chain::new().with(registry.flip()).with(registry.gate_with(
		"staff",
		|_: &mut Context, sink: &mut dyn ResponseSink| {
			sink.send(StatusCode::UNAUTHORIZED, "staff only");
		},
	)?);

	for role in ["staff", "guest"] {
		let mut ctx = Context::new().with_attribute("role", role);
		let mut response = BufferedResponse::new();
		let outcome = chain.run(&mut ctx, &mut response);
		println!("{}: {:?} {:?} {}", role, outcome, response.status, response.body);
	}

	// 3. Default gate: rejected requests carry the configured status
	let beta = Chain::new().with(registry.flip()).with(registry.gate("archaeopteryx")?);
	let mut passed = 0;
	for _ in 0..100 {
		if beta.run(&mut Context::new(), &mut BufferedResponse::new()) == ChainOutcome::Completed {
			passed += 1;
		}
	}
	println!("archaeopteryx let {} of 100 requests through", passed);

	Ok(())
}
