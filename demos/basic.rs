/* demos/basic.rs */

use std::fs;
use std::time::Duration;

use reflip::storage::FileAdapter;
use reflip::{BufferedResponse, Chain, ChainOutcome, Context, Registry, RegistryEvent};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// 0. Prepare a real definition file
	let flags_path = "example_flags.json";
	if std::path::Path::new(flags_path).exists() {
		fs::remove_file(flags_path)?;
	}
	fs::write(
		flags_path,
		br#"{
	"ttl": 60000,
	"features": [
		{ "name": "aardvarks", "type": "boolean", "enabled": true },
		{ "name": "archaeopteryx", "type": "boolean", "enabled": false },
		{ "name": "agouti", "type": "grouped", "enabled": true, "groups": ["red", "blue"] }
	]
}"#,
	)?;
	println!("Created {}", flags_path);

	// 1. Build the registry over the file
	let registry = Registry::builder().storage(FileAdapter::new(flags_path)?).build()?;

	// 2. Log what the registry does
	let mut events = registry.subscribe();
	tokio::spawn(async move {
		while let Ok(event) = events.recv().await {
			match event {
				RegistryEvent::Ready(change) => println!("Table v{} installed: {:?}", change.version, change),
				RegistryEvent::Error { stage, message } => println!("Error during {:?}: {}", stage, message),
				other => println!("Event: {:?}", other),
			}
		}
	});

	// 3. Initial fetch plus live reloading
	registry.start().await?;

	// 4. A request pipeline: snapshot, then a gate
	let chain = Chain::new()
		.with(registry.flip())
		.with(registry.gate("archaeopteryx")?);

	println!(
		"Watching {}... (set archaeopteryx to enabled to open the gate)",
		flags_path
	);
	println!("Waiting 20 seconds...");

	for _ in 0..10 {
		tokio::time::sleep(Duration::from_secs(2)).await;
		let mut ctx = Context::new();
		let mut response = BufferedResponse::new();
		match chain.run(&mut ctx, &mut response) {
			ChainOutcome::Completed => println!("Request passed"),
			ChainOutcome::Rejected(rejection) => println!("Request rejected: {}", rejection),
			ChainOutcome::Intercepted => println!("Request answered: {}", response.body),
		}
		if let Some(snapshot) = ctx.snapshot("check") {
			println!("Snapshot: {:?}", snapshot.all());
		}
	}

	// Cleanup
	registry.shutdown();
	fs::remove_file(flags_path)?;
	println!("Done.");
	Ok(())
}
