//! Example: watching each harvest stage run via the event hook.
//!
//! The core pipeline is synchronous, so there is no runtime here at all.
//!
//! Run with: `cargo run --example observed_pipeline`

use llm_harvest::observe::{Event, FnEventHandler};
use llm_harvest::Harvester;
use std::sync::Arc;

fn main() {
    let handler = Arc::new(FnEventHandler(|event| match event {
        Event::StageStart { stage } => println!("[start] {}", stage),
        Event::StageEnd { stage, ok } => println!("[end]   {} (ok: {})", stage, ok),
        Event::TransportRetry { attempt, delay_ms, reason } => {
            println!("[retry] attempt {} in {}ms: {}", attempt, delay_ms, reason)
        }
    }));

    let harvester = Harvester::new().with_events(handler);

    println!("--- clean payload ---");
    let good = "<booklist><book><title>Walden</title></book></booklist>";
    match harvester.books(good) {
        Ok(books) => println!("harvested: {} book(s)\n", books.len()),
        Err(e) => println!("failed: {}\n", e),
    }

    println!("--- no payload at all ---");
    let bad = "I'm sorry, I don't have any recommendations today.";
    match harvester.books(bad) {
        Ok(books) => println!("harvested: {} book(s)", books.len()),
        Err(e) => println!("failed: {}", e),
    }
}
