//! Example: harvesting book records from a live Ollama server.
//!
//! Requires `ollama serve` running locally with the model pulled:
//! `ollama pull llama3.2`
//!
//! Run with: `cargo run --example ollama_books`

use llm_harvest::chat::{BackoffConfig, ChatClient};
use llm_harvest::harvest::booklist_conversation;
use llm_harvest::Harvester;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = ChatClient::builder("http://localhost:11434")
        .backoff(BackoffConfig::standard())
        .build();

    println!("Asking for recommendations...");
    let raw = client
        .complete("llama3.2", &booklist_conversation("science fiction"))
        .await?;

    match Harvester::new().books(&raw) {
        Ok(books) => {
            println!("\nParsed {} book(s):", books.len());
            for book in &books {
                println!("  {} by {} ({})", book.title, book.author, book.publication_year);
            }
        }
        Err(e) => {
            // Small models sometimes skip the format entirely
            println!("\nCould not harvest records: {}", e);
            println!("Raw response was:\n{}", raw);
        }
    }

    Ok(())
}
