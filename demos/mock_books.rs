//! Example: harvesting book records from a canned response, no live LLM.
//!
//! Run with: `cargo run --example mock_books`

use llm_harvest::chat::{ChatClient, MockBackend};
use llm_harvest::harvest::booklist_conversation;
use llm_harvest::Harvester;
use std::sync::Arc;

// Everything wrong at once: a markdown fence, prose around the payload, an
// author folded into its tag, a pipe-merged genre, and a mostly-empty book.
const CANNED: &str = "\
Of course! Here are some classics you might enjoy:

```xml
<booklist>
  <book>
    <title>A Wizard of Earthsea</title>
    <author Ursula K. Le Guin>
    <publication_year>1968</publication_year>
    <genre|Fantasy>
    <isbn>978-0547773742</isbn>
  </book>
  <book>
    <title>Walden</title>
  </book>
</booklist>
```

Let me know if you want more recommendations!";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Swap the mock for a live server by dropping `.backend(...)`.
    let client = ChatClient::builder("http://unused")
        .backend(Arc::new(MockBackend::fixed(CANNED)))
        .build();

    let raw = client
        .complete("llama3.2", &booklist_conversation("classic novels"))
        .await?;

    // Repair, extract, and parse in one call
    let books = Harvester::new().books(&raw)?;

    println!("Parsed {} book(s):\n", books.len());
    println!("{}", serde_json::to_string_pretty(&books)?);

    Ok(())
}
