//! Example: turning a function descriptor into a whitelisted call, no live LLM.
//!
//! Run with: `cargo run --example mock_function_call`

use llm_harvest::chat::{ChatClient, MockBackend};
use llm_harvest::harvest::call_conversation;
use llm_harvest::{ArgValue, Harvester, Whitelist};
use std::sync::Arc;

const DESCRIPTOR: &str = r#"<Function name="CalculateSum">
  <Input>
    <Parameter name="a" type="int">5</Parameter>
    <Parameter name="b" type="int">3</Parameter>
  </Input>
</Function>"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let harvester = Harvester::new();

    // The typed arguments come straight from the descriptor
    let descriptor = harvester.descriptor(DESCRIPTOR)?;
    let args = harvester.arguments(&descriptor)?;
    println!("Descriptor: {} with {} parameter(s)", descriptor.name, descriptor.parameters.len());
    println!("Synthesized arguments: {:?}\n", args);

    // The model only proposes the call expression
    let client = ChatClient::builder("http://unused")
        .backend(Arc::new(MockBackend::fixed(
            "Sure thing! `CalculateSum(a=5, b=3)` should do it.",
        )))
        .build();

    let proposal = client
        .complete("llama3.2:1b", &call_conversation(DESCRIPTOR))
        .await?;
    println!("Model proposed: {}", proposal.trim());

    // Only registered names run, and only with their own parameter lists
    let whitelist = Whitelist::new().register("CalculateSum", &["a", "b"], |args| {
        let a = args["a"].as_int().ok_or("a must be an int")?;
        let b = args["b"].as_int().ok_or("b must be an int")?;
        Ok(ArgValue::Int(a + b))
    });

    let result = harvester.invoke(&proposal, &whitelist)?;
    println!("Result: {}", result);

    Ok(())
}
