//! # llm-harvest
//!
//! Typed data from messy LLM output: tag repair, payload extraction, record
//! parsing, and whitelisted function-call execution.
//!
//! Model output that is supposed to carry structure rarely arrives clean.
//! The payload comes fenced in markdown, wrapped in prose, with author names
//! folded into their tags and closing tags missing. This crate repairs the
//! enumerated malformations, isolates the payload between its delimiters,
//! parses it leniently, and, for function-call payloads, executes the
//! proposed call against a caller-owned whitelist without ever evaluating
//! model text as code.
//!
//! ## Components
//!
//! - [`sanitize`](sanitize::sanitize): ordered repair table for known malformations
//! - [`extract_payload`](extract::extract_payload): delimiter location plus canonical re-rendering
//! - [`parse_book_records`](records::parse_book_records): five-field records, `"Unknown"` defaults
//! - [`parse_function_descriptor`](descriptor::parse_function_descriptor): callable name plus typed parameters
//! - [`synthesize`](synth::synthesize) / [`convert_type`](convert::convert_type): typed keyword arguments
//! - [`invoke`](invoker::invoke): whitelist-gated call execution, no eval
//! - [`Harvester`]: both flows composed, with stage events
//! - [`chat`]: Ollama and mock transports for fetching the raw text
//!
//! ## Quick Start
//!
//! ```
//! use llm_harvest::chat::{ChatClient, MockBackend};
//! use llm_harvest::harvest::booklist_conversation;
//! use llm_harvest::Harvester;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Swap the mock for a live Ollama server by dropping `.backend(...)`.
//!     let canned = "```xml\n<booklist><book><title>Dune</title><author Frank Herbert></book></booklist>\n```";
//!     let client = ChatClient::builder("http://localhost:11434")
//!         .backend(Arc::new(MockBackend::fixed(canned)))
//!         .build();
//!
//!     let raw = client
//!         .complete("llama3.2", &booklist_conversation("desert planets"))
//!         .await?;
//!
//!     let books = Harvester::new().books(&raw)?;
//!     assert_eq!(books[0].title, "Dune");
//!     assert_eq!(books[0].author, "Frank Herbert");
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline shape
//!
//! ```text
//! records:  raw text ──► sanitize ──► extract <booklist> ──► BookRecord list
//!
//! calls:    descriptor ──► parse ──► synthesize args ─┐
//!           raw proposal ──► narrow ──► whitelist gate ─┴─► invoke
//! ```
//!
//! The transport in [`chat`] is async; everything downstream of it is
//! synchronous, pure, and I/O-free, so the core pipeline runs the same way
//! in tests, demos, and production callers.

// --- Core pipeline ---
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod invoker;
pub mod markup;
pub mod records;
pub mod sanitize;
pub mod synth;

// --- Transport, observation, composition ---
pub mod chat;
pub mod harvest;
pub mod observe;

// --- Core exports ---
pub use convert::{convert_type, ArgValue};
pub use descriptor::{parse_function_descriptor, FunctionDescriptor, Parameter};
pub use error::{ChatError, HarvestError, Result};
pub use extract::{extract_booklist, extract_payload};
pub use invoker::{invoke, Whitelist};
pub use records::{parse_book_records, BookRecord};
pub use sanitize::sanitize;
pub use synth::{narrow_call_expression, synthesize, InvocationArguments};

// --- Transport and composition exports ---
pub use chat::{BackoffConfig, ChatClient, ChatMessage, LlmConfig, MockBackend, OllamaBackend, Role};
pub use harvest::{booklist_conversation, call_conversation, Harvester};
pub use observe::{Event, EventHandler, FnEventHandler};
