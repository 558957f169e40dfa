//! The harvest front door: canned prompts, conversation builders, and the
//! observed end-to-end pipelines.
//!
//! Two flows share this module. The record flow repairs a raw response,
//! extracts its `<booklist>` payload, and parses book records. The call
//! flow parses a function descriptor, synthesizes typed arguments, and runs
//! a model-proposed call against a whitelist. [`Harvester`] composes the
//! stages and brackets each one with [`observe`](crate::observe) events;
//! the per-stage functions in the component modules stay pure and can be
//! used directly when no observation is wanted.

use std::sync::Arc;

use crate::chat::ChatMessage;
use crate::convert::ArgValue;
use crate::descriptor::{parse_function_descriptor, FunctionDescriptor};
use crate::error::Result;
use crate::extract::extract_booklist;
use crate::invoker::{invoke, Whitelist};
use crate::observe::{observed, EventHandler};
use crate::records::{parse_book_records, BookRecord, BOOK_FIELDS};
use crate::sanitize::sanitize;
use crate::synth::{synthesize, InvocationArguments};

/// System prompt for requesting a record-list payload.
///
/// Spells out the exact `<booklist>` structure, one line per record field,
/// and asks for markup with no commentary. Models ignore the last part
/// often enough that the pipeline never relies on it.
pub fn booklist_system_prompt() -> String {
    let fields = BOOK_FIELDS
        .iter()
        .map(|field| format!("      <{0}>...</{0}>", field))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a librarian assistant. Respond with XML only, no commentary, \
         using exactly this structure:\n\
         <booklist>\n    <book>\n{}\n    </book>\n</booklist>\n\
         Repeat the <book> element once per book.",
        fields
    )
}

/// Build the conversation asking for a book list on `topic`.
pub fn booklist_conversation(topic: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(booklist_system_prompt()),
        ChatMessage::user(format!("Generate a list of books about {}.", topic)),
    ]
}

/// System prompt for proposing a call expression from a function descriptor.
pub const CALL_SYSTEM_PROMPT: &str =
    "You translate a function definition in XML into a single call expression. \
     Respond with only the call, written as Name(param=value, ...), and nothing else. \
     For example: CalculateSum(x=5, y=3)";

/// Build the conversation asking the model to propose a call for the given
/// descriptor markup.
pub fn call_conversation(descriptor_markup: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CALL_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Generate the function call for this definition:\n{}",
            descriptor_markup
        )),
    ]
}

/// Observed composition of the record and call flows.
///
/// Stateless apart from an optional event handler, so it is cheap to build
/// one per response or keep one around.
///
/// # Examples
///
/// ```
/// use llm_harvest::Harvester;
///
/// let raw = "```xml\n<booklist><book><title>Dune</title></book></booklist>\n```";
/// let books = Harvester::new().books(raw).unwrap();
/// assert_eq!(books[0].title, "Dune");
/// assert_eq!(books[0].author, "Unknown");
/// ```
#[derive(Default)]
pub struct Harvester {
    events: Option<Arc<dyn EventHandler>>,
}

impl Harvester {
    /// Create a harvester with no event handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an event handler; every stage start and end is reported to it.
    pub fn with_events(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events = Some(handler);
        self
    }

    /// Record flow: repair `raw`, extract its `<booklist>` payload, and
    /// parse the book records.
    pub fn books(&self, raw: &str) -> Result<Vec<BookRecord>> {
        let cleaned = observed(&self.events, "sanitize", || Ok(sanitize(raw)))?;
        let payload = observed(&self.events, "extract", || extract_booklist(&cleaned))?;
        observed(&self.events, "parse-records", || parse_book_records(&payload))
    }

    /// Call flow: parse a function descriptor payload.
    pub fn descriptor(&self, payload: &str) -> Result<FunctionDescriptor> {
        observed(&self.events, "parse-descriptor", || {
            parse_function_descriptor(payload)
        })
    }

    /// Call flow: synthesize typed keyword arguments from a descriptor.
    pub fn arguments(&self, descriptor: &FunctionDescriptor) -> Result<InvocationArguments> {
        observed(&self.events, "synthesize", || synthesize(descriptor))
    }

    /// Call flow: run a model-proposed call expression against the
    /// whitelist.
    pub fn invoke(&self, call_text: &str, whitelist: &Whitelist) -> Result<ArgValue> {
        observed(&self.events, "invoke", || invoke(call_text, whitelist))
    }
}

impl std::fmt::Debug for Harvester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harvester")
            .field("has_event_handler", &self.events.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use crate::observe::{Event, FnEventHandler};
    use std::sync::Mutex;

    const MESSY_RESPONSE: &str = "Of course! Here are two books:\n\
        ```xml\n\
        <booklist>\n\
          <book>\n\
            <title>The Dispossessed</title>\n\
            <author Ursula K. Le Guin>\n\
            <publication_year>1974</publication_year>\n\
            <genre|Science Fiction>\n\
            <isbn>978-0061054884</isbn>\n\
          </book>\n\
          <book>\n\
            <title>Walden</title>\n\
          </book>\n\
        </booklist>\n\
        ```\n\
        Happy reading!";

    #[test]
    fn test_books_end_to_end() {
        let books = Harvester::new().books(MESSY_RESPONSE).unwrap();
        assert_eq!(books.len(), 2);

        assert_eq!(books[0].title, "The Dispossessed");
        assert_eq!(books[0].author, "Ursula K. Le Guin");
        assert_eq!(books[0].publication_year, "1974");
        assert_eq!(books[0].genre, "Science Fiction");
        assert_eq!(books[0].isbn, "978-0061054884");

        assert_eq!(books[1].title, "Walden");
        assert_eq!(books[1].author, "Unknown");
    }

    #[test]
    fn test_books_failure_has_no_partial_result() {
        let err = Harvester::new().books("I would rather not.").unwrap_err();
        assert!(matches!(err, HarvestError::PayloadNotFound { .. }));
    }

    #[test]
    fn test_stage_events_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let harvester = Harvester::new().with_events(Arc::new(FnEventHandler(
            move |event: Event| {
                let line = match event {
                    Event::StageStart { stage } => format!("+{}", stage),
                    Event::StageEnd { stage, ok } => format!("-{}:{}", stage, ok),
                    Event::TransportRetry { .. } => "retry".to_string(),
                };
                sink.lock().unwrap().push(line);
            },
        )));

        harvester.books(MESSY_RESPONSE).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            [
                "+sanitize",
                "-sanitize:true",
                "+extract",
                "-extract:true",
                "+parse-records",
                "-parse-records:true",
            ]
        );
    }

    #[test]
    fn test_stage_events_stop_at_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let harvester = Harvester::new().with_events(Arc::new(FnEventHandler(
            move |event: Event| {
                if let Event::StageEnd { stage, ok } = event {
                    sink.lock().unwrap().push(format!("{}:{}", stage, ok));
                }
            },
        )));

        harvester.books("no payload here").unwrap_err();
        assert_eq!(*log.lock().unwrap(), ["sanitize:true", "extract:false"]);
    }

    #[test]
    fn test_descriptor_to_invocation() {
        let payload = r#"<Function name="CalculateSum">
  <Input>
    <Parameter name="a" type="int">5</Parameter>
    <Parameter name="b" type="int">3</Parameter>
  </Input>
</Function>"#;

        let harvester = Harvester::new();
        let descriptor = harvester.descriptor(payload).unwrap();
        let args = harvester.arguments(&descriptor).unwrap();
        assert_eq!(args["a"], ArgValue::Int(5));
        assert_eq!(args["b"], ArgValue::Int(3));

        let whitelist = Whitelist::new().register("CalculateSum", &["a", "b"], |args| {
            let a = args.get("a").and_then(ArgValue::as_int).ok_or("bad a")?;
            let b = args.get("b").and_then(ArgValue::as_int).ok_or("bad b")?;
            Ok(ArgValue::Int(a + b))
        });
        let result = harvester
            .invoke("CalculateSum(a=5, b=3)", &whitelist)
            .unwrap();
        assert_eq!(result, ArgValue::Int(8));
    }

    #[test]
    fn test_booklist_prompt_names_every_field() {
        let prompt = booklist_system_prompt();
        for field in BOOK_FIELDS {
            assert!(prompt.contains(field), "prompt is missing {}", field);
        }
        assert!(prompt.contains("<booklist>"));
    }

    #[test]
    fn test_conversation_shapes() {
        let books = booklist_conversation("rivers");
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].role, crate::chat::Role::System);
        assert!(books[1].content.contains("rivers"));

        let call = call_conversation("<Function name=\"f\"></Function>");
        assert_eq!(call.len(), 2);
        assert!(call[1].content.contains("<Function"));
    }
}
