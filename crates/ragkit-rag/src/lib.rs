//! The two orchestration pipelines and their remote collaborators.
//!
//! `indexer` turns a source document's chunks into index entries with
//! idempotent change detection; `answerer` turns a natural-language
//! question into a grounded answer with ranked citations. `source` is the
//! thin document-source client and `generation` the remote completion
//! client.

pub mod answerer;
pub mod generation;
pub mod indexer;
pub mod source;

pub use answerer::AnswerPipeline;
pub use generation::OpenAiGeneration;
pub use indexer::IndexingPipeline;
pub use source::SourceClient;
