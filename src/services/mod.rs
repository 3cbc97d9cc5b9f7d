pub mod analyzer;
pub mod completion_client;
pub mod prompt_builder;
pub mod response_normalizer;
pub mod result_store;
pub mod text_extractor;

pub use analyzer::AnalysisPipeline;
pub use completion_client::{CompletionClient, CompletionError, OpenAiClient, OpenAiSettings};
pub use prompt_builder::{build_prompt, Prompt};
pub use response_normalizer::{normalize, strip_code_fences, NormalizeError, ScorePolicy};
pub use result_store::{persist_best_effort, ResultStore, SqliteResultStore, StoreError, UnavailableStore};
pub use text_extractor::{ExtractError, TextExtractor};
