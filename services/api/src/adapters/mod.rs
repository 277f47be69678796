pub mod file_store;
pub mod interpretation_llm;

pub use file_store::FileStore;
pub use interpretation_llm::OpenAiInterpretationAdapter;
