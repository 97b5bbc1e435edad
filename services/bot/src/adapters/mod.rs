pub mod json_store;
pub mod tutor_llm;

pub use json_store::JsonFileStore;
pub use tutor_llm::OpenAiTutorAdapter;
