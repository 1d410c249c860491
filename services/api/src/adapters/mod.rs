pub mod chat_llm;
pub mod codegen_llm;
pub mod db;
pub mod llm;
pub mod simulator;
pub mod source_files;
pub mod suggestions_llm;
pub mod vision_llm;

pub use chat_llm::OpenAiChatAdapter;
pub use codegen_llm::OpenAiCodegenAdapter;
pub use db::DbAdapter;
pub use llm::DisabledLlm;
pub use simulator::RandomSimulator;
pub use source_files::LocalSourceFiles;
pub use suggestions_llm::OpenAiSuggestionsAdapter;
pub use vision_llm::OpenAiVisionAdapter;
