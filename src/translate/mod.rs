pub mod interface;
pub mod claude;
pub mod openai_compatible;
pub mod factory;

pub use interface::*;
pub use claude::ClaudeTranslator;
pub use openai_compatible::OpenAICompatibleTranslator;
pub use factory::TranslatorFactory;
