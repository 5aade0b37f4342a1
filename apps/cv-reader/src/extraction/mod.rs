pub mod extractor;
pub mod prompts;
