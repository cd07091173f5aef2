pub mod args;
pub mod engine;
pub mod errors;
pub mod normalize;
pub mod record;
pub mod report;
pub mod tokenizer;
