mod classifier;
mod openai;
pub mod prompts;
pub mod utils;

pub use classifier::{validate_classification, Classifier, ClassifierError};
pub use openai::OpenAiClassifier;
