//! # Fine-tuning adapters for pretrained generation models
//!
//! Converts (source, target) text pairs into the inputs expected by pretrained
//! sequence-to-sequence and causal language models, and wires the tokenizer and model of a
//! pretrained checkpoint together for training.
//!
//! Two formatting regimes are supported, selected by the architecture:
//! - causal language models (`gpt2seq`, `bert2seq`, `roberta2seq`) see the source and target
//! concatenated in a single sequence and only the target span contributes to the loss,
//! - encoder-decoder models (`t5`, `bart`, `bert2bert`, `big_bird_pegasus`, `blender_bot`) receive
//! the framed source as encoder input and the framed target as labels.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use rust_seq2seq::pipelines::common::TokenizerOption;
//! use rust_seq2seq::seq2seq::{Example, FormatterOptions, InputFormatter, ModelType};
//!
//! let architecture: ModelType = "bart".parse()?;
//! let architecture = architecture.architecture();
//! let tokenizer =
//!     TokenizerOption::from_pretrained(architecture.tokenizer_type, "path/to/bart-base", false)?;
//! let options = FormatterOptions::new(&architecture, 256, 64).with_prompts("summarize: ", "");
//! let formatter = InputFormatter::new(tokenizer, options)?;
//!
//! let corpus = [
//!     Example::new("The quick brown fox jumps over the lazy dog", "Fox jumps"),
//!     Example::new("It was a bright cold day in April", "Cold day"),
//! ];
//! let batch = formatter.generate_inputs(&corpus)?;
//! let inputs = batch.to_tensors(tch::Device::Cpu)?;
//! # Ok(())
//! # }
//! ```

mod architecture;
mod input_formatter;
mod loss;
mod seq2seq_model;

pub use architecture::{Architecture, FormattingMode, ModelType};
pub use input_formatter::{
    pad_sequences, EncodedExample, Example, FormatterOptions, InputFormatter, Seq2SeqBatch,
    Seq2SeqInputs, IGNORE_INDEX,
};
pub use loss::lm_loss;
pub use seq2seq_model::{
    ModelSettings, Seq2SeqTransformer, TokenizerConfig, TrainableModel, TransformersConfig,
};
