//! Input formatting and model set-up for fine-tuning pretrained text generation models.
//!
//! This crate turns (source, target) text pairs into padded, loss-masked training batches for
//! pretrained sequence-to-sequence and causal language models, using tokenizers from the
//! [rust-tokenizers](https://github.com/guillaume-be/rust-tokenizers) library and `tch-rs`
//! tensors.
//!
//! Supported architectures:
//!
//! | Identifier | Tokenizer | Formatting |
//! |:----------:|:---------:|:----------:|
//! |t5|T5|Encoder-decoder|
//! |bart|RoBERTa|Encoder-decoder|
//! |bert2bert|BERT|Encoder-decoder (composite)|
//! |big_bird_pegasus|Pegasus|Encoder-decoder|
//! |blender_bot|RoBERTa (eos only)|Encoder-decoder|
//! |gpt2seq|GPT2|Causal LM|
//! |bert2seq|BERT|Causal LM|
//! |roberta2seq|RoBERTa|Causal LM|
//!
//! # Loading pre-trained checkpoints
//!
//! A checkpoint location (local directory or remote base URL) is expected to hold the
//! tokenizer vocabulary files (`vocab.txt`, `vocab.json` and `merges.txt`, or `spiece.model`) and
//! the model weights converted to the `tch` format (`rust_model.ot`). Remote files are cached
//! under `SEQ2SEQ_CACHE` if set, or in the user cache directory.
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use rust_seq2seq::seq2seq::{Example, TransformersConfig};
//! use rust_seq2seq::pipelines::common::TokenizerOption;
//! use rust_seq2seq::seq2seq::{FormatterOptions, InputFormatter};
//!
//! let mut config = TransformersConfig::new("gpt2seq", "path/to/gpt2", 128, 64);
//! config.suffix_prompt = Some(" TL;DR:".to_string());
//! let architecture = config.model_type()?.architecture();
//! let tokenizer = TokenizerOption::from_pretrained(
//!     architecture.tokenizer_type,
//!     &config.pretrained_model_path,
//!     false,
//! )?;
//! let options = config.formatter_options(&architecture).with_pad_token_id(50257);
//! let formatter = InputFormatter::new(tokenizer, options)?;
//! let batch = formatter.generate_inputs(&[Example::new("Some article", "Its summary")])?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod pipelines;
pub mod seq2seq;

pub use common::error::Seq2SeqError;
pub use common::resources;
pub use common::Config;
