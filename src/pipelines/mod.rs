//! # Tokenization building blocks shared by the generation adapters
//!
//! The `common` module exposes `TokenizerOption`, an enum over the `rust_tokenizers` tokenizers
//! backing the supported architectures, and the `GenerationTokenizer` trait the input formatter
//! is written against.
//!
//! ```no_run
//! use rust_seq2seq::pipelines::common::{GenerationTokenizer, TokenizerOption, TokenizerType};
//! # fn main() -> anyhow::Result<()> {
//! let tokenizer = TokenizerOption::from_file(TokenizerType::Bert, "path/to/vocab.txt", None, true)?;
//! let ids = tokenizer.encode_without_special_tokens("Hello world");
//! let framed = tokenizer.build_input_with_special_tokens(ids);
//! # Ok(())
//! # }
//! ```

pub mod common;
