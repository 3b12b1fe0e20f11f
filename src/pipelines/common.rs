// Copyright 2019-present, the HuggingFace Inc. team, The Google AI Language Team and Facebook, Inc.
// Copyright 2019-2020 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Common tokenization blocks for the generation adapters
//! Provides an Enum holding the tokenizers backing the supported architectures, and the
//! `GenerationTokenizer` interface the input formatter relies on: encoding without special
//! tokens, special-token framing and access to the named special token ids.
use crate::common::error::Seq2SeqError;
use crate::resources::{resource_for_file, ResourceProvider};
use rust_tokenizers::tokenizer::{
    BertTokenizer, Gpt2Tokenizer, PegasusTokenizer, RobertaTokenizer, T5Tokenizer, Tokenizer,
};
use rust_tokenizers::vocab::{BertVocab, Gpt2Vocab, PegasusVocab, RobertaVocab, T5Vocab};
use rust_tokenizers::{Mask, TokenIdsWithOffsets};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
/// # Identifies the type of tokenizer
pub enum TokenizerType {
    Bert,
    Roberta,
    Blenderbot,
    Gpt2,
    T5,
    Pegasus,
}

impl TokenizerType {
    /// Names of the vocabulary files expected in a pretrained checkpoint, as
    /// (vocabulary, optional merges).
    pub fn vocab_files(&self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Bert => ("vocab.txt", None),
            Self::Roberta | Self::Blenderbot | Self::Gpt2 => ("vocab.json", Some("merges.txt")),
            Self::T5 | Self::Pegasus => ("spiece.model", None),
        }
    }

    /// Byte-level BPE tokenizers that add a leading space to texts not starting with whitespace
    pub fn uses_prefix_space(&self) -> bool {
        matches!(self, Self::Roberta | Self::Blenderbot | Self::Gpt2)
    }
}

/// # Tokenizer interface consumed by the input formatter
pub trait GenerationTokenizer {
    /// Tokenizes a text and converts it to ids, without adding any special token.
    fn encode_without_special_tokens(&self, text: &str) -> Vec<i64>;

    /// Wraps a sequence of ids with the special tokens expected by the model
    /// (e.g. `[CLS] ids [SEP]` for BERT, `ids </s>` for T5).
    fn build_input_with_special_tokens(&self, token_ids: Vec<i64>) -> Vec<i64>;

    /// Number of special tokens added by `build_input_with_special_tokens` to a single sequence.
    fn num_special_tokens_to_add(&self) -> usize {
        self.build_input_with_special_tokens(vec![]).len()
    }

    fn get_pad_id(&self) -> Option<i64>;

    fn get_bos_id(&self) -> Option<i64>;

    fn get_eos_id(&self) -> Option<i64>;

    fn get_cls_id(&self) -> Option<i64>;

    fn get_sep_id(&self) -> Option<i64>;

    /// Number of entries in the vocabulary
    fn vocab_size(&self) -> i64;
}

/// # Abstraction that holds a particular tokenizer, can be of any of the supported models
pub enum TokenizerOption {
    /// Bert Tokenizer
    Bert(BertTokenizer),
    /// Roberta Tokenizer
    Roberta(RobertaTokenizer),
    /// Roberta Tokenizer framing inputs with a trailing eos only
    Blenderbot(RobertaTokenizer),
    /// GPT2 Tokenizer
    Gpt2(Gpt2Tokenizer),
    /// T5 Tokenizer
    T5(T5Tokenizer),
    /// Pegasus Tokenizer
    Pegasus(PegasusTokenizer),
}

impl TokenizerOption {
    /// Interface method to load a tokenizer from file
    ///
    /// # Arguments
    ///
    /// * `tokenizer_type` - `TokenizerType` tokenizer family to load
    /// * `vocab_path` - path to the vocabulary (or sentencepiece model) file
    /// * `merges_path` - path to the merges file, required for BPE tokenizers
    /// * `lower_case` - lower-case the input before tokenization
    pub fn from_file(
        tokenizer_type: TokenizerType,
        vocab_path: &str,
        merges_path: Option<&str>,
        lower_case: bool,
    ) -> Result<Self, Seq2SeqError> {
        let merges = || {
            merges_path.ok_or_else(|| {
                Seq2SeqError::InvalidConfigurationError(format!(
                    "{:?} tokenizer requires a merges file",
                    tokenizer_type
                ))
            })
        };
        let add_prefix_space = tokenizer_type.uses_prefix_space();
        let tokenizer = match tokenizer_type {
            TokenizerType::Bert => {
                TokenizerOption::Bert(BertTokenizer::from_file(vocab_path, lower_case, lower_case)?)
            }
            TokenizerType::Roberta => TokenizerOption::Roberta(RobertaTokenizer::from_file(
                vocab_path,
                merges()?,
                lower_case,
                add_prefix_space,
            )?),
            TokenizerType::Blenderbot => TokenizerOption::Blenderbot(RobertaTokenizer::from_file(
                vocab_path,
                merges()?,
                lower_case,
                add_prefix_space,
            )?),
            TokenizerType::Gpt2 => TokenizerOption::Gpt2(Gpt2Tokenizer::from_file(
                vocab_path,
                merges()?,
                lower_case,
            )?),
            TokenizerType::T5 => TokenizerOption::T5(T5Tokenizer::from_file(vocab_path, lower_case)?),
            TokenizerType::Pegasus => {
                TokenizerOption::Pegasus(PegasusTokenizer::from_file(vocab_path, lower_case)?)
            }
        };
        Ok(tokenizer)
    }

    /// Loads a tokenizer from a pretrained checkpoint location (local directory or remote base
    /// URL), using the conventional vocabulary file names of the tokenizer family.
    pub fn from_pretrained(
        tokenizer_type: TokenizerType,
        location: &str,
        lower_case: bool,
    ) -> Result<Self, Seq2SeqError> {
        let (vocab_file, merges_file) = tokenizer_type.vocab_files();
        let vocab_path = resource_for_file(location, vocab_file).get_local_path()?;
        let merges_path = match merges_file {
            Some(merges_file) => Some(resource_for_file(location, merges_file).get_local_path()?),
            None => None,
        };
        Self::from_file(
            tokenizer_type,
            &vocab_path.to_string_lossy(),
            merges_path
                .as_ref()
                .map(|path| path.to_string_lossy())
                .as_deref(),
            lower_case,
        )
    }

    /// Returns the tokenizer type
    pub fn tokenizer_type(&self) -> TokenizerType {
        match *self {
            Self::Bert(_) => TokenizerType::Bert,
            Self::Roberta(_) => TokenizerType::Roberta,
            Self::Blenderbot(_) => TokenizerType::Blenderbot,
            Self::Gpt2(_) => TokenizerType::Gpt2,
            Self::T5(_) => TokenizerType::T5,
            Self::Pegasus(_) => TokenizerType::Pegasus,
        }
    }

    /// Interface method to tokenization
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.tokenize(text),
            Self::Roberta(ref tokenizer) | Self::Blenderbot(ref tokenizer) => {
                tokenizer.tokenize(text)
            }
            // the GPT2 tokenizer has no prefix space option
            Self::Gpt2(ref tokenizer) => {
                if text.is_empty() || text.starts_with(char::is_whitespace) {
                    tokenizer.tokenize(text)
                } else {
                    tokenizer.tokenize(&format!(" {}", text))
                }
            }
            Self::T5(ref tokenizer) => tokenizer.tokenize(text),
            Self::Pegasus(ref tokenizer) => tokenizer.tokenize(text),
        }
    }

    /// Interface method to convert tokens to ids
    pub fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<i64> {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
            Self::Roberta(ref tokenizer) | Self::Blenderbot(ref tokenizer) => {
                tokenizer.convert_tokens_to_ids(tokens)
            }
            Self::Gpt2(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
            Self::T5(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
            Self::Pegasus(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
        }
    }

    fn get_special_value(&self, token: &str) -> Option<i64> {
        match *self {
            Self::Bert(ref tokenizer) => Tokenizer::vocab(tokenizer).special_values.get(token),
            Self::Roberta(ref tokenizer) | Self::Blenderbot(ref tokenizer) => {
                Tokenizer::vocab(tokenizer).special_values.get(token)
            }
            Self::Gpt2(ref tokenizer) => Tokenizer::vocab(tokenizer).special_values.get(token),
            Self::T5(ref tokenizer) => Tokenizer::vocab(tokenizer).special_values.get(token),
            Self::Pegasus(ref tokenizer) => Tokenizer::vocab(tokenizer).special_values.get(token),
        }
        .copied()
    }
}

impl GenerationTokenizer for TokenizerOption {
    fn encode_without_special_tokens(&self, text: &str) -> Vec<i64> {
        let tokens = self.tokenize(text);
        self.convert_tokens_to_ids(tokens.as_slice())
    }

    fn build_input_with_special_tokens(&self, token_ids: Vec<i64>) -> Vec<i64> {
        let length = token_ids.len();
        let token_ids_with_offsets = TokenIdsWithOffsets {
            ids: token_ids,
            offsets: vec![None; length],
            reference_offsets: vec![vec![]; length],
            masks: vec![Mask::None; length],
        };
        let token_ids_with_special_tokens = match *self {
            Self::Bert(ref tokenizer) => {
                tokenizer.build_input_with_special_tokens(token_ids_with_offsets, None)
            }
            Self::Roberta(ref tokenizer) => {
                tokenizer.build_input_with_special_tokens(token_ids_with_offsets, None)
            }
            Self::Blenderbot(_) => {
                let mut token_ids = token_ids_with_offsets.ids;
                token_ids.extend(self.get_eos_id());
                return token_ids;
            }
            Self::Gpt2(ref tokenizer) => {
                tokenizer.build_input_with_special_tokens(token_ids_with_offsets, None)
            }
            Self::T5(ref tokenizer) => {
                tokenizer.build_input_with_special_tokens(token_ids_with_offsets, None)
            }
            Self::Pegasus(ref tokenizer) => {
                tokenizer.build_input_with_special_tokens(token_ids_with_offsets, None)
            }
        };
        token_ids_with_special_tokens.token_ids
    }

    fn get_pad_id(&self) -> Option<i64> {
        match *self {
            Self::Bert(_) => self.get_special_value(BertVocab::pad_value()),
            Self::Roberta(_) | Self::Blenderbot(_) => {
                self.get_special_value(RobertaVocab::pad_value())
            }
            Self::Gpt2(_) => None,
            Self::T5(_) => self.get_special_value(T5Vocab::pad_value()),
            Self::Pegasus(_) => self.get_special_value(PegasusVocab::pad_value()),
        }
    }

    fn get_bos_id(&self) -> Option<i64> {
        match *self {
            Self::Roberta(_) | Self::Blenderbot(_) => {
                self.get_special_value(RobertaVocab::bos_value())
            }
            Self::Gpt2(_) => self.get_special_value(Gpt2Vocab::bos_value()),
            Self::Bert(_) | Self::T5(_) | Self::Pegasus(_) => None,
        }
    }

    fn get_eos_id(&self) -> Option<i64> {
        match *self {
            Self::Roberta(_) | Self::Blenderbot(_) => {
                self.get_special_value(RobertaVocab::eos_value())
            }
            Self::Gpt2(_) => self.get_special_value(Gpt2Vocab::eos_value()),
            Self::T5(_) => self.get_special_value(T5Vocab::eos_value()),
            Self::Pegasus(_) => self.get_special_value(PegasusVocab::eos_value()),
            Self::Bert(_) => None,
        }
    }

    fn get_cls_id(&self) -> Option<i64> {
        match *self {
            Self::Bert(_) => self.get_special_value(BertVocab::cls_value()),
            Self::Roberta(_) | Self::Blenderbot(_) => {
                self.get_special_value(RobertaVocab::cls_value())
            }
            Self::Gpt2(_) | Self::T5(_) | Self::Pegasus(_) => None,
        }
    }

    fn get_sep_id(&self) -> Option<i64> {
        match *self {
            Self::Bert(_) => self.get_special_value(BertVocab::sep_value()),
            Self::Roberta(_) | Self::Blenderbot(_) => {
                self.get_special_value(RobertaVocab::sep_value())
            }
            Self::Gpt2(_) | Self::T5(_) | Self::Pegasus(_) => None,
        }
    }

    fn vocab_size(&self) -> i64 {
        let size = match *self {
            Self::Bert(ref tokenizer) => Tokenizer::vocab(tokenizer).values.len(),
            Self::Roberta(ref tokenizer) | Self::Blenderbot(ref tokenizer) => {
                Tokenizer::vocab(tokenizer).values.len()
            }
            Self::Gpt2(ref tokenizer) => Tokenizer::vocab(tokenizer).values.len(),
            Self::T5(ref tokenizer) => Tokenizer::vocab(tokenizer).values.len(),
            Self::Pegasus(ref tokenizer) => Tokenizer::vocab(tokenizer).values.len(),
        };
        size as i64
    }
}
