// Copyright 2021 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::common::error::Seq2SeqError;
use crate::pipelines::common::GenerationTokenizer;
use crate::seq2seq::architecture::{Architecture, FormattingMode};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tch::{Device, Tensor};

/// Label value excluded from the loss computation
pub const IGNORE_INDEX: i64 = -100;

/// Slots reserved around the source in causal LM mode (bos and eos)
const CAUSAL_LM_SOURCE_OVERHEAD: usize = 2;

/// # Raw training pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub source_text: String,
    pub target_text: String,
}

impl Example {
    pub fn new<S: Into<String>, T: Into<String>>(source_text: S, target_text: T) -> Self {
        Example {
            source_text: source_text.into(),
            target_text: target_text.into(),
        }
    }
}

impl<S: Into<String>, T: Into<String>> From<(S, T)> for Example {
    fn from(pair: (S, T)) -> Self {
        Example::new(pair.0, pair.1)
    }
}

/// # Single example converted to model inputs, before padding
///
/// `attention_mask` always has the length of `input_ids`. For causal language models, `labels`
/// also share that length; for encoder-decoder models `labels` hold the decoder sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExample {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub labels: Vec<i64>,
}

/// # Right-padded batch of encoded examples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seq2SeqBatch {
    /// Token ids of shape (*batch size*, *input length*), padded with the pad token id
    pub input_ids: Vec<Vec<i64>>,
    /// Attention mask of shape (*batch size*, *input length*), padded with 0
    pub attention_mask: Vec<Vec<i64>>,
    /// Labels of shape (*batch size*, *label length*), padded with `IGNORE_INDEX`
    pub labels: Vec<Vec<i64>>,
}

/// # Batch tensors passed to a model forward pass
pub struct Seq2SeqInputs {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub labels: Tensor,
}

impl Seq2SeqBatch {
    pub fn batch_size(&self) -> usize {
        self.input_ids.len()
    }

    /// Width of the padded `input_ids` and `attention_mask` rows
    pub fn input_length(&self) -> usize {
        self.input_ids.first().map_or(0, Vec::len)
    }

    /// Width of the padded `labels` rows
    pub fn label_length(&self) -> usize {
        self.labels.first().map_or(0, Vec::len)
    }

    /// Converts the batch to `Int64` tensors on the given device.
    pub fn to_tensors(&self, device: Device) -> Result<Seq2SeqInputs, Seq2SeqError> {
        Ok(Seq2SeqInputs {
            input_ids: stack_rows(&self.input_ids, device)?,
            attention_mask: stack_rows(&self.attention_mask, device)?,
            labels: stack_rows(&self.labels, device)?,
        })
    }
}

fn stack_rows(rows: &[Vec<i64>], device: Device) -> Result<Tensor, Seq2SeqError> {
    if rows.is_empty() {
        return Err(Seq2SeqError::ValueError(
            "Cannot build a tensor from an empty batch".to_string(),
        ));
    }
    let rows = rows
        .iter()
        .map(|row| Tensor::of_slice(row.as_slice()))
        .collect::<Vec<Tensor>>();
    Ok(Tensor::stack(rows.as_slice(), 0).to(device))
}

/// Right-pads every sequence to the length of the longest one.
pub fn pad_sequences(sequences: &[Vec<i64>], padding_value: i64) -> Vec<Vec<i64>> {
    let max_len = sequences.iter().map(Vec::len).max().unwrap_or(0);
    sequences
        .iter()
        .map(|sequence| {
            let mut padded = Vec::with_capacity(max_len);
            padded.extend_from_slice(sequence);
            padded.resize(max_len, padding_value);
            padded
        })
        .collect()
}

/// # Settings for the input formatter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterOptions {
    pub mode: FormattingMode,
    /// Maximum length of the formatted source, special tokens and prompts included
    pub source_max_length: usize,
    /// Maximum length of the formatted target, special tokens included
    pub target_max_length: usize,
    /// Prompt inserted before the source text
    pub prefix_prompt: String,
    /// Prompt inserted after the source text
    pub suffix_prompt: String,
    /// Padding id used when the tokenizer does not define one
    pub pad_token_id: Option<i64>,
    /// Drop the leading label token (decoder start injected by the model itself)
    pub drop_label_start_token: bool,
}

impl FormatterOptions {
    /// Options for an architecture table entry with empty prompts
    pub fn new(
        architecture: &Architecture,
        source_max_length: usize,
        target_max_length: usize,
    ) -> FormatterOptions {
        FormatterOptions {
            mode: architecture.mode,
            source_max_length,
            target_max_length,
            prefix_prompt: String::new(),
            suffix_prompt: String::new(),
            pad_token_id: None,
            drop_label_start_token: architecture.composite_encoder_decoder,
        }
    }

    pub fn with_prompts<S: Into<String>>(mut self, prefix_prompt: S, suffix_prompt: S) -> Self {
        self.prefix_prompt = prefix_prompt.into();
        self.suffix_prompt = suffix_prompt.into();
        self
    }

    pub fn with_pad_token_id(mut self, pad_token_id: i64) -> Self {
        self.pad_token_id = Some(pad_token_id);
        self
    }
}

/// # Converts raw text pairs into padded model inputs
///
/// Two regimes are supported:
/// - `CausalLM`: `[bos] prefix source suffix [eos] target [eos]` as a single sequence, with the
///   labels of the source span set to `IGNORE_INDEX`
/// - `EncoderDecoder`: `prefix source suffix` and `target` framed separately with the
///   tokenizer's special tokens, as encoder input and decoder labels
///
/// Truncation limits that cannot hold the prompts and special tokens clamp to an empty text
/// span instead of failing.
pub struct InputFormatter<T: GenerationTokenizer> {
    tokenizer: T,
    mode: FormattingMode,
    source_max_length: usize,
    target_max_length: usize,
    prefix_ids: Vec<i64>,
    suffix_ids: Vec<i64>,
    bos_token_id: i64,
    eos_token_id: i64,
    pad_token_id: i64,
    drop_label_start_token: bool,
}

impl<T: GenerationTokenizer> InputFormatter<T> {
    /// Build a new `InputFormatter`
    ///
    /// # Arguments
    ///
    /// * `tokenizer` - tokenizer implementing `GenerationTokenizer`
    /// * `options` - `FormatterOptions` holding the formatting regime, lengths and prompts
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// use rust_seq2seq::pipelines::common::{TokenizerOption, TokenizerType};
    /// use rust_seq2seq::seq2seq::{Example, FormatterOptions, InputFormatter, ModelType};
    ///
    /// let tokenizer = TokenizerOption::from_file(TokenizerType::Bert, "path/to/vocab.txt", None, true)?;
    /// let options = FormatterOptions::new(&ModelType::Bert2Seq.architecture(), 128, 64)
    ///     .with_prompts("summarize:", "");
    /// let formatter = InputFormatter::new(tokenizer, options)?;
    /// let batch = formatter.generate_inputs(&[Example::new("a long text", "a summary")])?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(tokenizer: T, options: FormatterOptions) -> Result<InputFormatter<T>, Seq2SeqError> {
        if options.source_max_length == 0 || options.target_max_length == 0 {
            return Err(Seq2SeqError::InvalidConfigurationError(format!(
                "source_max_length ({}) and target_max_length ({}) must be positive",
                options.source_max_length, options.target_max_length
            )));
        }

        let pad_token_id = options
            .pad_token_id
            .or_else(|| tokenizer.get_pad_id())
            .ok_or_else(|| {
                Seq2SeqError::InvalidConfigurationError(
                    "The tokenizer does not define a padding token".to_string(),
                )
            })?;
        let (bos_token_id, eos_token_id) = match options.mode {
            FormattingMode::CausalLM => {
                let bos = tokenizer.get_cls_id().or_else(|| tokenizer.get_bos_id());
                let eos = tokenizer.get_sep_id().or_else(|| tokenizer.get_eos_id());
                match (bos, eos) {
                    (Some(bos), Some(eos)) => (bos, eos),
                    _ => {
                        return Err(Seq2SeqError::InvalidConfigurationError(
                            "Causal LM formatting requires bos (or cls) and eos (or sep) tokens"
                                .to_string(),
                        ));
                    }
                }
            }
            // framing is delegated to the tokenizer
            FormattingMode::EncoderDecoder => (
                tokenizer.get_bos_id().unwrap_or(pad_token_id),
                tokenizer.get_eos_id().unwrap_or(pad_token_id),
            ),
        };

        let prefix_ids = tokenizer.encode_without_special_tokens(&options.prefix_prompt);
        let suffix_ids = tokenizer.encode_without_special_tokens(&options.suffix_prompt);

        let formatter = InputFormatter {
            tokenizer,
            mode: options.mode,
            source_max_length: options.source_max_length,
            target_max_length: options.target_max_length,
            prefix_ids,
            suffix_ids,
            bos_token_id,
            eos_token_id,
            pad_token_id,
            drop_label_start_token: options.drop_label_start_token,
        };

        let (source_overhead, target_overhead) = formatter.overheads();
        if source_overhead >= formatter.source_max_length {
            warn!(
                "source_max_length ({}) cannot hold the prompts and special tokens ({} tokens): source texts will be dropped",
                formatter.source_max_length, source_overhead
            );
        }
        if target_overhead >= formatter.target_max_length {
            warn!(
                "target_max_length ({}) cannot hold the special tokens ({} tokens): target texts will be dropped",
                formatter.target_max_length, target_overhead
            );
        }
        Ok(formatter)
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    pub fn mode(&self) -> FormattingMode {
        self.mode
    }

    pub fn prefix_ids(&self) -> &[i64] {
        &self.prefix_ids
    }

    pub fn suffix_ids(&self) -> &[i64] {
        &self.suffix_ids
    }

    pub fn pad_token_id(&self) -> i64 {
        self.pad_token_id
    }

    /// Number of positions taken by prompts and special tokens on the source and target sides
    fn overheads(&self) -> (usize, usize) {
        let affix_length = self.prefix_ids.len() + self.suffix_ids.len();
        match self.mode {
            FormattingMode::CausalLM => (affix_length + CAUSAL_LM_SOURCE_OVERHEAD, 1),
            FormattingMode::EncoderDecoder => {
                let num_special_tokens = self.tokenizer.num_special_tokens_to_add();
                (affix_length + num_special_tokens, num_special_tokens)
            }
        }
    }

    /// Maximum number of (source, target) text tokens kept after truncation
    pub fn truncation_lengths(&self) -> (usize, usize) {
        let (source_overhead, target_overhead) = self.overheads();
        (
            self.source_max_length.saturating_sub(source_overhead),
            self.target_max_length.saturating_sub(target_overhead),
        )
    }

    /// Encodes a single example without padding.
    pub fn encode_example(&self, example: &Example) -> EncodedExample {
        let mut source_ids = self
            .tokenizer
            .encode_without_special_tokens(&example.source_text);
        let mut target_ids = self
            .tokenizer
            .encode_without_special_tokens(&example.target_text);
        let (source_length, target_length) = self.truncation_lengths();
        source_ids.truncate(source_length);
        target_ids.truncate(target_length);

        let (input_ids, labels) = match self.mode {
            FormattingMode::CausalLM => {
                let mut source_input = Vec::with_capacity(
                    source_ids.len()
                        + self.prefix_ids.len()
                        + self.suffix_ids.len()
                        + CAUSAL_LM_SOURCE_OVERHEAD,
                );
                source_input.push(self.bos_token_id);
                source_input.extend_from_slice(&self.prefix_ids);
                source_input.extend(source_ids);
                source_input.extend_from_slice(&self.suffix_ids);
                source_input.push(self.eos_token_id);

                let mut target_input = target_ids;
                target_input.push(self.eos_token_id);

                let mut labels = vec![IGNORE_INDEX; source_input.len()];
                labels.extend_from_slice(&target_input);
                let mut input_ids = source_input;
                input_ids.extend(target_input);
                (input_ids, labels)
            }
            FormattingMode::EncoderDecoder => {
                let mut source_input = self.prefix_ids.clone();
                source_input.extend(source_ids);
                source_input.extend_from_slice(&self.suffix_ids);
                let input_ids = self.tokenizer.build_input_with_special_tokens(source_input);
                let mut labels = self.tokenizer.build_input_with_special_tokens(target_ids);
                if self.drop_label_start_token && !labels.is_empty() {
                    labels.remove(0);
                }
                (input_ids, labels)
            }
        };
        let attention_mask = vec![1; input_ids.len()];
        EncodedExample {
            input_ids,
            attention_mask,
            labels,
        }
    }

    /// Encodes a corpus and right-pads the resulting sequences into a batch.
    ///
    /// # Arguments
    ///
    /// * `corpus` - slice of `Example` to encode
    ///
    /// # Returns
    ///
    /// * `Seq2SeqBatch` with `input_ids` padded with the pad token id, `attention_mask` with 0 and
    /// `labels` with `IGNORE_INDEX`
    pub fn generate_inputs(&self, corpus: &[Example]) -> Result<Seq2SeqBatch, Seq2SeqError> {
        if corpus.is_empty() {
            return Err(Seq2SeqError::ValueError(
                "Cannot format an empty corpus".to_string(),
            ));
        }
        let encoded = corpus
            .iter()
            .map(|example| self.encode_example(example))
            .collect::<Vec<EncodedExample>>();

        let input_ids = encoded
            .iter()
            .map(|example| example.input_ids.clone())
            .collect::<Vec<Vec<i64>>>();
        let attention_mask = encoded
            .iter()
            .map(|example| example.attention_mask.clone())
            .collect::<Vec<Vec<i64>>>();
        let labels = encoded
            .into_iter()
            .map(|example| example.labels)
            .collect::<Vec<Vec<i64>>>();

        let batch = Seq2SeqBatch {
            input_ids: pad_sequences(&input_ids, self.pad_token_id),
            attention_mask: pad_sequences(&attention_mask, 0),
            labels: pad_sequences(&labels, IGNORE_INDEX),
        };
        debug!(
            "Formatted batch of {} examples: input length {}, label length {}",
            batch.batch_size(),
            batch.input_length(),
            batch.label_length()
        );
        Ok(batch)
    }
}
