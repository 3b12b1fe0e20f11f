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
use crate::pipelines::common::TokenizerType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
/// # Identifies the pretrained architecture to fine-tune
pub enum ModelType {
    #[serde(rename = "t5")]
    T5,
    #[serde(rename = "bart")]
    Bart,
    /// Encoder-decoder model assembled from two BERT checkpoints
    #[serde(rename = "bert2bert")]
    Bert2Bert,
    #[serde(rename = "big_bird_pegasus")]
    BigBirdPegasus,
    #[serde(rename = "blender_bot")]
    BlenderBot,
    /// GPT2 used as a causal language model over the concatenated source and target
    #[serde(rename = "gpt2seq")]
    Gpt2Seq,
    #[serde(rename = "bert2seq")]
    Bert2Seq,
    #[serde(rename = "roberta2seq")]
    Roberta2Seq,
}

/// # Input formatting regime
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum FormattingMode {
    /// Source and target concatenated into a single sequence, loss over the target span only
    CausalLM,
    /// Separate encoder inputs and decoder labels
    EncoderDecoder,
}

/// # Architecture-specific settings resolved once at initialization
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Architecture {
    pub model_type: ModelType,
    pub tokenizer_type: TokenizerType,
    pub mode: FormattingMode,
    /// The tokenizer has no padding token: one is registered and the embeddings are resized
    pub needs_pad_token: bool,
    /// Generation is forced to start with the tokenizer's bos token
    pub forced_bos: bool,
    /// Decoder start and padding ids are taken from the tokenizer's cls and pad tokens
    pub decoder_start_from_cls: bool,
    /// Encoder and decoder are separate checkpoints stitched together. The decoder injects its
    /// start token itself, so the leading label token is dropped.
    pub composite_encoder_decoder: bool,
}

impl ModelType {
    pub const ALL: [ModelType; 8] = [
        ModelType::T5,
        ModelType::Bart,
        ModelType::Bert2Bert,
        ModelType::BigBirdPegasus,
        ModelType::BlenderBot,
        ModelType::Gpt2Seq,
        ModelType::Bert2Seq,
        ModelType::Roberta2Seq,
    ];

    /// Identifier used in configuration files
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::T5 => "t5",
            Self::Bart => "bart",
            Self::Bert2Bert => "bert2bert",
            Self::BigBirdPegasus => "big_bird_pegasus",
            Self::BlenderBot => "blender_bot",
            Self::Gpt2Seq => "gpt2seq",
            Self::Bert2Seq => "bert2seq",
            Self::Roberta2Seq => "roberta2seq",
        }
    }

    /// Returns the architecture table entry for this model type
    pub fn architecture(&self) -> Architecture {
        use FormattingMode::*;
        use TokenizerType as Tok;
        let (tokenizer_type, mode, needs_pad_token, forced_bos, decoder_start_from_cls) = match self {
            Self::T5 => (Tok::T5, EncoderDecoder, false, false, false),
            Self::Bart => (Tok::Roberta, EncoderDecoder, false, true, false),
            Self::Bert2Bert => (Tok::Bert, EncoderDecoder, false, false, true),
            Self::BigBirdPegasus => (Tok::Pegasus, EncoderDecoder, false, false, false),
            Self::BlenderBot => (Tok::Blenderbot, EncoderDecoder, false, false, false),
            Self::Gpt2Seq => (Tok::Gpt2, CausalLM, true, false, false),
            Self::Bert2Seq => (Tok::Bert, CausalLM, false, false, false),
            Self::Roberta2Seq => (Tok::Roberta, CausalLM, false, false, false),
        };
        Architecture {
            model_type: *self,
            tokenizer_type,
            mode,
            needs_pad_token,
            forced_bos,
            decoder_start_from_cls,
            composite_encoder_decoder: *self == Self::Bert2Bert,
        }
    }
}

impl FromStr for ModelType {
    type Err = Seq2SeqError;

    /// Parses a model identifier, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let identifier = s.trim().to_lowercase();
        ModelType::ALL
            .iter()
            .find(|model_type| model_type.identifier() == identifier)
            .copied()
            .ok_or_else(|| {
                Seq2SeqError::InvalidConfigurationError(format!(
                    "Unsupported model `{}`, expected one of: {}",
                    s,
                    ModelType::ALL
                        .iter()
                        .map(|model_type| model_type.identifier())
                        .collect::<Vec<&str>>()
                        .join(", ")
                ))
            })
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
