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
use crate::pipelines::common::{GenerationTokenizer, TokenizerOption};
use crate::resources::{resource_for_file, ResourceProvider};
use crate::seq2seq::architecture::{Architecture, FormattingMode, ModelType};
use crate::seq2seq::input_formatter::{
    Example, FormatterOptions, InputFormatter, Seq2SeqBatch, Seq2SeqInputs,
};
use crate::Config;
use log::info;
use serde::{Deserialize, Serialize};
use tch::{nn, Device, Tensor};

/// # Configuration for fine-tuning a pretrained generation model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformersConfig {
    /// Architecture identifier (e.g. `bart`, `gpt2seq`), case insensitive
    pub model: String,
    /// Local directory or remote base URL holding the pretrained checkpoint
    pub pretrained_model_path: String,
    #[serde(default)]
    pub prefix_prompt: Option<String>,
    #[serde(default)]
    pub suffix_prompt: Option<String>,
    pub source_max_length: usize,
    pub target_max_length: usize,
}

impl Config for TransformersConfig {}

impl TransformersConfig {
    pub fn new<S: Into<String>>(
        model: S,
        pretrained_model_path: S,
        source_max_length: usize,
        target_max_length: usize,
    ) -> TransformersConfig {
        TransformersConfig {
            model: model.into(),
            pretrained_model_path: pretrained_model_path.into(),
            prefix_prompt: None,
            suffix_prompt: None,
            source_max_length,
            target_max_length,
        }
    }

    pub fn model_type(&self) -> Result<ModelType, Seq2SeqError> {
        self.model.parse()
    }

    /// Formatter options for this configuration, prompts defaulting to empty strings
    pub fn formatter_options(&self, architecture: &Architecture) -> FormatterOptions {
        FormatterOptions::new(
            architecture,
            self.source_max_length,
            self.target_max_length,
        )
        .with_prompts(
            self.prefix_prompt.clone().unwrap_or_default(),
            self.suffix_prompt.clone().unwrap_or_default(),
        )
    }
}

/// # Optional tokenizer settings shipped with a pretrained checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenizerConfig {
    #[serde(default)]
    pub do_lower_case: Option<bool>,
}

impl Config for TokenizerConfig {}

/// # Model settings derived from the architecture table and the tokenizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    pub model_type: ModelType,
    /// The model is used as a causal decoder over the concatenated sequence
    pub is_decoder: bool,
    /// Vocabulary size after registering any missing special token
    pub vocab_size: i64,
    pub pad_token_id: Option<i64>,
    /// A padding token was appended to the vocabulary: embeddings must be resized
    pub added_pad_token: bool,
    pub forced_bos_token_id: Option<i64>,
    pub decoder_start_token_id: Option<i64>,
}

impl ModelSettings {
    /// Applies the architecture fixups to the tokenizer special tokens.
    pub fn resolve<T: GenerationTokenizer>(
        architecture: &Architecture,
        tokenizer: &T,
    ) -> Result<ModelSettings, Seq2SeqError> {
        let missing_token = |token: &str| {
            Seq2SeqError::InvalidConfigurationError(format!(
                "{} requires a {} token but the tokenizer does not define one",
                architecture.model_type, token
            ))
        };

        let mut vocab_size = tokenizer.vocab_size();
        let mut pad_token_id = tokenizer.get_pad_id();
        let mut added_pad_token = false;
        if architecture.needs_pad_token && pad_token_id.is_none() {
            pad_token_id = Some(vocab_size);
            vocab_size += 1;
            added_pad_token = true;
        }

        let forced_bos_token_id = if architecture.forced_bos {
            Some(tokenizer.get_bos_id().ok_or_else(|| missing_token("bos"))?)
        } else {
            None
        };

        let decoder_start_token_id = if architecture.decoder_start_from_cls {
            pad_token_id = Some(tokenizer.get_pad_id().ok_or_else(|| missing_token("pad"))?);
            Some(tokenizer.get_cls_id().ok_or_else(|| missing_token("cls"))?)
        } else {
            None
        };

        Ok(ModelSettings {
            model_type: architecture.model_type,
            is_decoder: architecture.mode == FormattingMode::CausalLM,
            vocab_size,
            pad_token_id,
            added_pad_token,
            forced_bos_token_id,
            decoder_start_token_id,
        })
    }
}

/// # Pretrained model that can be fine-tuned on formatted batches
///
/// Implementors wrap a concrete architecture. The forward pass receives the padded batch tensors
/// and returns the scalar training loss (see `lm_loss`).
pub trait TrainableModel: Sized {
    /// Loads a pretrained checkpoint (configuration and `rust_model.ot` weights) from a location,
    /// applying the model settings (special token ids, decoder mode).
    fn from_pretrained(
        location: &str,
        settings: &ModelSettings,
        device: Device,
    ) -> Result<(Self, nn::VarStore), Seq2SeqError>;

    /// Assembles an encoder-decoder model from an encoder and a decoder checkpoint.
    fn from_encoder_decoder_pretrained(
        _encoder_location: &str,
        _decoder_location: &str,
        settings: &ModelSettings,
        _device: Device,
    ) -> Result<(Self, nn::VarStore), Seq2SeqError> {
        Err(Seq2SeqError::InvalidConfigurationError(format!(
            "{} cannot be assembled from separate encoder and decoder checkpoints",
            settings.model_type
        )))
    }

    /// Resizes the token embeddings (and tied output projection) to `new_num_tokens`, keeping
    /// the pretrained rows.
    fn resize_token_embeddings(
        &mut self,
        p: &nn::Path,
        new_num_tokens: i64,
    ) -> Result<(), Seq2SeqError>;

    /// Forward pass returning the loss for a batch
    fn forward_t(&self, inputs: &Seq2SeqInputs, train: bool) -> Result<Tensor, Seq2SeqError>;
}

/// # Pretrained generation model wired to its input formatter
pub struct Seq2SeqTransformer<M: TrainableModel> {
    architecture: Architecture,
    settings: ModelSettings,
    formatter: InputFormatter<TokenizerOption>,
    model: M,
    var_store: nn::VarStore,
}

impl<M: TrainableModel> Seq2SeqTransformer<M> {
    /// Build a new `Seq2SeqTransformer`
    ///
    /// # Arguments
    ///
    /// * `config` - `TransformersConfig` selecting the architecture, checkpoint and formatting
    /// * `device` - `Device` to place the model and batches on
    ///
    /// # Example
    ///
    /// ```no_run
    /// # fn main() -> anyhow::Result<()> {
    /// # use rust_seq2seq::seq2seq::{ModelSettings, Seq2SeqInputs, TrainableModel};
    /// # use rust_seq2seq::Seq2SeqError;
    /// # use tch::{nn, Device, Tensor};
    /// # struct MyModel;
    /// # impl TrainableModel for MyModel {
    /// #     fn from_pretrained(_: &str, _: &ModelSettings, device: Device) -> Result<(Self, nn::VarStore), Seq2SeqError> { Ok((MyModel, nn::VarStore::new(device))) }
    /// #     fn resize_token_embeddings(&mut self, _: &nn::Path, _: i64) -> Result<(), Seq2SeqError> { Ok(()) }
    /// #     fn forward_t(&self, inputs: &Seq2SeqInputs, _: bool) -> Result<Tensor, Seq2SeqError> { Ok(Tensor::from(0f64)) }
    /// # }
    /// use rust_seq2seq::seq2seq::{Example, Seq2SeqTransformer, TransformersConfig};
    /// use rust_seq2seq::Config;
    ///
    /// let config = TransformersConfig::from_file("path/to/training_config.json")?;
    /// let model: Seq2SeqTransformer<MyModel> = Seq2SeqTransformer::new(&config, Device::cuda_if_available())?;
    /// let loss = model.forward(&[Example::new("source text", "target text")], true)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        config: &TransformersConfig,
        device: Device,
    ) -> Result<Seq2SeqTransformer<M>, Seq2SeqError> {
        let model_type = config.model_type()?;
        let architecture = model_type.architecture();
        let location = config.pretrained_model_path.as_str();
        info!(
            "Initializing {} ({:?}) from {}",
            model_type, architecture.mode, location
        );

        let lower_case = load_tokenizer_config(location)
            .and_then(|tokenizer_config| tokenizer_config.do_lower_case)
            .unwrap_or(false);
        let tokenizer =
            TokenizerOption::from_pretrained(architecture.tokenizer_type, location, lower_case)?;
        let settings = ModelSettings::resolve(&architecture, &tokenizer)?;

        let (mut model, var_store) = if architecture.composite_encoder_decoder {
            M::from_encoder_decoder_pretrained(location, location, &settings, device)?
        } else {
            M::from_pretrained(location, &settings, device)?
        };
        if settings.added_pad_token {
            info!(
                "Registered padding token {:?}, resizing token embeddings to {}",
                settings.pad_token_id, settings.vocab_size
            );
            model.resize_token_embeddings(&var_store.root(), settings.vocab_size)?;
        }

        let mut options = config.formatter_options(&architecture);
        if let Some(pad_token_id) = settings.pad_token_id {
            options = options.with_pad_token_id(pad_token_id);
        }
        let formatter = InputFormatter::new(tokenizer, options)?;

        Ok(Seq2SeqTransformer {
            architecture,
            settings,
            formatter,
            model,
            var_store,
        })
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn formatter(&self) -> &InputFormatter<TokenizerOption> {
        &self.formatter
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn var_store(&self) -> &nn::VarStore {
        &self.var_store
    }

    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.var_store
    }

    /// Formats a corpus into a padded batch
    pub fn generate_inputs(&self, corpus: &[Example]) -> Result<Seq2SeqBatch, Seq2SeqError> {
        self.formatter.generate_inputs(corpus)
    }

    /// Formats a corpus and runs the model forward pass, returning the loss.
    pub fn forward(&self, corpus: &[Example], train: bool) -> Result<Tensor, Seq2SeqError> {
        let inputs = self
            .generate_inputs(corpus)?
            .to_tensors(self.var_store.device())?;
        self.model.forward_t(&inputs, train)
    }
}

fn load_tokenizer_config(location: &str) -> Option<TokenizerConfig> {
    let path = resource_for_file(location, "tokenizer_config.json")
        .get_local_path()
        .ok()?;
    if !path.is_file() {
        return None;
    }
    TokenizerConfig::from_file(path).ok()
}
