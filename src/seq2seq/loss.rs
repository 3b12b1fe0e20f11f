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
use crate::seq2seq::input_formatter::IGNORE_INDEX;
use tch::kind::Kind::Float;
use tch::{Reduction, Tensor};

/// Mean token-level cross-entropy between language modelling logits and labels.
///
/// Positions labelled with `IGNORE_INDEX` do not contribute to the loss.
///
/// # Arguments
///
/// * `logits` - Tensor of shape (*batch size*, *sequence_length*, *vocab_size*)
/// * `labels` - Tensor of shape (*batch size*, *sequence_length*)
/// * `shift` - predict token `t + 1` from position `t` (causal language models). When false,
/// logits and labels are aligned position by position (encoder-decoder models fed with
/// right-shifted decoder inputs).
///
/// # Example
///
/// ```no_run
/// use rust_seq2seq::seq2seq::lm_loss;
/// use tch::{Device, Kind, Tensor};
/// # fn main() -> anyhow::Result<()> {
/// let logits = Tensor::rand(&[2, 5, 100], (Kind::Float, Device::Cpu));
/// let labels = Tensor::of_slice(&[-100i64, -100, 3, 4, 5, -100, 7, 8, 9, -100]).view((2, 5));
/// let loss = lm_loss(&logits, &labels, true)?;
/// # Ok(())
/// # }
/// ```
pub fn lm_loss(logits: &Tensor, labels: &Tensor, shift: bool) -> Result<Tensor, Seq2SeqError> {
    let logits_size = logits.size();
    if logits_size.len() != 3 {
        return Err(Seq2SeqError::ValueError(format!(
            "Expected logits of shape (batch size, sequence length, vocab size), got {:?}",
            logits_size
        )));
    }
    let (sequence_length, vocab_size) = (logits_size[1], logits_size[2]);
    if labels.size().as_slice() != &logits_size[..2] {
        return Err(Seq2SeqError::ValueError(format!(
            "Labels of shape {:?} do not match logits of shape {:?}",
            labels.size(),
            logits_size
        )));
    }

    let (logits, labels) = if shift {
        if sequence_length < 2 {
            return Err(Seq2SeqError::ValueError(
                "Shifted loss requires sequences of at least 2 tokens".to_string(),
            ));
        }
        (
            logits.narrow(1, 0, sequence_length - 1),
            labels.narrow(1, 1, sequence_length - 1),
        )
    } else {
        (logits.shallow_clone(), labels.shallow_clone())
    };

    Ok(logits
        .contiguous()
        .view((-1, vocab_size))
        .log_softmax(-1, Float)
        .g_nll_loss::<Tensor>(
            &labels.contiguous().view(-1),
            None,
            Reduction::Mean,
            IGNORE_INDEX,
        ))
}
