use rust_seq2seq::pipelines::common::GenerationTokenizer;
use rust_seq2seq::seq2seq::{
    Example, FormatterOptions, FormattingMode, InputFormatter, ModelType, IGNORE_INDEX,
};
use rust_seq2seq::Seq2SeqError;
use tch::Device;

const PAD: i64 = 0;
const UNK: i64 = 1;
const CLS: i64 = 2;
const SEP: i64 = 3;
const BOS: i64 = 4;
const EOS: i64 = 5;
const FIRST_WORD: i64 = 10;

#[derive(Clone, Copy)]
enum Framing {
    /// `[CLS] ids [SEP]`
    ClsSep,
    /// `ids </s>`
    EosOnly,
}

/// Whitespace tokenizer over a fixed word list, words mapped to `10 + position`
struct WordTokenizer {
    words: Vec<&'static str>,
    framing: Framing,
    has_pad: bool,
    has_cls_sep: bool,
    has_bos_eos: bool,
}

impl WordTokenizer {
    fn bert_like() -> Self {
        WordTokenizer {
            words: vec![
                "summarize", "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", ":",
                "answer", "a", "b", "c", "d", "e", "f", "g", "h",
            ],
            framing: Framing::ClsSep,
            has_pad: true,
            has_cls_sep: true,
            has_bos_eos: false,
        }
    }

    fn t5_like() -> Self {
        WordTokenizer {
            framing: Framing::EosOnly,
            has_cls_sep: false,
            has_bos_eos: true,
            ..Self::bert_like()
        }
    }

    fn id(&self, word: &str) -> i64 {
        self.words
            .iter()
            .position(|w| *w == word)
            .map_or(UNK, |position| FIRST_WORD + position as i64)
    }

    fn ids(&self, text: &str) -> Vec<i64> {
        text.split_whitespace().map(|word| self.id(word)).collect()
    }
}

impl GenerationTokenizer for WordTokenizer {
    fn encode_without_special_tokens(&self, text: &str) -> Vec<i64> {
        self.ids(text)
    }

    fn build_input_with_special_tokens(&self, token_ids: Vec<i64>) -> Vec<i64> {
        match self.framing {
            Framing::ClsSep => {
                let mut output = vec![CLS];
                output.extend(token_ids);
                output.push(SEP);
                output
            }
            Framing::EosOnly => {
                let mut output = token_ids;
                output.push(EOS);
                output
            }
        }
    }

    fn get_pad_id(&self) -> Option<i64> {
        Some(PAD).filter(|_| self.has_pad)
    }

    fn get_bos_id(&self) -> Option<i64> {
        Some(BOS).filter(|_| self.has_bos_eos)
    }

    fn get_eos_id(&self) -> Option<i64> {
        Some(EOS).filter(|_| self.has_bos_eos)
    }

    fn get_cls_id(&self) -> Option<i64> {
        Some(CLS).filter(|_| self.has_cls_sep)
    }

    fn get_sep_id(&self) -> Option<i64> {
        Some(SEP).filter(|_| self.has_cls_sep)
    }

    fn vocab_size(&self) -> i64 {
        FIRST_WORD + self.words.len() as i64
    }
}

fn causal_options(source_max_length: usize, target_max_length: usize) -> FormatterOptions {
    FormatterOptions::new(
        &ModelType::Bert2Seq.architecture(),
        source_max_length,
        target_max_length,
    )
}

fn encoder_decoder_options(
    model_type: ModelType,
    source_max_length: usize,
    target_max_length: usize,
) -> FormatterOptions {
    FormatterOptions::new(
        &model_type.architecture(),
        source_max_length,
        target_max_length,
    )
}

#[test]
fn causal_lm_masks_source_span() -> anyhow::Result<()> {
    let tokenizer = WordTokenizer::bert_like();
    let options = causal_options(32, 32).with_prompts("summarize", ":");
    let formatter = InputFormatter::new(WordTokenizer::bert_like(), options)?;

    let encoded = formatter.encode_example(&Example::new("the quick fox", "fox jumps"));

    let mut source_input = vec![CLS, tokenizer.id("summarize")];
    source_input.extend(tokenizer.ids("the quick fox"));
    source_input.extend(vec![tokenizer.id(":"), SEP]);
    let mut target_input = tokenizer.ids("fox jumps");
    target_input.push(SEP);

    let mut expected_input_ids = source_input.clone();
    expected_input_ids.extend(target_input.clone());
    assert_eq!(encoded.input_ids, expected_input_ids);

    assert!(encoded.labels[..source_input.len()]
        .iter()
        .all(|label| *label == IGNORE_INDEX));
    assert_eq!(&encoded.labels[source_input.len()..], target_input.as_slice());
    assert_eq!(encoded.attention_mask, vec![1; expected_input_ids.len()]);
    Ok(())
}

#[test]
fn causal_lm_prefers_cls_and_sep() -> anyhow::Result<()> {
    let mut tokenizer = WordTokenizer::bert_like();
    tokenizer.has_bos_eos = true;
    let formatter = InputFormatter::new(tokenizer, causal_options(16, 16))?;
    let encoded = formatter.encode_example(&Example::new("a", "b"));
    assert_eq!(encoded.input_ids, vec![CLS, 21, SEP, 22, SEP]);

    let formatter = InputFormatter::new(WordTokenizer::t5_like(), causal_options(16, 16))?;
    let encoded = formatter.encode_example(&Example::new("a", "b"));
    assert_eq!(encoded.input_ids, vec![BOS, 21, EOS, 22, EOS]);
    assert_eq!(encoded.labels, vec![IGNORE_INDEX, IGNORE_INDEX, IGNORE_INDEX, 22, EOS]);
    Ok(())
}

#[test]
fn causal_lm_truncation_reserves_prompts_and_special_tokens() -> anyhow::Result<()> {
    let options = causal_options(10, 3).with_prompts("summarize the", ":");
    let formatter = InputFormatter::new(WordTokenizer::bert_like(), options)?;
    assert_eq!(formatter.truncation_lengths(), (5, 2));

    let encoded = formatter.encode_example(&Example::new("a b c d e f g h", "a b c d"));
    // bos + 2 prefix + 5 source + 1 suffix + eos, then 2 target + eos
    assert_eq!(encoded.input_ids.len(), 10 + 3);
    assert_eq!(&encoded.input_ids[3..8], &[21, 22, 23, 24, 25]);
    assert_eq!(&encoded.labels[10..], &[21, 22, SEP]);
    Ok(())
}

#[test]
fn causal_lm_underflow_yields_empty_source() -> anyhow::Result<()> {
    let options = causal_options(3, 1).with_prompts("summarize the", ":");
    let formatter = InputFormatter::new(WordTokenizer::bert_like(), options)?;
    assert_eq!(formatter.truncation_lengths(), (0, 0));

    let encoded = formatter.encode_example(&Example::new("the quick brown fox", "lazy dog"));
    assert_eq!(encoded.input_ids, vec![CLS, 10, 11, 19, SEP, SEP]);
    assert_eq!(
        encoded.labels,
        vec![
            IGNORE_INDEX,
            IGNORE_INDEX,
            IGNORE_INDEX,
            IGNORE_INDEX,
            IGNORE_INDEX,
            SEP
        ]
    );
    Ok(())
}

#[test]
fn encoder_decoder_frames_source_and_target() -> anyhow::Result<()> {
    let tokenizer = WordTokenizer::t5_like();
    let options = encoder_decoder_options(ModelType::T5, 6, 3).with_prompts("summarize", ":");
    let formatter = InputFormatter::new(WordTokenizer::t5_like(), options)?;
    // 6 - 1 special token - 2 prompt tokens, 3 - 1 special token
    assert_eq!(formatter.truncation_lengths(), (3, 2));

    let encoded = formatter.encode_example(&Example::new("the quick brown fox", "lazy dog jumps"));

    let mut source = vec![tokenizer.id("summarize")];
    source.extend(tokenizer.ids("the quick brown"));
    source.push(tokenizer.id(":"));
    assert_eq!(
        encoded.input_ids,
        tokenizer.build_input_with_special_tokens(source)
    );
    assert_eq!(
        encoded.labels,
        tokenizer.build_input_with_special_tokens(tokenizer.ids("lazy dog"))
    );
    assert_eq!(encoded.attention_mask, vec![1; encoded.input_ids.len()]);
    Ok(())
}

#[test]
fn composite_encoder_decoder_drops_leading_label_token() -> anyhow::Result<()> {
    let tokenizer = WordTokenizer::bert_like();
    let example = Example::new("the quick brown fox", "lazy dog");

    let bart_like = InputFormatter::new(
        WordTokenizer::bert_like(),
        encoder_decoder_options(ModelType::Bart, 16, 16),
    )?;
    let bert2bert = InputFormatter::new(
        WordTokenizer::bert_like(),
        encoder_decoder_options(ModelType::Bert2Bert, 16, 16),
    )?;

    let full_labels = tokenizer.build_input_with_special_tokens(tokenizer.ids("lazy dog"));
    assert_eq!(bart_like.encode_example(&example).labels, full_labels);
    assert_eq!(bert2bert.encode_example(&example).labels, full_labels[1..].to_vec());
    assert_eq!(
        bert2bert.encode_example(&example).input_ids,
        bart_like.encode_example(&example).input_ids
    );

    let batch = bert2bert.generate_inputs(&[example.clone(), Example::new("the", "a b c")])?;
    assert_eq!(batch.labels, vec![vec![17, 18, SEP, IGNORE_INDEX], vec![21, 22, 23, SEP]]);
    Ok(())
}

#[test]
fn batch_is_right_padded_per_field() -> anyhow::Result<()> {
    let formatter = InputFormatter::new(WordTokenizer::bert_like(), causal_options(16, 16))?;
    // bos + source + eos + target + eos: lengths 5, 3 and 7
    let corpus = [
        Example::new("a", "b"),
        Example::new("", ""),
        Example::new("a b", "c d"),
    ];
    let batch = formatter.generate_inputs(&corpus)?;

    assert_eq!(batch.batch_size(), 3);
    assert_eq!(batch.input_length(), 7);
    assert_eq!(batch.label_length(), 7);
    for (row, length) in batch.attention_mask.iter().zip([5usize, 3, 7].iter()) {
        assert_eq!(row.len(), 7);
        assert!(row[..*length].iter().all(|value| *value == 1));
        assert!(row[*length..].iter().all(|value| *value == 0));
    }
    for (row, length) in batch.input_ids.iter().zip([5usize, 3, 7].iter()) {
        assert!(row[*length..].iter().all(|value| *value == PAD));
    }
    for (row, length) in batch.labels.iter().zip([5usize, 3, 7].iter()) {
        assert!(row[*length..].iter().all(|value| *value == IGNORE_INDEX));
    }
    assert_eq!(batch.input_ids[1], vec![CLS, SEP, SEP, PAD, PAD, PAD, PAD]);
    Ok(())
}

#[test]
fn encoder_decoder_labels_padded_independently() -> anyhow::Result<()> {
    let formatter = InputFormatter::new(
        WordTokenizer::bert_like(),
        encoder_decoder_options(ModelType::Bart, 32, 32),
    )?;
    let corpus = [
        Example::new("a b c", "d"),
        Example::new("a", "d e f g"),
    ];
    let batch = formatter.generate_inputs(&corpus)?;

    assert_eq!(batch.input_length(), 5);
    assert_eq!(batch.label_length(), 6);
    assert_eq!(batch.input_ids[1], vec![CLS, 21, SEP, PAD, PAD]);
    assert_eq!(batch.attention_mask[1], vec![1, 1, 1, 0, 0]);
    assert_eq!(
        batch.labels[0],
        vec![CLS, 24, SEP, IGNORE_INDEX, IGNORE_INDEX, IGNORE_INDEX]
    );
    Ok(())
}

#[test]
fn encoded_lengths_are_consistent() -> anyhow::Result<()> {
    let corpus = [
        Example::new("the quick brown fox jumps over the lazy dog", "fox"),
        Example::new("", "the lazy dog"),
        Example::new("unknown words here", ""),
    ];
    for model_type in ModelType::ALL.iter() {
        let architecture = model_type.architecture();
        let options = FormatterOptions::new(&architecture, 8, 4).with_prompts("summarize", ":");
        let formatter = InputFormatter::new(WordTokenizer::bert_like(), options)?;
        for example in corpus.iter() {
            let encoded = formatter.encode_example(example);
            assert_eq!(encoded.input_ids.len(), encoded.attention_mask.len());
            if architecture.mode == FormattingMode::CausalLM {
                assert_eq!(encoded.input_ids.len(), encoded.labels.len());
            } else {
                assert!(encoded.input_ids.len() <= 8);
                assert!(!encoded.labels.contains(&IGNORE_INDEX));
            }
        }
    }
    Ok(())
}

#[test]
fn formatting_is_deterministic() -> anyhow::Result<()> {
    let options = causal_options(12, 6).with_prompts("summarize", ":");
    let formatter = InputFormatter::new(WordTokenizer::bert_like(), options)?;
    let corpus = [
        Example::new("the quick brown fox", "jumps"),
        Example::from(("over the lazy dog", "dog")),
    ];

    let first = formatter.generate_inputs(&corpus)?;
    let second = formatter.generate_inputs(&corpus)?;
    assert_eq!(first, second);

    let first = first.to_tensors(Device::Cpu)?;
    let second = second.to_tensors(Device::Cpu)?;
    assert!(first.input_ids.equal(&second.input_ids));
    assert!(first.labels.equal(&second.labels));
    Ok(())
}

#[test]
fn batch_tensors_have_padded_shapes() -> anyhow::Result<()> {
    let formatter = InputFormatter::new(
        WordTokenizer::bert_like(),
        encoder_decoder_options(ModelType::Bart, 32, 32),
    )?;
    let corpus = [Example::new("a b c", "d"), Example::new("a", "d e f g")];
    let inputs = formatter.generate_inputs(&corpus)?.to_tensors(Device::Cpu)?;

    assert_eq!(inputs.input_ids.size(), vec![2, 5]);
    assert_eq!(inputs.attention_mask.size(), vec![2, 5]);
    assert_eq!(inputs.labels.size(), vec![2, 6]);
    assert_eq!(inputs.labels.int64_value(&[0, 5]), IGNORE_INDEX);
    assert_eq!(inputs.attention_mask.int64_value(&[1, 2]), 1);
    assert_eq!(inputs.attention_mask.int64_value(&[1, 3]), 0);
    Ok(())
}

#[test]
fn invalid_settings_are_rejected() {
    let empty_corpus = InputFormatter::new(WordTokenizer::bert_like(), causal_options(8, 8))
        .unwrap()
        .generate_inputs(&[]);
    assert!(matches!(empty_corpus, Err(Seq2SeqError::ValueError(_))));

    let zero_length = InputFormatter::new(WordTokenizer::bert_like(), causal_options(0, 8));
    assert!(matches!(
        zero_length,
        Err(Seq2SeqError::InvalidConfigurationError(_))
    ));

    let mut no_pad = WordTokenizer::bert_like();
    no_pad.has_pad = false;
    assert!(matches!(
        InputFormatter::new(no_pad, causal_options(8, 8)),
        Err(Seq2SeqError::InvalidConfigurationError(_))
    ));

    let mut no_pad = WordTokenizer::bert_like();
    no_pad.has_pad = false;
    assert!(InputFormatter::new(no_pad, causal_options(8, 8).with_pad_token_id(99)).is_ok());

    let mut no_specials = WordTokenizer::t5_like();
    no_specials.has_bos_eos = false;
    assert!(matches!(
        InputFormatter::new(no_specials, causal_options(8, 8)),
        Err(Seq2SeqError::InvalidConfigurationError(_))
    ));
}
