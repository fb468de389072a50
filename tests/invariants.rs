//! Property tests for the model-level guarantees.

use decoder_rs::config::TransformerConfig;
use decoder_rs::models::decoder::DecoderOnlyTransformer;
use decoder_rs::models::traits::CausalLM;
use decoder_rs::nn::Initializer;
use decoder_rs::tensor::Tensor;
use proptest::prelude::*;

prop_compose! {
    fn arb_config()(
        num_layers in 1usize..3,
        num_heads in prop::sample::select(vec![1usize, 2, 4]),
        head_size in 1usize..4,
        vocab_size in 2usize..12,
        max_seq_len in 1usize..8,
    ) -> TransformerConfig {
        TransformerConfig::new(num_layers, num_heads, vocab_size, num_heads * head_size, max_seq_len)
            .with_dropout(0.0)
    }
}

prop_compose! {
    fn arb_case()(config in arb_config(), batch in 1usize..3, seed in any::<u64>())(
        ids in prop::collection::vec(0..config.vocab_size, batch * config.max_seq_len),
        seq in 1..=config.max_seq_len,
        config in Just(config),
        batch in Just(batch),
        seed in Just(seed),
    ) -> (TransformerConfig, usize, usize, Vec<usize>, u64) {
        (config, batch, seq, ids, seed)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Logits are always [batch, seq, vocab_size].
    #[test]
    fn output_shape((config, batch, seq, ids, seed) in arb_case()) {
        let vocab = config.vocab_size;
        let model = DecoderOnlyTransformer::<f32>::new(config, &mut Initializer::seeded(seed)).unwrap();
        let ids = Tensor::new(ids[..batch * seq].to_vec(), [batch, seq]).unwrap();

        let logits = model.forward(&ids).unwrap();
        prop_assert_eq!(logits.shape(), &[batch, seq, vocab]);
        prop_assert!(logits.data().iter().all(|v| v.is_finite()));
    }

    /// Changing token j leaves the logits at every position i < j untouched.
    #[test]
    fn causality((config, _, seq, ids, seed) in arb_case(), pick in any::<prop::sample::Index>()) {
        let vocab = config.vocab_size;
        let model = DecoderOnlyTransformer::<f32>::new(config, &mut Initializer::seeded(seed)).unwrap();

        let original = ids[..seq].to_vec();
        let j = pick.index(seq);
        let mut changed = original.clone();
        changed[j] = (changed[j] + 1) % vocab;

        let a = model.forward(&Tensor::new(original, [1, seq]).unwrap()).unwrap();
        let b = model.forward(&Tensor::new(changed, [1, seq]).unwrap()).unwrap();

        for (x, y) in a.data()[..j * vocab].iter().zip(b.data()[..j * vocab].iter()) {
            prop_assert!((x - y).abs() <= 1e-6, "{} vs {}", x, y);
        }
    }
}
