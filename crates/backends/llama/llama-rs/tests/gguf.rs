use llama_rs::{BloomzCppLm, LlamaCppLm, LlamaParams};
use lmharness_abi::{Device, Error, LanguageModel, ModelArgs, Token};

fn gguf_args() -> ModelArgs {
    ModelArgs {
        device: "cpu".into(),
        pretrained: std::env::var("LMHARNESS_TEST_GGUF").expect("LMHARNESS_TEST_GGUF"),
        ..ModelArgs::default()
    }
}

#[test]
fn missing_model_file_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let args = ModelArgs {
        pretrained: dir.path().join("nope.gguf").to_string_lossy().into_owned(),
        ..ModelArgs::default()
    };
    assert!(matches!(LlamaCppLm::new(&args), Err(Error::Load(_))));
    assert!(matches!(BloomzCppLm::new(&args), Err(Error::Load(_))));
}

#[test]
fn default_params_are_sane() {
    let p = LlamaParams::default();
    assert_eq!(p.n_ctx, 2048);
    assert_eq!(p.n_batch, 512);
    assert!(p.n_threads >= 1);
}

#[test]
#[ignore = "needs a GGUF model in LMHARNESS_TEST_GGUF"]
fn forward_scores_every_position() {
    let mut lm = LlamaCppLm::new(&gguf_args()).unwrap();
    assert_eq!(lm.device(), Device::Cpu);

    let ids = lm.encode("Hello, my name is").unwrap();
    let logits = lm.forward(&[ids.clone(), ids.clone()]).unwrap();
    let (b, s, v) = logits.dims();
    assert_eq!((b, s), (2, ids.len()));
    assert!(v > 0);
    // identical rows evaluated from a clean cache agree
    assert_eq!(logits.argmax(0, s - 1), logits.argmax(1, s - 1));
}

#[test]
#[ignore = "needs a GGUF model in LMHARNESS_TEST_GGUF"]
fn generate_matches_forward_and_honours_stop() {
    let mut lm = LlamaCppLm::new(&gguf_args()).unwrap();
    let ids = lm.encode("The capital of France is").unwrap();

    let greedy = lm.forward(&[ids.clone()]).unwrap().argmax(0, ids.len() - 1);
    let out = lm.generate(&ids, ids.len() + 16, Some(greedy)).unwrap();
    assert_eq!(&out[..ids.len()], ids.as_slice());
    assert_eq!(out[ids.len()..], [greedy]);

    let capped = lm.generate(&ids, ids.len() + 3, None).unwrap();
    assert!(capped.len() <= ids.len() + 3);
    assert!(lm.generate(&ids, 1, None).unwrap() == ids);
}

#[test]
#[ignore = "needs a GGUF model in LMHARNESS_TEST_GGUF"]
fn generation_without_stop_ends_at_end_of_text() {
    let mut lm = LlamaCppLm::new(&gguf_args()).unwrap();
    let eot = lm.eot_token();
    let ids = lm.encode("Q: What is 2 + 2?\nA:").unwrap();

    let out = lm.generate(&ids, ids.len() + 64, None).unwrap();
    assert_eq!(&out[..ids.len()], ids.as_slice());
    if let Some(i) = out[ids.len()..].iter().position(|&t| t == eot) {
        assert_eq!(out.len(), ids.len() + i + 1);
    }
    assert_eq!(lm.generate(&ids, ids.len() + 64, Some(eot)).unwrap(), out);
}

#[test]
#[ignore = "needs a GGUF model in LMHARNESS_TEST_GGUF"]
fn bloomz_uses_the_native_vocabulary() {
    let mut args = gguf_args();
    args.tokenizer = Some("/does/not/matter".into());
    let lm = BloomzCppLm::new(&args).unwrap();

    let ids = lm.encode("translate to French: cat").unwrap();
    assert!(!ids.is_empty());
    assert!(lm.decode(&ids).unwrap().contains("cat"));
    assert_ne!(lm.eot_token(), Token(-1));
    assert!(lm.max_length() > 0);
}
