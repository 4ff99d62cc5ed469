use lmharness_core::dummy::{EOT, VOCAB_SIZE};
use lmharness_core::{known_models, load, resolve, BatchSize, Device, Error, ModelArgs, Token};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn cpu_args(extra: &str) -> ModelArgs {
    let mut args = ModelArgs::from_arg_string(extra).unwrap();
    args.device = "cpu".into();
    args
}

#[test]
fn every_known_identifier_resolves() {
    let names = known_models();
    assert_eq!(
        names,
        vec!["bloomz-cpp", "dummy", "gpt2", "hf", "hf-causal", "llama-cpp"]
    );
    for name in names {
        assert!(resolve(name).is_ok(), "{name} should resolve");
    }
}

#[test]
fn unknown_identifiers_are_lookup_errors() {
    for name in ["gpt-3", "textsynth", "llama", "Dummy"] {
        match resolve(name) {
            Err(Error::Lookup(n)) => assert_eq!(n, name),
            _ => panic!("{name} should not resolve"),
        }
    }
    assert!(matches!(
        load("nope", &ModelArgs::default()),
        Err(Error::Lookup(_))
    ));
}

#[test]
fn forward_returns_one_row_per_position() {
    init_tracing();
    let mut lm = load("dummy", &cpu_args("")).unwrap();
    let ids = lm.encode("hello").unwrap();
    let logits = lm.forward(&[ids.clone()]).unwrap();
    assert_eq!(logits.dims(), (1, ids.len(), VOCAB_SIZE));
    assert_eq!(logits.argmax(0, 0), Token(b'i' as i32));

    let two = lm.forward(&[ids.clone(), ids]).unwrap();
    assert_eq!(two.dims().0, 2);
}

#[test]
fn forward_rejects_ragged_or_empty_batches() {
    let mut lm = load("dummy", &cpu_args("")).unwrap();
    assert!(matches!(lm.forward(&[]), Err(Error::Config(_))));
    let ragged = vec![vec![Token(1)], vec![Token(1), Token(2)]];
    assert!(matches!(lm.forward(&ragged), Err(Error::Config(_))));
}

#[test]
fn generation_stops_at_the_stop_token() {
    let mut lm = load("dummy", &cpu_args("")).unwrap();
    let ctx = lm.encode("abc").unwrap();
    let stop = Token(b'f' as i32);

    let out = lm.generate(&ctx, 64, Some(stop)).unwrap();
    assert_eq!(lm.decode(&out).unwrap(), "abcdef");
    assert_eq!(out.iter().position(|&t| t == stop), Some(out.len() - 1));
}

#[test]
fn generation_respects_max_length() {
    let mut lm = load("dummy", &cpu_args("")).unwrap();
    let ctx = lm.encode("abc").unwrap();

    assert_eq!(lm.generate(&ctx, 5, None).unwrap().len(), 5);
    // a max_length shorter than the context yields the context unchanged
    assert_eq!(lm.generate(&ctx, 1, None).unwrap(), ctx);
    assert!(matches!(lm.generate(&[], 5, None), Err(Error::Config(_))));
}

#[test]
fn metadata_is_exposed_uniformly() {
    let lm = load("dummy", &cpu_args("batch_size=4")).unwrap();
    assert_eq!(lm.eot_token(), EOT);
    assert_eq!(lm.max_gen_toks(), 256);
    assert!(lm.max_length() > 0);
    assert_eq!(lm.batch_size().fixed(), Some(4));
    assert_eq!(lm.device(), Device::Cpu);

    let text = "round trip";
    assert_eq!(lm.decode(&lm.encode(text).unwrap()).unwrap(), text);
}

#[test]
fn auto_batch_size_is_preserved() {
    let lm = load("dummy", &cpu_args("batch_size=auto")).unwrap();
    assert_eq!(lm.batch_size(), BatchSize::Auto);

    for bad in ["batch_size=0", "batch_size=-2", "batch_size=big"] {
        assert!(matches!(
            ModelArgs::from_arg_string(bad),
            Err(Error::Config(_))
        ));
    }
}

#[test]
fn unavailable_devices_fall_back() {
    init_tracing();
    let args = ModelArgs {
        device: "cuda:4096".into(),
        ..ModelArgs::default()
    };
    let lm = load("dummy", &args).unwrap();
    assert_ne!(lm.device(), Device::Cuda(4096));

    let args = ModelArgs {
        device: "not-a-device".into(),
        ..ModelArgs::default()
    };
    assert!(load("dummy", &args).is_ok());
}

#[test]
fn backends_report_load_errors_for_bad_sources() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.gguf");
    let args = cpu_args(&format!("pretrained={}", missing.display()));
    for name in ["llama-cpp", "bloomz-cpp"] {
        assert!(
            matches!(load(name, &args), Err(Error::Load(_))),
            "{name} should fail to load"
        );
    }

    let args = cpu_args(&format!("pretrained={}", dir.path().display()));
    assert!(matches!(load("hf", &args), Err(Error::Load(_))));
}
