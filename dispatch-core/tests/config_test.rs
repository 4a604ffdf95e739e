use dispatch_core::{
    BatchPlan, Cluster, ConfigError, DispatchConfig, DispatchMode, RetryConfig, StaticSigner,
    TransferSigner,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_defaults_when_sections_missing() {
    let config = DispatchConfig::parse("").unwrap();

    assert_eq!(config.network.cluster, Cluster::Devnet);
    assert_eq!(config.network.endpoint(), "https://api.devnet.solana.com");
    assert_eq!(config.policy, RetryConfig::default());
    assert_eq!(config.scheduler, DispatchMode::Sequential);
    assert_eq!(config.batch.transactions_per_address, 1);
}

#[test]
fn test_full_config() {
    let toml = r#"
        [network]
        cluster = "mainnet"

        [policy]
        max_retries = 8
        rate_limit_base_delay_ms = 500

        [scheduler]
        mode = "concurrent"
        max_in_flight = 4

        [batch]
        amount = 0.25
        transactions_per_address = 2
        delay_seconds = 3
    "#;
    let config = DispatchConfig::parse(toml).unwrap();

    assert_eq!(
        config.network.endpoint(),
        "https://api.mainnet-beta.solana.com"
    );
    assert_eq!(config.policy.max_retries, 8);
    assert_eq!(config.policy.rate_limit_base_delay_ms, 500);
    assert_eq!(config.policy.transient_delay_ms, 1000);
    assert_eq!(config.scheduler, DispatchMode::bounded(4));

    let plan = BatchPlan::from_config(&config.batch).unwrap();
    assert_eq!(plan.amount(), 250_000_000);

    let signers: Vec<Arc<dyn TransferSigner>> = vec![Arc::new(StaticSigner::new("k"))];
    let requests = plan
        .build(&signers, &vec!["a".to_string(), "b".to_string()])
        .unwrap();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].inter_request_delay(), Duration::from_secs(3));
}

#[test]
fn test_rpc_url_override() {
    let config = DispatchConfig::parse(
        r#"
        [network]
        cluster = "testnet"
        rpc_url = "http://127.0.0.1:8899"
        "#,
    )
    .unwrap();
    assert_eq!(config.network.endpoint(), "http://127.0.0.1:8899");
    assert_eq!(Cluster::Testnet.rpc_url(), "https://api.testnet.solana.com");
}

#[test]
fn test_invalid_values_rejected() {
    let bad_url = DispatchConfig::parse("[network]\nrpc_url = \"localhost:8899\"\n").unwrap_err();
    assert_eq!(
        bad_url.downcast_ref::<ConfigError>(),
        Some(&ConfigError::InvalidRpcUrl {
            url: "localhost:8899".to_string()
        })
    );

    for toml in [
        "[policy]\nmax_retries = 0\n",
        "[scheduler]\nmode = \"concurrent\"\nmax_in_flight = 0\n",
        "[batch]\namount = 0.0\n",
        "[batch]\ntransactions_per_address = 0\n",
    ] {
        let err = DispatchConfig::parse(toml).unwrap_err();
        assert!(
            matches!(
                err.downcast_ref::<ConfigError>(),
                Some(ConfigError::InvalidValue { .. })
            ),
            "{} -> {:?}",
            toml,
            err
        );
    }
}

#[test]
fn test_unknown_mode_is_parse_error() {
    let err = DispatchConfig::parse("[scheduler]\nmode = \"parallel\"\n").unwrap_err();
    assert!(err.to_string().contains("Failed to parse config TOML"));
}

#[test]
fn test_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[policy]\nmax_retries = 3\n[scheduler]\nmode = \"sequential\"").unwrap();

    let config = DispatchConfig::from_path(file.path()).unwrap();
    assert_eq!(config.policy.max_retries, 3);
    assert_eq!(config.scheduler, DispatchMode::Sequential);

    let missing = DispatchConfig::from_path("/nonexistent/dispatch.toml").unwrap_err();
    assert!(missing.to_string().contains("Failed to read config"));
}

#[test]
fn test_example_config_parses() {
    let config = DispatchConfig::parse(include_str!("../config/dispatch.example.toml")).unwrap();
    assert_eq!(config.scheduler, DispatchMode::bounded(8));
    assert_eq!(config.batch.delay_seconds, 2);
}
