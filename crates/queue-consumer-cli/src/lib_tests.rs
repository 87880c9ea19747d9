//! Tests for the queue-consumer-cli library module.

use super::*;
use queue_consumer::{FixedConnections, InMemoryBackend, ProviderConfig, TopicName};
use std::io::Write;

fn parse(args: &[&str]) -> Cli {
    let mut full = vec!["queue-consumer"];
    full.extend_from_slice(args);
    Cli::try_parse_from(full).unwrap()
}

fn test_config() -> Configuration {
    Configuration::new()
        .with_environment("test")
        .with_provider(ProviderConfig::InMemory)
        .with_idle_timeout(0)
        .with_wait_time_seconds(0)
}

/// Run one command line against a fresh runtime sharing `backend`
async fn run(
    backend: &Arc<InMemoryBackend>,
    config: Configuration,
    args: &[&str],
) -> (Result<(), CliError>, Vec<String>) {
    let cli = parse(args);
    let config = apply_overrides(config, &cli);
    let runtime = Arc::new(QueueRuntime::with_factory(Arc::new(
        FixedConnections::in_memory(backend.clone()),
    )));
    let output = Output::captured();

    let result = execute(cli.command, config, runtime, &output).await;
    (result, output.lines())
}

// ============================================================================
// Parsing Tests
// ============================================================================

mod parsing_tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = parse(&["count", "--consumer", "OrderEvents", "--format", "json"]);

        match cli.command {
            Commands::Count { queue, format } => {
                assert_eq!(queue.consumer, "OrderEvents");
                assert_eq!(queue.queue_name, None);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("Expected Count command, got {:?}", other),
        }
        assert_eq!(cli.log_level, "info");
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_global_arguments_after_subcommand() {
        let cli = parse(&[
            "name",
            "--consumer",
            "OrderEvents",
            "--environment",
            "staging",
            "--json-logs",
        ]);

        assert_eq!(cli.environment.as_deref(), Some("staging"));
        assert!(cli.json_logs);
    }

    #[test]
    fn test_send_parses_options() {
        let cli = parse(&[
            "send",
            "--consumer",
            "OrderEvents",
            "--queue-name",
            "orders",
            "--delay-seconds",
            "30",
            "-a",
            "source=web",
            "--attribute",
            "trace=a=b",
            "hello",
        ]);

        match cli.command {
            Commands::Send {
                queue,
                body,
                delay_seconds,
                attributes,
                format,
            } => {
                assert_eq!(queue.queue_name.as_deref(), Some("orders"));
                assert_eq!(body, "hello");
                assert_eq!(delay_seconds, Some(30));
                assert_eq!(
                    attributes,
                    vec![
                        ("source".to_string(), "web".to_string()),
                        ("trace".to_string(), "a=b".to_string()),
                    ]
                );
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("Expected Send command, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_attribute_is_rejected() {
        let result = Cli::try_parse_from([
            "queue-consumer",
            "send",
            "--consumer",
            "OrderEvents",
            "-a",
            "no-separator",
            "hello",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn test_queue_commands_require_consumer() {
        let result = Cli::try_parse_from(["queue-consumer", "exists"]);

        assert!(result.is_err());
    }

    #[test]
    fn test_notify_parsing() {
        let cli = parse(&["notify", "alerts", "disk full", "--subject", "Alert", "--full-name"]);

        match cli.command {
            Commands::Notify {
                topic,
                message,
                subject,
                full_name,
            } => {
                assert_eq!(topic, "alerts");
                assert_eq!(message, "disk full");
                assert_eq!(subject.as_deref(), Some("Alert"));
                assert!(full_name);
            }
            other => panic!("Expected Notify command, got {:?}", other),
        }
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

mod configuration_tests {
    use super::*;

    #[test]
    fn test_overrides_apply_environment_and_idle_timeout() {
        let cli = parse(&[
            "receive",
            "--consumer",
            "OrderEvents",
            "--idle-timeout",
            "3",
            "-e",
            "prod",
        ]);

        let config = apply_overrides(Configuration::new().with_environment("dev"), &cli);

        assert_eq!(config.environment(), Some("prod"));
        assert_eq!(config.idle_timeout_seconds, 3);
    }

    #[test]
    fn test_overrides_keep_loaded_values() {
        let cli = parse(&["name", "--consumer", "OrderEvents"]);

        let config = apply_overrides(Configuration::new().with_environment("dev"), &cli);

        assert_eq!(config.environment(), Some("dev"));
    }

    #[test]
    fn test_build_configuration_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "environment: staging").unwrap();
        writeln!(file, "idle_timeout: 4").unwrap();
        writeln!(file, "provider:").unwrap();
        writeln!(file, "  type: in_memory").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cli = parse(&["--config", &path, "name", "--consumer", "OrderEvents"]);

        let config = build_configuration(&cli).unwrap();

        assert_eq!(config.environment(), Some("staging"));
        assert_eq!(config.idle_timeout_seconds, 4);
        assert_eq!(config.provider, ProviderConfig::InMemory);
    }

    #[test]
    fn test_missing_config_file_is_a_configuration_error() {
        let cli = parse(&[
            "--config",
            "/nonexistent/queue-consumer.yaml",
            "name",
            "--consumer",
            "OrderEvents",
        ]);

        let err = build_configuration(&cli).unwrap_err();

        assert!(matches!(err, CliError::Configuration(_)));
        assert_eq!(err.exit_code(), 1);
    }
}

// ============================================================================
// Exit Code Tests
// ============================================================================

mod exit_code_tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(CliError::Queue(QueueError::EnvironmentNotSet).exit_code(), 1);
        assert_eq!(CliError::Queue(QueueError::NotConfigured).exit_code(), 1);
        assert_eq!(
            CliError::Queue(QueueError::NotImplemented {
                consumer: "OrderEvents".to_string()
            })
            .exit_code(),
            2
        );
        assert_eq!(
            CliError::CommandFailed {
                message: "x".to_string()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            CliError::InvalidArgument {
                arg: "a".to_string(),
                message: "b".to_string()
            }
            .exit_code(),
            4
        );
        assert_eq!(
            CliError::Io(std::io::Error::other("disk")).exit_code(),
            5
        );
    }
}

// ============================================================================
// Command Tests
// ============================================================================

mod command_tests {
    use super::*;

    #[tokio::test]
    async fn test_name_prints_resolved_queue_name() {
        let backend = Arc::new(InMemoryBackend::default());

        let (result, lines) = run(&backend, test_config(), &["name", "--consumer", "OrderEvents"]).await;
        result.unwrap();
        assert_eq!(lines, vec!["order_events_test".to_string()]);

        let (result, lines) = run(
            &backend,
            test_config(),
            &["name", "--consumer", "OrderEvents", "--queue-name", "orders"],
        )
        .await;
        result.unwrap();
        assert_eq!(lines, vec!["orders_test".to_string()]);
    }

    #[tokio::test]
    async fn test_name_without_environment_fails_with_configuration_code() {
        let backend = Arc::new(InMemoryBackend::default());
        let config = Configuration::new().with_provider(ProviderConfig::InMemory);

        let (result, _) = run(&backend, config, &["name", "--consumer", "OrderEvents"]).await;

        let err = result.unwrap_err();
        assert!(matches!(err, CliError::Queue(QueueError::EnvironmentNotSet)));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_send_count_receive_round() {
        let backend = Arc::new(InMemoryBackend::default());

        let (result, lines) = run(
            &backend,
            test_config(),
            &["send", "--consumer", "OrderEvents", "first order"],
        )
        .await;
        result.unwrap();
        assert_eq!(lines.len(), 1);

        run(&backend, test_config(), &["send", "--consumer", "OrderEvents", "second order"])
            .await
            .0
            .unwrap();

        let (result, lines) = run(&backend, test_config(), &["count", "--consumer", "OrderEvents"]).await;
        result.unwrap();
        assert_eq!(lines, vec!["2".to_string()]);

        let (result, mut lines) =
            run(&backend, test_config(), &["receive", "--consumer", "OrderEvents"]).await;
        result.unwrap();
        lines.sort();
        assert_eq!(lines, vec!["first order".to_string(), "second order".to_string()]);

        let (_, lines) = run(&backend, test_config(), &["count", "--consumer", "OrderEvents"]).await;
        assert_eq!(lines, vec!["0".to_string()]);
    }

    #[tokio::test]
    async fn test_receive_json_output() {
        let backend = Arc::new(InMemoryBackend::default());
        run(
            &backend,
            test_config(),
            &["send", "--consumer", "OrderEvents", "-a", "source=cli", "payload"],
        )
        .await
        .0
        .unwrap();

        let (result, lines) = run(
            &backend,
            test_config(),
            &["receive", "--consumer", "OrderEvents", "--format", "json"],
        )
        .await;
        result.unwrap();

        assert_eq!(lines.len(), 2);
        let message: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(message["body"], "payload");
        assert_eq!(message["attributes"]["source"], "cli");
        let summary: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(summary["queue"], "order_events_test");
        assert_eq!(summary["processed"], 1);
    }

    #[tokio::test]
    async fn test_rejected_send_fails_the_command() {
        let backend = Arc::new(InMemoryBackend::default());

        let (result, lines) = run(&backend, test_config(), &["send", "--consumer", "OrderEvents", ""]).await;

        let err = result.unwrap_err();
        assert!(matches!(err, CliError::CommandFailed { .. }));
        assert!(err.to_string().contains("order_events_test"));
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_delay_over_limit_is_invalid_argument() {
        let backend = Arc::new(InMemoryBackend::default());

        let (result, _) = run(
            &backend,
            test_config(),
            &["send", "--consumer", "OrderEvents", "--delay-seconds", "901", "late"],
        )
        .await;

        assert_eq!(result.unwrap_err().exit_code(), 4);
    }

    #[tokio::test]
    async fn test_exists_and_delete() {
        let backend = Arc::new(InMemoryBackend::default());

        let (_, lines) = run(&backend, test_config(), &["exists", "--consumer", "OrderEvents"]).await;
        assert_eq!(lines, vec!["false".to_string()]);

        run(&backend, test_config(), &["count", "--consumer", "OrderEvents"])
            .await
            .0
            .unwrap();
        let (_, lines) = run(
            &backend,
            test_config(),
            &["exists", "--consumer", "OrderEvents", "-f", "json"],
        )
        .await;
        let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["exists"], true);

        let (result, lines) = run(&backend, test_config(), &["delete", "--consumer", "OrderEvents"]).await;
        result.unwrap();
        assert_eq!(lines, vec!["Deleted order_events_test".to_string()]);

        let (_, lines) = run(&backend, test_config(), &["exists", "--consumer", "OrderEvents"]).await;
        assert_eq!(lines, vec!["false".to_string()]);
    }

    #[tokio::test]
    async fn test_notify_publishes_to_resolved_topic() {
        let backend = Arc::new(InMemoryBackend::default());
        let config = test_config().with_notification_prefix("ops");

        let (result, lines) = run(
            &backend,
            config,
            &["notify", "alerts", "disk full", "--subject", "Alert"],
        )
        .await;
        result.unwrap();
        assert_eq!(lines.len(), 1);

        let topic = TopicName::new("ops_alerts_test".to_string()).unwrap();
        let published = backend.published_notifications(&topic);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message, "disk full");
        assert_eq!(published[0].subject.as_deref(), Some("Alert"));
    }

    #[tokio::test]
    async fn test_notify_with_full_name() {
        let backend = Arc::new(InMemoryBackend::default());

        run(&backend, test_config(), &["notify", "shared_alerts", "hello", "--full-name"])
            .await
            .0
            .unwrap();

        let topic = TopicName::new("shared_alerts".to_string()).unwrap();
        assert_eq!(backend.published_notifications(&topic).len(), 1);
    }

    #[tokio::test]
    async fn test_notify_rejects_empty_message() {
        let backend = Arc::new(InMemoryBackend::default());

        let (result, _) = run(&backend, test_config(), &["notify", "alerts", ""]).await;

        assert!(matches!(result, Err(CliError::InvalidArgument { .. })));
    }
}
