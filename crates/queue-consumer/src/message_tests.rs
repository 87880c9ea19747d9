//! Tests for message types.

use super::*;
use chrono::TimeZone;

#[test]
fn test_queue_name_validation() {
    // Valid names
    assert!(QueueName::new("dummy_queue_test".to_string()).is_ok());
    assert!(QueueName::new("queue-123".to_string()).is_ok());
    assert!(QueueName::new("a".to_string()).is_ok());
    assert!(QueueName::new("a".repeat(80)).is_ok());

    // Invalid names
    assert!(QueueName::new("".to_string()).is_err());
    assert!(QueueName::new("a".repeat(81)).is_err());
    assert!(QueueName::new("special@chars".to_string()).is_err());
    assert!(QueueName::new("with space".to_string()).is_err());
    assert!(QueueName::new("nested/queue".to_string()).is_err());
}

#[test]
fn test_topic_name_allows_longer_names() {
    assert!(TopicName::new("a".repeat(256)).is_ok());
    assert!(TopicName::new("a".repeat(257)).is_err());
    assert!(TopicName::new("prefix_send_message_failure_test".to_string()).is_ok());
}

#[test]
fn test_queue_name_from_str_and_display() {
    let name: QueueName = "dummy_queue_test".parse().unwrap();
    assert_eq!(name.to_string(), "dummy_queue_test");
    assert_eq!(name.as_str(), "dummy_queue_test");
}

#[test]
fn test_message_id_generation() {
    let id1 = MessageId::new();
    let id2 = MessageId::new();
    assert_ne!(id1, id2);
    assert!(!id1.as_str().is_empty());

    assert!("".parse::<MessageId>().is_err());
    assert_eq!("abc".parse::<MessageId>().unwrap().as_str(), "abc");
}

#[test]
fn test_timestamp_display_format() {
    let dt = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    let ts = Timestamp::from_datetime(dt);
    assert_eq!(ts.to_string(), "2024-03-09 14:05:07 UTC");
}

#[test]
fn test_received_message_redelivery() {
    let mut message = ReceivedMessage {
        message_id: MessageId::new(),
        body: "payload".to_string(),
        receipt_handle: ReceiptHandle::new("receipt".to_string()),
        attributes: HashMap::new(),
        receive_count: 1,
        received_at: Timestamp::now(),
    };

    assert_eq!(message.body(), "payload");
    assert!(!message.is_redelivery());

    message.receive_count = 3;
    assert!(message.is_redelivery());
}

// ============================================================================
// SendOptions Tests
// ============================================================================

mod send_options_tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let options = SendOptions::new()
            .with_delay_seconds(30)
            .with_attribute("origin", "billing");

        assert_eq!(options.delay_seconds, Some(30));
        assert_eq!(options.attributes.get("origin"), Some(&"billing".to_string()));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_delay_above_limit_is_rejected() {
        let options = SendOptions::new().with_delay_seconds(901);
        assert!(matches!(
            options.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_empty_attribute_name_is_rejected() {
        let options = SendOptions::new().with_attribute("", "value");
        assert!(matches!(
            options.validate(),
            Err(ValidationError::Required { .. })
        ));
    }
}
