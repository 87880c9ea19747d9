//! Tests for queue and topic name resolution.

use super::*;

struct DummyQueue;

#[allow(dead_code)]
struct Wrapper<T>(T);

mod underscore_tests {
    use super::*;

    #[test]
    fn test_camel_case_becomes_snake_case() {
        assert_eq!(underscore("DummyQueue"), "dummy_queue");
        assert_eq!(underscore("AnotherDummyQueue"), "another_dummy_queue");
        assert_eq!(underscore("queue"), "queue");
    }

    #[test]
    fn test_acronyms_stay_together() {
        assert_eq!(underscore("HTTPQueue"), "http_queue");
        assert_eq!(underscore("SQSMessageQueue"), "sqs_message_queue");
        assert_eq!(underscore("ParseHTML"), "parse_html");
    }

    #[test]
    fn test_digits_and_hyphens() {
        assert_eq!(underscore("Queue2Go"), "queue2_go");
        assert_eq!(underscore("order-events"), "order_events");
    }

    #[test]
    fn test_nesting_separator_is_flattened() {
        assert_eq!(underscore("Billing::InvoiceQueue"), "billing_invoice_queue");
        assert_eq!(underscore("A::B::CQueue"), "a_b_c_queue");
    }
}

mod type_name_tests {
    use super::*;

    #[test]
    fn test_module_path_is_stripped() {
        assert_eq!(type_base_name::<DummyQueue>(), "DummyQueue");
    }

    #[test]
    fn test_generic_arguments_are_stripped() {
        assert_eq!(type_base_name::<Wrapper<DummyQueue>>(), "Wrapper");
    }
}

mod queue_name_tests {
    use super::*;

    #[test]
    fn test_derived_name_includes_environment() {
        let name = resolve_queue_name("DummyQueue", None, Some("test")).unwrap();
        assert_eq!(name.as_str(), "dummy_queue_test");
    }

    #[test]
    fn test_override_replaces_derived_base() {
        let name = resolve_queue_name("DummyQueue", Some("new_queue_name"), Some("test")).unwrap();
        assert_eq!(name.as_str(), "new_queue_name_test");
    }

    #[test]
    fn test_missing_environment_is_an_error() {
        assert!(matches!(
            resolve_queue_name("DummyQueue", None, None),
            Err(QueueError::EnvironmentNotSet)
        ));
        assert!(matches!(
            resolve_queue_name("DummyQueue", None, Some("")),
            Err(QueueError::EnvironmentNotSet)
        ));
    }

    #[test]
    fn test_identities_with_same_base_share_a_name() {
        let first = resolve_queue_name("Billing::Events", None, Some("prod")).unwrap();
        let second = resolve_queue_name("BillingEvents", None, Some("prod")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = resolve_queue_name("DummyQueue", Some("bad name"), Some("test"));
        assert!(matches!(result, Err(QueueError::Validation(_))));
    }
}

mod topic_name_tests {
    use super::*;

    #[test]
    fn test_prefix_is_prepended() {
        let name =
            resolve_topic_name("dummy_topic_with_prefix", Some("prefix"), Some("test")).unwrap();
        assert_eq!(name.as_str(), "prefix_dummy_topic_with_prefix_test");
    }

    #[test]
    fn test_without_prefix() {
        let name = resolve_topic_name("send_message_failure", None, Some("test")).unwrap();
        assert_eq!(name.as_str(), "send_message_failure_test");

        let name = resolve_topic_name("send_message_failure", Some(""), Some("test")).unwrap();
        assert_eq!(name.as_str(), "send_message_failure_test");
    }

    #[test]
    fn test_missing_environment_is_an_error() {
        assert!(matches!(
            resolve_topic_name("dummy_topic", Some("prefix"), None),
            Err(QueueError::EnvironmentNotSet)
        ));
    }
}
