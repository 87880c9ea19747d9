//! AWS SQS queue backend.

use super::{all_text, required_text, AwsClient};
use crate::backend::{validate_message_body, QueueBackend, QueueHandle, MAX_RECEIVE_BATCH};
use crate::config::{AwsConfig, Credentials, MAX_WAIT_TIME_SECONDS};
use crate::error::{BackendError, ConfigurationError};
use crate::message::{
    MessageId, QueueName, ReceiptHandle, ReceivedMessage, SendOptions, SentMessage, Timestamp,
};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;

const SQS_API_VERSION: &str = "2012-11-05";

/// Queue backend speaking the SQS query API
#[derive(Debug)]
pub struct SqsBackend {
    client: AwsClient,
}

impl SqsBackend {
    /// Create a backend for the configured region or endpoint override
    pub fn new(config: &AwsConfig, credentials: &Credentials) -> Result<Self, ConfigurationError> {
        let endpoint = config
            .sqs_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sqs.{}.amazonaws.com", config.region));

        let client = AwsClient::new(
            &endpoint,
            "sqs",
            &config.region,
            SQS_API_VERSION,
            credentials,
        )?;

        Ok(Self { client })
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    fn queue_params(queue: &QueueHandle) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("QueueUrl".to_string(), queue.url().to_string());
        params
    }
}

#[async_trait]
impl QueueBackend for SqsBackend {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueHandle, BackendError> {
        let mut params = BTreeMap::new();
        params.insert("QueueName".to_string(), name.as_str().to_string());

        let response = self.client.call("CreateQueue", params).await?;
        let url = required_text(&response, "QueueUrl")?;

        tracing::debug!(queue = %name, url = %url, "Created SQS queue");
        Ok(QueueHandle::new(name.clone(), url))
    }

    async fn find_queue(&self, name: &QueueName) -> Result<QueueHandle, BackendError> {
        let mut params = BTreeMap::new();
        params.insert("QueueName".to_string(), name.as_str().to_string());

        let response = self.client.call("GetQueueUrl", params).await?;
        let url = required_text(&response, "QueueUrl")?;

        Ok(QueueHandle::new(name.clone(), url))
    }

    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &str,
        options: &SendOptions,
    ) -> Result<SentMessage, BackendError> {
        validate_message_body(body)?;
        options
            .validate()
            .map_err(|e| BackendError::InvalidMessage(e.to_string()))?;

        let mut params = Self::queue_params(queue);
        params.insert("MessageBody".to_string(), body.to_string());

        if let Some(delay) = options.delay_seconds {
            params.insert("DelaySeconds".to_string(), delay.to_string());
        }

        // Sorted so attribute numbering is stable between calls
        let mut attributes: Vec<_> = options.attributes.iter().collect();
        attributes.sort();
        for (index, (key, value)) in attributes.into_iter().enumerate() {
            let prefix = format!("MessageAttribute.{}", index + 1);
            params.insert(format!("{}.Name", prefix), key.clone());
            params.insert(format!("{}.Value.StringValue", prefix), value.clone());
            params.insert(format!("{}.Value.DataType", prefix), "String".to_string());
        }

        let response = self.client.call("SendMessage", params).await?;
        parse_send_message_response(&response)
    }

    async fn receive_messages(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>, BackendError> {
        let max_messages = max_messages.clamp(1, MAX_RECEIVE_BATCH);
        let wait_seconds = wait_time.as_secs().min(MAX_WAIT_TIME_SECONDS);

        let mut params = Self::queue_params(queue);
        params.insert("MaxNumberOfMessages".to_string(), max_messages.to_string());
        params.insert("WaitTimeSeconds".to_string(), wait_seconds.to_string());
        params.insert("AttributeName.1".to_string(), "All".to_string());
        params.insert("MessageAttributeName.1".to_string(), "All".to_string());

        let response = self.client.call("ReceiveMessage", params).await?;
        parse_receive_message_response(&response)
    }

    async fn delete_message(
        &self,
        queue: &QueueHandle,
        receipt: &ReceiptHandle,
    ) -> Result<(), BackendError> {
        let mut params = Self::queue_params(queue);
        params.insert("ReceiptHandle".to_string(), receipt.as_str().to_string());

        self.client.call("DeleteMessage", params).await?;
        Ok(())
    }

    async fn approximate_message_count(&self, queue: &QueueHandle) -> Result<u64, BackendError> {
        let mut params = Self::queue_params(queue);
        params.insert(
            "AttributeName.1".to_string(),
            "ApproximateNumberOfMessages".to_string(),
        );

        let response = self.client.call("GetQueueAttributes", params).await?;
        parse_message_count_response(&response)
    }

    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), BackendError> {
        self.client
            .call("DeleteQueue", Self::queue_params(queue))
            .await?;

        tracing::debug!(queue = %queue.name(), "Deleted SQS queue");
        Ok(())
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

pub(crate) fn parse_send_message_response(xml: &str) -> Result<SentMessage, BackendError> {
    let id = required_text(xml, "MessageId")?;
    let message_id = MessageId::from_str(&id)
        .map_err(|e| BackendError::Serialization(format!("Invalid MessageId: {}", e)))?;
    let md5_of_body = all_text(xml, "MD5OfMessageBody")?.into_iter().next();

    Ok(SentMessage {
        message_id,
        md5_of_body,
    })
}

pub(crate) fn parse_message_count_response(xml: &str) -> Result<u64, BackendError> {
    let names = all_text(xml, "Name")?;
    let values = all_text(xml, "Value")?;

    names
        .iter()
        .zip(values.iter())
        .find(|(name, _)| name.as_str() == "ApproximateNumberOfMessages")
        .ok_or_else(|| {
            BackendError::Serialization(
                "ApproximateNumberOfMessages not found in response".to_string(),
            )
        })?
        .1
        .parse()
        .map_err(|e| {
            BackendError::Serialization(format!("Invalid ApproximateNumberOfMessages: {}", e))
        })
}

#[derive(Default)]
struct MessageFields {
    message_id: Option<String>,
    receipt_handle: Option<String>,
    body: String,
    receive_count: u32,
    attributes: HashMap<String, String>,
    pending_attribute: Option<String>,
}

impl MessageFields {
    fn build(self) -> Result<ReceivedMessage, BackendError> {
        let message_id = self
            .message_id
            .as_deref()
            .map(MessageId::from_str)
            .transpose()
            .map_err(|e| BackendError::Serialization(format!("Invalid MessageId: {}", e)))?
            .ok_or_else(|| BackendError::Serialization("Message without MessageId".to_string()))?;

        let receipt_handle = self.receipt_handle.ok_or_else(|| {
            BackendError::Serialization("Message without ReceiptHandle".to_string())
        })?;

        Ok(ReceivedMessage {
            message_id,
            body: self.body,
            receipt_handle: ReceiptHandle::new(receipt_handle),
            attributes: self.attributes,
            receive_count: self.receive_count.max(1),
            received_at: Timestamp::now(),
        })
    }
}

/// Parse a `ReceiveMessage` response.
///
/// Text is not trimmed so message bodies come back exactly as sent.
pub(crate) fn parse_receive_message_response(
    xml: &str,
) -> Result<Vec<ReceivedMessage>, BackendError> {
    let mut reader = Reader::from_str(xml);

    let mut messages = Vec::new();
    let mut current: Option<MessageFields> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"Message" {
                    current = Some(MessageFields::default());
                }
                path.push(name);
            }
            Ok(Event::End(_)) => {
                if path.pop().as_deref() == Some(b"Message".as_slice()) {
                    if let Some(fields) = current.take() {
                        messages.push(fields.build()?);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(fields) = current.as_mut() {
                    let text = e.unescape().map_err(|e| {
                        BackendError::Serialization(format!("Failed to parse XML: {}", e))
                    })?;
                    apply_message_text(fields, &path, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BackendError::Serialization(format!(
                    "XML parsing error: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(messages)
}

/// Element `n` levels up from the innermost one (1 = innermost)
fn ancestor(path: &[Vec<u8>], n: usize) -> Option<&[u8]> {
    path.len()
        .checked_sub(n)
        .and_then(|i| path.get(i))
        .map(|v| v.as_slice())
}

fn apply_message_text(fields: &mut MessageFields, path: &[Vec<u8>], text: &str) {
    match (ancestor(path, 2), ancestor(path, 1)) {
        (Some(b"Message"), Some(b"MessageId")) => {
            fields.message_id = Some(text.trim().to_string());
        }
        (Some(b"Message"), Some(b"ReceiptHandle")) => {
            fields.receipt_handle = Some(text.trim().to_string());
        }
        (Some(b"Message"), Some(b"Body")) => fields.body.push_str(text),
        (Some(b"Attribute"), Some(b"Name")) | (Some(b"MessageAttribute"), Some(b"Name")) => {
            fields.pending_attribute = Some(text.trim().to_string());
        }
        (Some(b"Attribute"), Some(b"Value")) => {
            if fields.pending_attribute.as_deref() == Some("ApproximateReceiveCount") {
                fields.receive_count = text.trim().parse().unwrap_or(1);
            }
            fields.pending_attribute = None;
        }
        (Some(b"Value"), Some(b"StringValue"))
            if ancestor(path, 3) == Some(b"MessageAttribute".as_slice()) =>
        {
            if let Some(name) = fields.pending_attribute.take() {
                fields.attributes.insert(name, text.to_string());
            }
        }
        _ => {}
    }
}
