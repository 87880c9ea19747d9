//! AWS SNS notification backend.

use super::{all_text, first_text, required_text, AwsClient};
use crate::backend::{NotificationBackend, TopicHandle};
use crate::config::{AwsConfig, Credentials};
use crate::error::{BackendError, ConfigurationError};
use crate::message::{MessageId, TopicName};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::str::FromStr;

const SNS_API_VERSION: &str = "2010-03-31";

/// Notification backend speaking the SNS query API
#[derive(Debug)]
pub struct SnsBackend {
    client: AwsClient,
}

impl SnsBackend {
    /// Create a backend for the configured region or endpoint override
    pub fn new(config: &AwsConfig, credentials: &Credentials) -> Result<Self, ConfigurationError> {
        let endpoint = config
            .sns_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sns.{}.amazonaws.com", config.region));

        let client = AwsClient::new(
            &endpoint,
            "sns",
            &config.region,
            SNS_API_VERSION,
            credentials,
        )?;

        Ok(Self { client })
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }
}

#[async_trait]
impl NotificationBackend for SnsBackend {
    async fn create_topic(&self, name: &TopicName) -> Result<TopicHandle, BackendError> {
        let mut params = BTreeMap::new();
        params.insert("Name".to_string(), name.as_str().to_string());

        let response = self.client.call("CreateTopic", params).await?;
        let arn = required_text(&response, "TopicArn")?;

        tracing::debug!(topic = %name, arn = %arn, "Created SNS topic");
        Ok(TopicHandle::new(name.clone(), arn))
    }

    async fn list_topics(&self) -> Result<Vec<TopicHandle>, BackendError> {
        let mut topics = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut params = BTreeMap::new();
            if let Some(token) = next_token.take() {
                params.insert("NextToken".to_string(), token);
            }

            let response = self.client.call("ListTopics", params).await?;
            topics.extend(parse_topic_arns(&response)?);

            match first_text(&response, "NextToken")? {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(topics)
    }

    async fn publish(
        &self,
        topic: &TopicHandle,
        message: &str,
        subject: Option<&str>,
    ) -> Result<MessageId, BackendError> {
        if message.is_empty() {
            return Err(BackendError::InvalidMessage(
                "notification message must not be empty".to_string(),
            ));
        }

        let mut params = BTreeMap::new();
        params.insert("TopicArn".to_string(), topic.arn().to_string());
        params.insert("Message".to_string(), message.to_string());
        if let Some(subject) = subject {
            params.insert("Subject".to_string(), subject.to_string());
        }

        let response = self.client.call("Publish", params).await?;
        let id = required_text(&response, "MessageId")?;

        MessageId::from_str(&id)
            .map_err(|e| BackendError::Serialization(format!("Invalid MessageId: {}", e)))
    }

    async fn delete_topic(&self, topic: &TopicHandle) -> Result<(), BackendError> {
        let mut params = BTreeMap::new();
        params.insert("TopicArn".to_string(), topic.arn().to_string());

        self.client.call("DeleteTopic", params).await?;

        tracing::debug!(topic = %topic.name(), "Deleted SNS topic");
        Ok(())
    }
}

/// Topic handles from a `ListTopics` page.
///
/// The topic name is the last `:`-separated segment of the ARN. Topics whose
/// names fall outside [`TopicName`] rules (e.g. FIFO topics) are skipped.
pub(crate) fn parse_topic_arns(xml: &str) -> Result<Vec<TopicHandle>, BackendError> {
    let topics = all_text(xml, "TopicArn")?
        .into_iter()
        .filter_map(|arn| {
            let name = arn.rsplit(':').next().unwrap_or_default().to_string();
            match TopicName::new(name) {
                Ok(name) => Some(TopicHandle::new(name, arn)),
                Err(e) => {
                    tracing::debug!(arn = %arn, error = %e, "Skipping topic with unsupported name");
                    None
                }
            }
        })
        .collect();

    Ok(topics)
}
