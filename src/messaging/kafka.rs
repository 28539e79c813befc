use anyhow::{Context, Result};
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer, StreamConsumer},
    message::Message,
};
use std::sync::Arc;

use super::payment_events::{PaymentEvent, PaymentEventHandler};

/// Reads payment outcomes from Kafka/Redpanda and hands them to the handler
pub struct PaymentEventConsumer {
    consumer: StreamConsumer,
    topic: String,
}

impl PaymentEventConsumer {
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .context("Failed to create payment event consumer")?;

        consumer
            .subscribe(&[topic])
            .with_context(|| format!("Failed to subscribe to {topic}"))?;

        Ok(Self {
            consumer,
            topic: topic.to_string(),
        })
    }

    /// Runs until the task is dropped. Broker errors are logged and the loop continues.
    pub async fn run(self, handler: Arc<PaymentEventHandler>) {
        tracing::info!(topic = %self.topic, "Payment event consumer started");

        loop {
            let event = match self.consumer.recv().await {
                Ok(message) => {
                    let decoded = message
                        .payload()
                        .context("Message has no payload")
                        .and_then(PaymentEvent::from_json);

                    match decoded {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::error!(
                                topic = %self.topic,
                                partition = message.partition(),
                                offset = message.offset(),
                                error = %e,
                                "Skipping undecodable payment event"
                            );
                            continue;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(topic = %self.topic, error = %e, "Kafka receive error");
                    continue;
                }
            };

            handler.handle(&event).await;
        }
    }
}
