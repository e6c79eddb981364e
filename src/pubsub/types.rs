//! Resource name handling for topics and subscriptions.

use crate::error::{Error, Result};
use std::fmt;

/// Represents a parsed Pub/Sub resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceName {
    /// Topic resource: projects/{project}/topics/{topic}
    Topic {
        /// The GCP project ID
        project: String,
        /// The topic name
        topic: String,
    },
    /// Subscription resource: projects/{project}/subscriptions/{subscription}
    Subscription {
        /// The GCP project ID
        project: String,
        /// The subscription name
        subscription: String,
    },
}

impl ResourceName {
    /// Parse a fully qualified resource name string.
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();

        if parts.len() != 4 || parts[0] != "projects" || parts[1].is_empty() || parts[3].is_empty()
        {
            return Err(Error::InvalidResourceName(format!(
                "expected projects/{{project}}/{{kind}}/{{id}}, got {}",
                name
            )));
        }

        let project = parts[1].to_string();
        let resource_id = parts[3].to_string();

        match parts[2] {
            "topics" => Ok(ResourceName::Topic {
                project,
                topic: resource_id,
            }),
            "subscriptions" => Ok(ResourceName::Subscription {
                project,
                subscription: resource_id,
            }),
            other => Err(Error::InvalidResourceName(format!(
                "unknown resource type: {}",
                other
            ))),
        }
    }

    /// Resolve a topic given either a bare ID or a fully qualified name.
    pub fn resolve_topic(project: &str, topic: &str) -> Result<Self> {
        if topic.contains('/') {
            match Self::parse(topic)? {
                name @ ResourceName::Topic { .. } => Ok(name),
                other => Err(Error::InvalidResourceName(format!(
                    "{} is not a topic",
                    other
                ))),
            }
        } else {
            Ok(ResourceName::Topic {
                project: project.to_string(),
                topic: topic.to_string(),
            })
        }
    }

    /// Resolve a subscription given either a bare ID or a fully qualified name.
    pub fn resolve_subscription(project: &str, subscription: &str) -> Result<Self> {
        if subscription.contains('/') {
            match Self::parse(subscription)? {
                name @ ResourceName::Subscription { .. } => Ok(name),
                other => Err(Error::InvalidResourceName(format!(
                    "{} is not a subscription",
                    other
                ))),
            }
        } else {
            Ok(ResourceName::Subscription {
                project: project.to_string(),
                subscription: subscription.to_string(),
            })
        }
    }

    /// Get the project ID from the resource name.
    pub fn project(&self) -> &str {
        match self {
            ResourceName::Topic { project, .. } => project,
            ResourceName::Subscription { project, .. } => project,
        }
    }

    /// Get the resource ID (topic or subscription name).
    pub fn resource_id(&self) -> &str {
        match self {
            ResourceName::Topic { topic, .. } => topic,
            ResourceName::Subscription { subscription, .. } => subscription,
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceName::Topic { project, topic } => {
                write!(f, "projects/{}/topics/{}", project, topic)
            }
            ResourceName::Subscription {
                project,
                subscription,
            } => {
                write!(f, "projects/{}/subscriptions/{}", project, subscription)
            }
        }
    }
}
