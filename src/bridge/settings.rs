//! Per-connection consumer settings and topic selection.

use std::time::Duration;

use crate::bridge::consumer::ConsumerSettings;
use crate::routing::table::{EndpointConfig, GROUP_ID_PROPERTY};

/// Consumer session timeout forced on every connection.
pub const SESSION_TIMEOUT_MS: i64 = 6000;

/// Upper bound for the topic existence check at connection setup.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

const SESSION_TIMEOUT_PROPERTY: &str = "session.timeout.ms";
const OFFSET_RESET_PROPERTY: &str = "auto.offset.reset";
const TOPICS_PARAM: &str = "topics";

/// Overrides a client may pass in the websocket URL query string.
///
/// Configured values always win; these only fill gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    pub group_id: Option<String>,

    pub auto_offset_reset: Option<String>,

    /// Comma separated topic list.
    pub topics: Option<String>,
}

impl ConnectionParams {
    /// Collect overrides from decoded query pairs. A repeated key keeps its
    /// first value; unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                GROUP_ID_PROPERTY => &mut params.group_id,
                OFFSET_RESET_PROPERTY => &mut params.auto_offset_reset,
                TOPICS_PARAM => &mut params.topics,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

impl EndpointConfig {
    /// Clone the configured properties and apply the connection's forced
    /// settings and query overrides.
    pub fn consumer_settings(&self, params: &ConnectionParams) -> ConsumerSettings {
        let mut consumer = self.consumer.clone();
        consumer.insert(SESSION_TIMEOUT_PROPERTY, SESSION_TIMEOUT_MS);
        if !consumer.contains(GROUP_ID_PROPERTY) {
            if let Some(group) = non_empty(&params.group_id) {
                consumer.insert(GROUP_ID_PROPERTY, group);
            }
        }

        let mut default_topic = self.default_topic.clone();
        if !default_topic.contains(OFFSET_RESET_PROPERTY) {
            if let Some(reset) = non_empty(&params.auto_offset_reset) {
                default_topic.insert(OFFSET_RESET_PROPERTY, reset);
            }
        }

        ConsumerSettings {
            consumer,
            default_topic,
        }
    }

    /// Configured topics win; otherwise the `topics` query parameter.
    /// An empty result means the connection has nothing to stream.
    pub fn resolve_topics(&self, params: &ConnectionParams) -> Vec<String> {
        if !self.topics.is_empty() {
            return self.topics.clone();
        }
        params
            .topics
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PropertyMap, PropertyValue};
    use crate::routing::MessageType;

    fn endpoint(consumer: PropertyMap, topics: &[&str]) -> EndpointConfig {
        EndpointConfig {
            consumer,
            default_topic: PropertyMap::new(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            message_details: false,
            message_type: MessageType::Json,
            compression: false,
        }
    }

    fn params(group: Option<&str>, reset: Option<&str>, topics: Option<&str>) -> ConnectionParams {
        ConnectionParams {
            group_id: group.map(str::to_string),
            auto_offset_reset: reset.map(str::to_string),
            topics: topics.map(str::to_string),
        }
    }

    #[test]
    fn forces_session_timeout_and_keeps_base_untouched() {
        let base: PropertyMap = [("group.id", "g"), ("session.timeout.ms", "30000")]
            .into_iter()
            .collect();
        let ep = endpoint(base.clone(), &["t"]);

        let settings = ep.consumer_settings(&ConnectionParams::default());
        assert_eq!(
            settings.consumer.get("session.timeout.ms"),
            Some(&PropertyValue::Integer(SESSION_TIMEOUT_MS))
        );
        assert_eq!(ep.consumer, base);
    }

    #[test]
    fn config_wins_over_query() {
        let ep = endpoint([("group.id", "configured")].into_iter().collect(), &["t"]);
        let settings = ep.consumer_settings(&params(Some("from-query"), Some("earliest"), None));
        assert_eq!(settings.consumer.non_empty("group.id").as_deref(), Some("configured"));
        assert_eq!(
            settings.default_topic.non_empty("auto.offset.reset").as_deref(),
            Some("earliest")
        );
    }

    #[test]
    fn query_fills_missing_group() {
        let ep = endpoint(PropertyMap::new(), &["t"]);
        let settings = ep.consumer_settings(&params(Some("from-query"), Some(""), None));
        assert_eq!(settings.consumer.non_empty("group.id").as_deref(), Some("from-query"));
        assert!(!settings.default_topic.contains("auto.offset.reset"));
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn first_query_value_wins() {
        let parsed = ConnectionParams::from_pairs(pairs(&[
            ("topics", "a"),
            ("group.id", "g1"),
            ("topics", "b"),
            ("unrelated", "x"),
            ("group.id", "g2"),
        ]));
        assert_eq!(parsed, params(Some("g1"), None, Some("a")));
        assert_eq!(ConnectionParams::from_pairs(Vec::new()), ConnectionParams::default());
    }

    #[test]
    fn topic_resolution() {
        let configured = endpoint(PropertyMap::new(), &["a"]);
        assert_eq!(configured.resolve_topics(&params(None, None, Some("x,y"))), vec!["a"]);

        let open = endpoint(PropertyMap::new(), &[]);
        assert_eq!(
            open.resolve_topics(&params(None, None, Some("x, y,,"))),
            vec!["x", "y"]
        );
        assert!(open.resolve_topics(&params(None, None, Some(""))).is_empty());
        assert!(open.resolve_topics(&ConnectionParams::default()).is_empty());
    }
}
