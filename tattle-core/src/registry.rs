//! The per-session registry of mirrored topics.

use std::collections::HashMap;

use tattle_types::SubscriptionRecord;

use crate::topic::Topic;

/// Owns every topic mirrored in one client session.
///
/// Constructed once per session and passed by reference into the
/// routers; there is no process-wide topic state. The registry is the
/// sole owner of topic lifetime — routers borrow topics per event.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Topic>,
}

impl TopicRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked topics.
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether no topics are tracked.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Whether a topic with this name is tracked.
    pub fn contains(&self, name: &str) -> bool {
        self.topics.contains_key(name)
    }

    /// Look up a topic by name.
    pub fn get(&self, name: &str) -> Option<&Topic> {
        self.topics.get(name)
    }

    /// Look up a topic by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Topic> {
        self.topics.get_mut(name)
    }

    /// Start tracking a topic. Replaces any existing topic of the same
    /// name and returns it.
    pub fn insert(&mut self, topic: Topic) -> Option<Topic> {
        self.topics.insert(topic.name().to_string(), topic)
    }

    /// Build a topic from a subscription record and start tracking it.
    pub fn create_from_record(&mut self, name: &str, sub: &SubscriptionRecord) -> &mut Topic {
        let topic = Topic::from_subscription(name, sub);
        self.topics.entry(name.to_string()).or_insert(topic)
    }

    /// Stop tracking a topic and return it.
    pub fn remove(&mut self, name: &str) -> Option<Topic> {
        self.topics.remove(name)
    }

    /// Iterate over all tracked topics.
    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    /// Iterate over all tracked topics, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Topic> {
        self.topics.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_inserted_topics() {
        let mut registry = TopicRegistry::new();
        assert!(registry.is_empty());

        registry.insert(Topic::new("grp-hiking"));
        registry.insert(Topic::new("usr-alice"));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("grp-hiking"));
        assert!(registry.get("usr-alice").is_some());
        assert!(registry.get("usr-bob").is_none());
    }

    #[test]
    fn create_from_record_uses_factory() {
        let mut registry = TopicRegistry::new();
        let sub = SubscriptionRecord {
            topic: Some("usr-alice".into()),
            seq: Some(2),
            ..Default::default()
        };
        let topic = registry.create_from_record("usr-alice", &sub);
        assert_eq!(topic.record().seq, Some(2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_returns_topic() {
        let mut registry = TopicRegistry::new();
        registry.insert(Topic::new("grp-hiking"));

        let removed = registry.remove("grp-hiking");
        assert!(removed.is_some());
        assert!(registry.is_empty());
        assert!(registry.remove("grp-hiking").is_none());
    }

    #[test]
    fn iter_mut_reaches_every_topic() {
        let mut registry = TopicRegistry::new();
        registry.insert(Topic::new("a"));
        registry.insert(Topic::new("b"));

        for topic in registry.iter_mut() {
            topic.set_online(true);
        }
        assert!(registry.iter().all(Topic::is_online));
    }
}
