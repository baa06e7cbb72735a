//! Topic router.
//!
//! `data` frames fan out to every handler registered for their exact
//! topic, in registration order. Callback ops (`get_nodes_callback`,
//! `get_presets_callback`) route by op to a single bound handler.
//! Unknown topics and unexpected inbound ops are dropped silently --
//! a new bridge must never crash an old client.

use std::collections::HashMap;

use groundlink_proto::{DataFrame, Envelope, NodeReport, PresetReport};

use crate::store::SessionCache;

pub type TopicHandler = Box<dyn Fn(&str, &DataFrame, &SessionCache) + Send + Sync>;
pub type NodesHandler = Box<dyn Fn(&NodeReport, &SessionCache) + Send + Sync>;
pub type PresetsHandler = Box<dyn Fn(&PresetReport, &SessionCache) + Send + Sync>;

#[derive(Default)]
pub struct TopicRouter {
    topics: HashMap<String, Vec<TopicHandler>>,
    on_nodes: Option<NodesHandler>,
    on_presets: Option<PresetsHandler>,
}

impl TopicRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one topic. Topics are exact-match,
    /// case-sensitive strings; several handlers may share a topic.
    pub fn on_topic(
        &mut self,
        topic: impl Into<String>,
        handler: impl Fn(&str, &DataFrame, &SessionCache) + Send + Sync + 'static,
    ) {
        self.topics
            .entry(topic.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Bind the single handler for node-list replies.
    pub fn on_nodes_callback(
        &mut self,
        handler: impl Fn(&NodeReport, &SessionCache) + Send + Sync + 'static,
    ) {
        self.on_nodes = Some(Box::new(handler));
    }

    /// Bind the single handler for preset-list replies.
    pub fn on_presets_callback(
        &mut self,
        handler: impl Fn(&PresetReport, &SessionCache) + Send + Sync + 'static,
    ) {
        self.on_presets = Some(Box::new(handler));
    }

    /// Route one inbound envelope. Returns how many handlers ran.
    pub fn dispatch(&self, envelope: &Envelope, cache: &SessionCache) -> usize {
        match envelope {
            Envelope::Data(frame) => {
                let Some(handlers) = self.topics.get(&frame.topic) else {
                    tracing::trace!(topic = %frame.topic, "no handler for topic");
                    return 0;
                };
                for handler in handlers {
                    handler(&frame.topic, frame, cache);
                }
                handlers.len()
            }
            Envelope::GetNodesCallback(report) => match &self.on_nodes {
                Some(handler) => {
                    handler(report, cache);
                    1
                }
                None => 0,
            },
            Envelope::GetPresetsCallback(report) => match &self.on_presets {
                Some(handler) => {
                    handler(report, cache);
                    1
                }
                None => 0,
            },
            other => {
                // Outbound-only ops arriving inbound: ignore.
                tracing::trace!(op = other.op(), "ignoring unexpected inbound op");
                0
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::Map;

    use super::*;

    fn data(topic: &str) -> Envelope {
        Envelope::Data(DataFrame::new(topic, Map::new()))
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut router = TopicRouter::new();
        let order = std::sync::Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            router.on_topic("/autonav/gps", move |_, _, _| {
                order.lock().unwrap().push(tag);
            });
        }

        let cache = SessionCache::new();
        let ran = router.dispatch(&data("/autonav/gps"), &cache);

        assert_eq!(ran, 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unknown_topic_is_silently_ignored() {
        let mut router = TopicRouter::new();
        router.on_topic("/autonav/gps", |_, _, _| {});

        let cache = SessionCache::new();
        assert_eq!(router.dispatch(&data("/autonav/next_year_feature"), &cache), 0);
    }

    #[test]
    fn topics_are_case_sensitive_exact_matches() {
        let mut router = TopicRouter::new();
        let hits = std::sync::Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        router.on_topic("/autonav/MotorInput", move |_, _, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let cache = SessionCache::new();
        router.dispatch(&data("/autonav/motorinput"), &cache);
        router.dispatch(&data("/autonav/MotorInput"), &cache);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_route_by_op_not_topic() {
        let mut router = TopicRouter::new();
        let hit = std::sync::Arc::new(AtomicUsize::new(0));
        let h = hit.clone();
        router.on_presets_callback(move |report, _| {
            assert_eq!(report.active_preset, "default");
            h.fetch_add(1, Ordering::SeqCst);
        });

        let cache = SessionCache::new();
        let envelope = Envelope::GetPresetsCallback(PresetReport {
            presets: vec!["default".into(), "comp".into()],
            active_preset: "default".into(),
        });
        assert_eq!(router.dispatch(&envelope, &cache), 1);
        assert_eq!(hit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unexpected_inbound_op_is_ignored() {
        let router = TopicRouter::new();
        let cache = SessionCache::new();
        assert_eq!(router.dispatch(&Envelope::Broadcast, &cache), 0);
    }
}
