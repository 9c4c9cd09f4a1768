/// One entry of the topic catalog: the key sent to the answering service and
/// the name shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub display_name: String,
}

impl Topic {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The normative corpora the answering service knows about.
pub fn builtin_topics() -> Vec<Topic> {
    vec![
        Topic::new("constitucion_vs", "Constitución"),
        Topic::new("codigo_trabajo_vs", "Código Sustantivo del Trabajo"),
        Topic::new("reglamentos_vs", "Reglamentos Universitarios"),
    ]
}

/// Resolves a topic key to its display name, falling back to the raw key for
/// topics the catalog does not know.
pub fn display_name_for(topics: &[Topic], topic_id: &str) -> String {
    topics
        .iter()
        .find(|topic| topic.id == topic_id)
        .map(|topic| topic.display_name.clone())
        .unwrap_or_else(|| topic_id.to_string())
}
