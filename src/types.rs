/// Snapshot of a container as reported by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub status: String,
    pub state: Option<String>,
}

impl ContainerSummary {
    /// First name with the runtime's leading `/` removed
    pub fn display_name(&self) -> Option<&str> {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/'))
            .filter(|name| !name.is_empty())
    }
}

/// Autocomplete candidate offered to the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerChoice {
    pub name: String,
    pub id: String,
}

impl ServerChoice {
    pub fn from_summary(summary: &ContainerSummary) -> Option<Self> {
        summary.display_name().map(|name| Self {
            name: name.to_string(),
            id: summary.id.clone(),
        })
    }
}
