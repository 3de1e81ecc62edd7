//! User-agent rotation for page sessions.

/// Desktop browser user agents used when none are configured.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
];

/// Fixed pool of user agents, sampled uniformly.
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    /// Build a pool, ignoring blank entries. Falls back to the defaults when nothing is left.
    pub fn new(agents: impl IntoIterator<Item = String>) -> Self {
        let agents: Vec<String> = agents
            .into_iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();
        if agents.is_empty() {
            Self::default()
        } else {
            Self { agents }
        }
    }

    /// Pick a user agent uniformly at random.
    pub fn pick(&self) -> &str {
        &self.agents[fastrand::usize(..self.agents.len())]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}
