use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output captured from an agent execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl AgentOutput {
    pub fn new(stdout: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }

    /// Check if the agent exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Contents of the first `<tag>...</tag>` block in stdout, trimmed.
    ///
    /// Returns `None` when the block is missing or the closing tag comes first.
    pub fn tagged_block(&self, tag: &str) -> Option<&str> {
        let open = format!("<{}>", tag);
        let close = format!("</{}>", tag);

        let start = self.stdout.find(&open)? + open.len();
        let end = self.stdout[start..].find(&close)? + start;
        Some(self.stdout[start..end].trim())
    }

    /// The structured payload for `tag`: the tagged block if present,
    /// otherwise stdout itself when it looks like a bare JSON document.
    pub fn json_payload(&self, tag: &str) -> Option<&str> {
        if let Some(block) = self.tagged_block(tag) {
            return Some(strip_code_fence(block));
        }

        let trimmed = strip_code_fence(self.stdout.trim());
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            Some(trimmed)
        } else {
            None
        }
    }

    /// Last few stderr lines, for error messages
    pub fn stderr_tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.stderr.lines().collect();
        let skip = all.len().saturating_sub(lines);
        all[skip..].join("\n")
    }
}

fn strip_code_fence(s: &str) -> &str {
    let s = s.trim();
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str) -> AgentOutput {
        AgentOutput::new(stdout.to_string(), String::new(), 0, Duration::ZERO)
    }

    #[test]
    fn test_tagged_block_extracted() {
        let out = output("Thinking...\n<audit>\n{\"a\": 1}\n</audit>\nbye");
        assert_eq!(out.tagged_block("audit"), Some("{\"a\": 1}"));
        assert_eq!(out.tagged_block("research"), None);
    }

    #[test]
    fn test_tagged_block_requires_closing_tag_after_open() {
        let out = output("</audit> stray <audit>{}");
        assert_eq!(out.tagged_block("audit"), None);
    }

    #[test]
    fn test_json_payload_falls_back_to_bare_json() {
        let out = output("  {\"title\": \"x\"}\n");
        assert_eq!(out.json_payload("research"), Some("{\"title\": \"x\"}"));

        let out = output("no json here");
        assert_eq!(out.json_payload("research"), None);
    }

    #[test]
    fn test_json_payload_strips_code_fence() {
        let out = output("<research>\n```json\n{\"k\": true}\n```\n</research>");
        assert_eq!(out.json_payload("research"), Some("{\"k\": true}"));

        let out = output("```json\n{\"k\": false}\n```");
        assert_eq!(out.json_payload("research"), Some("{\"k\": false}"));
    }

    #[test]
    fn test_stderr_tail() {
        let out = AgentOutput::new(
            String::new(),
            "one\ntwo\nthree".to_string(),
            1,
            Duration::from_millis(5),
        );
        assert!(!out.success());
        assert_eq!(out.stderr_tail(2), "two\nthree");
        assert_eq!(out.stderr_tail(10), "one\ntwo\nthree");
    }
}
