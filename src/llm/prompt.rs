//! Response modes and their prompt templates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Builds a prompt from the assistant name and the user's message.
pub type PromptTemplate = fn(&str, &str) -> String;

/// Response style requested by the user.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Answer the question directly.
    #[default]
    Qa,
    /// Explain the topic simply, with examples.
    Explanation,
    /// Summarize the text with key points.
    Summary,
}

impl Mode {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qa => "qa",
            Self::Explanation => "explanation",
            Self::Summary => "summary",
        }
    }

    /// Look a mode up by name, falling back to [`Mode::Qa`] for unknown names.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    /// Template used for this mode.
    #[must_use]
    pub const fn template(self) -> PromptTemplate {
        match self {
            Self::Qa => qa_prompt,
            Self::Explanation => explanation_prompt,
            Self::Summary => summary_prompt,
        }
    }

    /// Wrap `message` in this mode's instructions.
    #[must_use]
    pub fn build_prompt(self, assistant_name: &str, message: &str) -> String {
        (self.template())(assistant_name, message)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "qa" => Ok(Self::Qa),
            "explanation" => Ok(Self::Explanation),
            "summary" => Ok(Self::Summary),
            _ => Err(value.to_string()),
        }
    }
}

impl From<&str> for Mode {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

fn qa_prompt(assistant_name: &str, message: &str) -> String {
    format!(
        "You are {assistant_name}, a helpful AI assistant designed for students.\n\
         Answer the following question clearly and concisely:\n\n\
         {message}\n\n\
         Provide a helpful, accurate answer:"
    )
}

fn explanation_prompt(assistant_name: &str, message: &str) -> String {
    format!(
        "You are {assistant_name}, a helpful AI assistant designed for students.\n\
         Explain the following topic in simple, easy-to-understand language with examples:\n\n\
         {message}\n\n\
         Provide a clear, detailed explanation suitable for students:"
    )
}

fn summary_prompt(assistant_name: &str, message: &str) -> String {
    format!(
        "You are {assistant_name}, a helpful AI assistant designed for students.\n\
         Create a concise summary of the following:\n\n\
         {message}\n\n\
         Provide a well-structured summary with key points:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_lookup() {
        assert_eq!(Mode::from_name("summary"), Mode::Summary);
        assert_eq!(Mode::from_name("Explanation"), Mode::Explanation);
        assert_eq!(Mode::from_name("qa"), Mode::Qa);
        assert_eq!(Mode::from_name("poetry"), Mode::Qa);
        assert_eq!(Mode::from_name(""), Mode::Qa);
        assert!("poetry".parse::<Mode>().is_err());
    }

    #[test]
    fn test_prompts_embed_message_and_differ() {
        let message = "Photosynthesis turns light into chemical energy.";
        let qa = Mode::Qa.build_prompt("Vecho Ai", message);
        let explanation = Mode::Explanation.build_prompt("Vecho Ai", message);
        let summary = Mode::Summary.build_prompt("Vecho Ai", message);

        for prompt in [&qa, &explanation, &summary] {
            assert!(prompt.starts_with("You are Vecho Ai"));
            assert!(prompt.contains(message));
        }
        assert!(qa.contains("Answer the following question"));
        assert!(explanation.contains("with examples"));
        assert!(summary.contains("key points"));
        assert_ne!(qa, summary);
    }

    #[test]
    fn test_mode_serde_names() {
        assert_eq!(serde_json::to_string(&Mode::Explanation).unwrap(), "\"explanation\"");
        let mode: Mode = serde_json::from_str("\"summary\"").unwrap();
        assert_eq!(mode, Mode::Summary);
        assert_eq!(Mode::Summary.to_string(), "summary");
    }
}
