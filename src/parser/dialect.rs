//! Locale-specific conventions of a chat export.
//!
//! The exporter localises two things the parser depends on: the label inside
//! attachment markers (`<adjunt: foto.jpg>`, `<attached: foto.jpg>`) and the
//! wording of system notices. Both are explicit, named policy here instead of
//! being guessed from content.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Left-to-right mark prefixed by the exporter to markers and system senders.
pub const DIRECTIONAL_MARK: char = '\u{200e}';

/// Marker labels and system-notice keywords for one export language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDialect {
    /// Labels accepted inside attachment markers (`<LABEL: name>`).
    pub attachment_labels: Vec<String>,
    /// Lower-case keywords whose presence marks a system message.
    pub system_keywords: Vec<String>,
}

impl ExportDialect {
    /// Catalan exports (the default).
    pub fn catalan() -> Self {
        Self::from_lists(&["adjunt"], &["xifrats"])
    }

    /// English exports.
    pub fn english() -> Self {
        Self::from_lists(&["attached"], &["end-to-end encrypted"])
    }

    /// Spanish exports.
    pub fn spanish() -> Self {
        Self::from_lists(&["adjunto"], &["cifrados"])
    }

    /// Union of every built-in dialect.
    pub fn all() -> Self {
        let mut dialect = Self::catalan();
        for other in [Self::english(), Self::spanish()] {
            dialect = dialect.with_extra(&other.attachment_labels, &other.system_keywords);
        }
        dialect
    }

    /// Look up a built-in dialect by code (`ca`, `en`, `es`, `all`).
    ///
    /// Accepts locale-style codes such as `ca_ES` or `en-GB`.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-']).next().unwrap_or("");
        match prefix {
            "ca" => Some(Self::catalan()),
            "en" => Some(Self::english()),
            "es" => Some(Self::spanish()),
            "all" => Some(Self::all()),
            _ => None,
        }
    }

    /// Add labels and keywords, skipping blanks and duplicates.
    pub fn with_extra(mut self, labels: &[String], keywords: &[String]) -> Self {
        for label in labels {
            let label = label.trim();
            if !label.is_empty() && !self.attachment_labels.iter().any(|l| l == label) {
                self.attachment_labels.push(label.to_string());
            }
        }
        for keyword in keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !self.system_keywords.contains(&keyword) {
                self.system_keywords.push(keyword);
            }
        }
        self
    }

    /// Classify a message from its raw (unstripped) sender and cleaned content.
    pub fn is_system(&self, raw_sender: &str, content: &str) -> bool {
        if raw_sender.starts_with(DIRECTIONAL_MARK) {
            return true;
        }
        let lower = content.to_lowercase();
        self.system_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    fn from_lists(labels: &[&str], keywords: &[&str]) -> Self {
        Self {
            attachment_labels: labels.iter().map(|s| s.to_string()).collect(),
            system_keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for ExportDialect {
    fn default() -> Self {
        Self::catalan()
    }
}

/// What to do with a header whose timestamp matches no known format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Substitute the current local time.
    #[default]
    Now,
    /// Reuse the last successfully parsed timestamp (Unix epoch if none yet).
    Previous,
    /// Abort parsing with an error.
    Strict,
}

impl FromStr for TimestampPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "now" => Ok(Self::Now),
            "previous" => Ok(Self::Previous),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown timestamp policy '{other}' (expected now, previous or strict)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(ExportDialect::from_code("ca_ES"), Some(ExportDialect::catalan()));
        assert_eq!(ExportDialect::from_code("en-GB"), Some(ExportDialect::english()));
        assert!(ExportDialect::from_code("fr").is_none());
    }

    #[test]
    fn test_system_by_mark_or_keyword() {
        let d = ExportDialect::catalan();
        assert!(d.is_system("\u{200e}Marc", "hola"));
        assert!(d.is_system("Grup", "Els missatges estan XIFRATS d'extrem a extrem"));
        assert!(!d.is_system("Marc", "hola"));
    }

    #[test]
    fn test_all_contains_every_label() {
        let d = ExportDialect::all();
        for label in ["adjunt", "attached", "adjunto"] {
            assert!(d.attachment_labels.iter().any(|l| l == label));
        }
    }

    #[test]
    fn test_with_extra_dedups_and_lowercases() {
        let d = ExportDialect::catalan().with_extra(
            &["adjunt".into(), " ".into(), "fitxer".into()],
            &["Xifrats".into(), "SEGURETAT".into()],
        );
        assert_eq!(d.attachment_labels, vec!["adjunt", "fitxer"]);
        assert_eq!(d.system_keywords, vec!["xifrats", "seguretat"]);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Strict".parse::<TimestampPolicy>(), Ok(TimestampPolicy::Strict));
        assert!("sometimes".parse::<TimestampPolicy>().is_err());
    }
}
