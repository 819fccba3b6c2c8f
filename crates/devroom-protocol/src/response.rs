//! The AI reply as a tagged variant
//!
//! A reply is either plain text or a project bundle; the discriminator is
//! the presence of a `fileTree` field, nothing else. Consumers match the
//! variant exhaustively, so a bundle can never be half-handled as text.

use devroom_tree::{is_flat_name, FileTree};
use serde::{Deserialize, Serialize};

/// One runnable command of a bundle.
///
/// Wire names follow the persisted AI contract: the program is `mainItem`,
/// the arguments ride in `commands`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCommand {
    /// Program to execute, e.g. `npm`
    #[serde(rename = "mainItem")]
    pub program: String,
    /// Arguments, e.g. `["install"]`
    #[serde(rename = "commands", default)]
    pub args: Vec<String>,
}

impl RunCommand {
    /// Create a command
    #[inline]
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for RunCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A generated project: commentary, file tree, and how to run it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBundle {
    /// Commentary shown in the transcript
    #[serde(default)]
    pub text: String,
    /// Full replacement tree; never merged into the local one
    pub file_tree: FileTree,
    /// Install step, run to completion before the server starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<RunCommand>,
    /// Server start step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_command: Option<RunCommand>,
}

/// Why a payload failed to parse as an AI reply
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Not JSON at all
    #[error("payload is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    /// JSON, but not an object
    #[error("payload is valid JSON but not an object")]
    NotAnObject,
}

/// The assistant's reply, one of two shapes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AiResponse {
    /// Plain text reply; leaves the file tree untouched
    Text {
        /// Reply text
        text: String,
    },
    /// Full project bundle; replaces the file tree wholesale
    ProjectBundle(ProjectBundle),
}

impl AiResponse {
    /// Parse a payload, discriminating on `fileTree` presence.
    ///
    /// Non-object payloads are rejected. An object without `fileTree` is a
    /// text reply even if other bundle fields are present; a missing `text`
    /// defaults to empty. Bundle file names that carry path separators are
    /// tolerated and logged, never sanitized.
    pub fn parse(payload: &str) -> Result<Self, ParseError> {
        let value: serde_json::Value = serde_json::from_str(payload)?;
        let object = value.as_object().ok_or(ParseError::NotAnObject)?;

        if object.contains_key("fileTree") {
            let bundle: ProjectBundle = serde_json::from_value(value)?;
            for name in bundle.file_tree.flat_violations() {
                tracing::warn!(%name, "bundle file name violates the flat-namespace rule; passing through");
            }
            return Ok(Self::ProjectBundle(bundle));
        }

        let text = object
            .get("text")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned();
        Ok(Self::Text { text })
    }

    /// The commentary text of either variant
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::ProjectBundle(bundle) => &bundle.text,
        }
    }

    /// The bundle, when this reply carries one
    #[inline]
    #[must_use]
    pub fn bundle(&self) -> Option<&ProjectBundle> {
        match self {
            Self::Text { .. } => None,
            Self::ProjectBundle(bundle) => Some(bundle),
        }
    }

    /// Serialize back to the wire shape
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("AI response serializes")
    }

    /// Check that a file name honors the flat-namespace rule
    #[inline]
    #[must_use]
    pub fn is_flat_file_name(name: &str) -> bool {
        is_flat_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_reply_parses() {
        let reply = AiResponse::parse(r#"{"text":"Hello, how can I help you today?"}"#).unwrap();
        assert_eq!(
            reply,
            AiResponse::Text {
                text: "Hello, how can I help you today?".to_owned()
            }
        );
        assert!(reply.bundle().is_none());
    }

    #[test]
    fn missing_text_defaults_to_empty() {
        let reply = AiResponse::parse(r#"{"unexpected": 1}"#).unwrap();
        assert_eq!(reply.text(), "");
    }

    #[test]
    fn bundle_discriminated_by_file_tree_presence() {
        let payload = r#"{
            "text": "your express server",
            "fileTree": {"app.js": {"file": {"contents": "code"}}},
            "buildCommand": {"mainItem": "npm", "commands": ["install"]},
            "startCommand": {"mainItem": "node", "commands": ["app.js"]}
        }"#;
        let reply = AiResponse::parse(payload).unwrap();
        let bundle = reply.bundle().expect("bundle variant");
        assert_eq!(bundle.text, "your express server");
        assert_eq!(bundle.file_tree.get("app.js"), Some("code"));
        assert_eq!(
            bundle.build_command,
            Some(RunCommand::new("npm", ["install"]))
        );
        assert_eq!(
            bundle.start_command,
            Some(RunCommand::new("node", ["app.js"]))
        );
    }

    #[test]
    fn bundle_without_commands_still_parses() {
        let payload = r#"{"text":"t","fileTree":{}}"#;
        let bundle = AiResponse::parse(payload).unwrap();
        let bundle = bundle.bundle().unwrap();
        assert!(bundle.build_command.is_none());
        assert!(bundle.start_command.is_none());
    }

    #[test]
    fn non_object_payload_rejected() {
        assert!(matches!(
            AiResponse::parse("[1, 2, 3]"),
            Err(ParseError::NotAnObject)
        ));
        assert!(matches!(
            AiResponse::parse("not json"),
            Err(ParseError::Syntax(_))
        ));
    }

    #[test]
    fn separator_names_tolerated_not_sanitized() {
        let payload = r#"{"text":"t","fileTree":{"routes/index.js":{"file":{"contents":"x"}}}}"#;
        let reply = AiResponse::parse(payload).unwrap();
        let bundle = reply.bundle().unwrap();
        // Passed through untouched, flagged only in the logs.
        assert!(bundle.file_tree.contains("routes/index.js"));
    }

    #[test]
    fn wire_round_trip_keeps_field_names() {
        let bundle = AiResponse::ProjectBundle(ProjectBundle {
            text: "t".to_owned(),
            file_tree: FileTree::from_iter([("app.js".to_owned(), "x".to_owned())]),
            build_command: Some(RunCommand::new("npm", ["install"])),
            start_command: Some(RunCommand::new("node", ["app.js"])),
        });

        let json: serde_json::Value = serde_json::from_str(&bundle.to_json()).unwrap();
        assert_eq!(json["buildCommand"]["mainItem"], "npm");
        assert_eq!(json["buildCommand"]["commands"][0], "install");
        assert_eq!(json["startCommand"]["mainItem"], "node");
        assert_eq!(json["fileTree"]["app.js"]["file"]["contents"], "x");

        let back = AiResponse::parse(&bundle.to_json()).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn run_command_display() {
        assert_eq!(
            RunCommand::new("npm", ["run", "dev"]).to_string(),
            "npm run dev"
        );
    }
}
