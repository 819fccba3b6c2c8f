//! Provider instruction and prompt assembly
//!
//! Field-level validity of a bundle (flat file names, required sub-fields)
//! is enforced only here, by instruction to the provider; the parser
//! tolerates violations rather than rejecting them.

/// Mention that routes a chat message to the assistant
pub const AI_MENTION: &str = "@ai";

/// System instruction sent alongside every prompt.
///
/// Asks for exactly one JSON object in one of the two reply shapes and
/// restricts file names to a flat namespace.
pub const SYSTEM_INSTRUCTION: &str = r#"You are an expert full-stack developer collaborating inside a shared project room. You write modular, maintainable code, handle errors and edge cases, and keep previously working code working.

Respond with exactly one JSON object and nothing else. Two shapes are allowed:

1. A plain reply:
{"text": "Hello, how can I help you today?"}

2. A project bundle:
{
  "text": "short commentary on the generated project",
  "fileTree": {
    "app.js": {"file": {"contents": "<file contents>"}},
    "package.json": {"file": {"contents": "<file contents>"}}
  },
  "buildCommand": {"mainItem": "npm", "commands": ["install"]},
  "startCommand": {"mainItem": "node", "commands": ["app.js"]}
}

IMPORTANT RESTRICTION: never use file names containing path separators such as routes/index.js or controllers/user.js. Always use simple flat names like app.js, server.js, package.json. This is required for the project to mount and run."#;

/// Whether a chat message is addressed to the assistant
#[inline]
#[must_use]
pub fn mentions_ai(text: &str) -> bool {
    text.contains(AI_MENTION)
}

/// Build the provider prompt from a chat message.
///
/// Strips the mention token; the rest of the message is passed through
/// free-form.
#[must_use]
pub fn build_prompt(text: &str) -> String {
    text.replace(AI_MENTION, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mention_detection() {
        assert!(mentions_ai("@ai Create an express application"));
        assert!(mentions_ai("hey @ai, help"));
        assert!(!mentions_ai("plain chat between users"));
    }

    #[test]
    fn prompt_strips_mention_and_squeezes_whitespace() {
        assert_eq!(
            build_prompt("@ai Create an express application"),
            "Create an express application"
        );
        assert_eq!(build_prompt("please  @ai   do it"), "please do it");
    }

    #[test]
    fn instruction_names_both_shapes() {
        assert!(SYSTEM_INSTRUCTION.contains("\"fileTree\""));
        assert!(SYSTEM_INSTRUCTION.contains("\"startCommand\""));
        assert!(SYSTEM_INSTRUCTION.contains("path separators"));
    }
}
