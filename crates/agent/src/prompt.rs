//! Prompt text: the persona system message and the fusion delimiters.

use archie_core::persona::Persona;

pub const MEMORY_OPEN: &str = "<MEMORY>";
pub const MEMORY_CLOSE: &str = "</MEMORY>";
pub const LOGICAL_OPEN: &str = "<LOGICAL>";
pub const LOGICAL_CLOSE: &str = "</LOGICAL>";
pub const CREATIVE_OPEN: &str = "<CREATIVE>";
pub const CREATIVE_CLOSE: &str = "</CREATIVE>";

const MEMORIES_HEADING: &str = "Your relevant memories:";

/// The persona line that opens every system message.
pub fn persona_prompt(persona: &Persona) -> String {
    format!(
        "You are {}. User = {}. Bio: {}. Personality: {}.",
        persona.ai_name, persona.user_name, persona.bio, persona.personality
    )
}

/// Append recalled memories to a system prompt, separated by blank lines.
pub fn with_memories(system: &str, memories: &[String]) -> String {
    if memories.is_empty() {
        return system.to_string();
    }
    format!("{system}\n{MEMORIES_HEADING}\n{}", memories.join("\n\n"))
}

fn tagged(open: &str, body: &str, close: &str) -> String {
    format!("{open}{body}{close}")
}

/// The digest wrapped for the analyze stage.
pub fn memory_block(digest: &str) -> String {
    tagged(MEMORY_OPEN, digest, MEMORY_CLOSE)
}

/// Digest and both drafts, each in its own delimiters, for the synthesizer.
pub fn fusion_block(digest: &str, logical: &str, creative: &str) -> String {
    [
        memory_block(digest),
        tagged(LOGICAL_OPEN, logical, LOGICAL_CLOSE),
        tagged(CREATIVE_OPEN, creative, CREATIVE_CLOSE),
    ]
    .concat()
}

/// Extract the text between `open` and `close`, if both are present.
pub fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = start + text[start..].find(close)?;
    Some(&text[start..end])
}

/// The prompt sent for a file upload.
pub fn file_prompt(instruction: &str, content: &str) -> String {
    format!("{instruction}\n\n```text\n{content}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persona_line() {
        let persona = Persona {
            user_name: "Ada".into(),
            ai_name: "Archie".into(),
            bio: "engineer".into(),
            personality: "dry wit".into(),
        };
        assert_eq!(
            persona_prompt(&persona),
            "You are Archie. User = Ada. Bio: engineer. Personality: dry wit."
        );
    }

    #[test]
    fn memories_joined_with_blank_lines() {
        let text = with_memories("You are Archie.", &["one".into(), "two".into()]);
        assert_eq!(text, "You are Archie.\nYour relevant memories:\none\n\ntwo");
        assert_eq!(with_memories("You are Archie.", &[]), "You are Archie.");
    }

    #[test]
    fn fusion_block_keeps_parts_apart() {
        let block = fusion_block("S", "L", "C");
        assert_eq!(
            block,
            "<MEMORY>S</MEMORY><LOGICAL>L</LOGICAL><CREATIVE>C</CREATIVE>"
        );
        assert_eq!(between(&block, MEMORY_OPEN, MEMORY_CLOSE), Some("S"));
        assert_eq!(between(&block, LOGICAL_OPEN, LOGICAL_CLOSE), Some("L"));
        assert_eq!(between(&block, CREATIVE_OPEN, CREATIVE_CLOSE), Some("C"));
        assert_eq!(between("no tags", MEMORY_OPEN, MEMORY_CLOSE), None);
    }

    #[test]
    fn file_prompt_fences_content() {
        assert_eq!(
            file_prompt("Review this", "fn main() {}"),
            "Review this\n\n```text\nfn main() {}\n```"
        );
    }
}
