//! System prompt and per-turn memory context.

use solace_ai::MemoryRecord;

/// Listener persona sent ahead of every model call.
pub const SYSTEM_PROMPT: &str = include_str!("../assets/system_prompt.md");

/// Shown under every interactive session.
pub const DISCLAIMER: &str =
    "This is a support tool, not a replacement for professional therapy.";

/// Build the user message content: remembered snippets, then the raw text.
///
/// ```text
/// Past context about the user:
/// ["ID: <id> Memory: <text>", ...]
///
/// User: <text>
/// ```
pub fn format_memory_context(memories: &[MemoryRecord], user_text: &str) -> String {
    let snippets: Vec<String> = memories.iter().map(MemoryRecord::snippet).collect();
    let encoded = serde_json::to_string(&snippets).unwrap_or_else(|_| "[]".to_string());
    format!("Past context about the user:\n{encoded}\n\nUser: {user_text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_memories_render_empty_list() {
        let content = format_memory_context(&[], "I feel anxious today");
        assert_eq!(
            content,
            "Past context about the user:\n[]\n\nUser: I feel anxious today"
        );
    }

    #[test]
    fn test_memories_are_json_encoded() {
        let memories = vec![
            MemoryRecord {
                id: "1".to_string(),
                memory: "Has a \"big\" exam".to_string(),
                score: Some(0.4),
            },
            MemoryRecord {
                id: "2".to_string(),
                memory: "Sleeps badly".to_string(),
                score: None,
            },
        ];
        let content = format_memory_context(&memories, "hi");
        let list_line = content.lines().nth(1).unwrap();
        let decoded: Vec<String> = serde_json::from_str(list_line).unwrap();
        assert_eq!(
            decoded,
            vec![
                "ID: 1 Memory: Has a \"big\" exam".to_string(),
                "ID: 2 Memory: Sleeps badly".to_string()
            ]
        );
        assert!(content.ends_with("\n\nUser: hi"));
    }

    #[test]
    fn test_system_prompt_is_embedded() {
        assert!(SYSTEM_PROMPT.contains("listener"));
        assert!(SYSTEM_PROMPT.contains("run_command"));
    }
}
