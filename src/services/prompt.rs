//! System prompt composition and query augmentation.

/// Retrieved context is cut to this many characters before use.
pub const MAX_CONTEXT_CHARS: usize = 1000;

const PERSONA: &str = "You are an AI assistant designed to be helpful, harmless, and honest.";

const KNOWLEDGE_BASE_RULES: [&str; 4] = [
    "- ONLY provide information that is explicitly available in the knowledge base",
    "- If the information is not in the knowledge base, CLEARLY state that",
    "- DO NOT make up or infer information",
    "- DO NOT use your general knowledge unless confirmed by the knowledge base",
];

const TOOL_RULES: [&str; 3] = [
    "- You have access to external tools that can help you answer questions",
    "- Use these tools when appropriate to gather information",
    "- Format tool parameters as valid JSON",
];

/// Effective system prompt for an agent.
pub fn build_system_prompt(role: &str, has_knowledge_bases: bool, has_tools: bool) -> String {
    let mut lines = vec![PERSONA.to_string(), format!("Your primary role: {role}")];

    if has_knowledge_bases {
        lines.push(String::new());
        lines.push("IMPORTANT KNOWLEDGE BASE INSTRUCTIONS:".to_string());
        lines.extend(KNOWLEDGE_BASE_RULES.iter().map(ToString::to_string));
    }

    if has_tools {
        lines.push(String::new());
        lines.push("IMPORTANT TOOLS INSTRUCTIONS:".to_string());
        lines.extend(TOOL_RULES.iter().map(ToString::to_string));
    }

    lines.join("\n")
}

/// First [`MAX_CONTEXT_CHARS`] characters of `context`.
pub fn truncate_context(context: &str) -> &str {
    match context.char_indices().nth(MAX_CONTEXT_CHARS) {
        Some((byte_index, _)) => &context[..byte_index],
        None => context,
    }
}

/// The query sent to the model, and whether retrieved context was used.
pub fn augment_query(query: &str, context: Option<&str>) -> (String, bool) {
    match context.filter(|c| !c.trim().is_empty()) {
        Some(context) => (
            format!(
                "I need information about: {query}\n\nHere's some context that might help:\n{}\n\nPlease use this context to provide a comprehensive answer.",
                truncate_context(context)
            ),
            true,
        ),
        None => (query.to_string(), false),
    }
}
