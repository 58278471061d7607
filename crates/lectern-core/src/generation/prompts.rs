//! Prompt templates for study-material generation.

use crate::types::{GenerationKind, Message};

/// System message sent with every generation request.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates educational content in JSON format.";

/// Prompt asking for multiple-choice questions.
pub const QUIZ_PROMPT: &str = r#"Create multiple-choice quiz questions from the lecture excerpt below.

Each question must test understanding of a concept stated in the excerpt. Give exactly four answer options per question, exactly one of which is correct. The correct answer must be copied verbatim from the options. Add a short explanation of why the answer is correct (at most 500 characters).

Cover every key point, concept, example and equation in the excerpt where possible. Format mathematical equations with Markdown.

Lecture excerpt:
{text}

Respond with a JSON object of this shape and nothing else:
{
  "questions": [
    {
      "question": "the question text",
      "options": ["option A", "option B", "option C", "option D"],
      "correctAnswer": "the correct option, exactly as written above",
      "explanation": "why this answer is correct"
    }
  ]
}"#;

/// Prompt asking for front/back flashcards.
pub const FLASHCARD_PROMPT: &str = r#"Create study flashcards from the lecture excerpt below.

Each card should cover one key term, definition, or fact from the excerpt. Keep the front short (a term or question) and the back a concise answer.

Cover every key point, concept, example and equation in the excerpt where possible. Format mathematical equations with Markdown.

Lecture excerpt:
{text}

Respond with a JSON object of this shape and nothing else:
{
  "flashcards": [
    {
      "front": "term or question",
      "back": "definition or answer"
    }
  ]
}"#;

/// User prompt for `kind` with `chunk` embedded.
pub fn prompt_for(kind: GenerationKind, chunk: &str) -> String {
    let template = match kind {
        GenerationKind::Quiz => QUIZ_PROMPT,
        GenerationKind::Flashcard => FLASHCARD_PROMPT,
    };
    template.replace("{text}", chunk)
}

/// Full message list for one generation call.
pub fn messages_for(prompt: &str) -> Vec<Message> {
    vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[test]
    fn test_prompt_embeds_chunk() {
        let prompt = prompt_for(GenerationKind::Quiz, "Osmosis is the diffusion of water.");
        assert!(prompt.contains("Osmosis is the diffusion of water."));
        assert!(prompt.contains("correctAnswer"));
        assert!(!prompt.contains("{text}"));

        let prompt = prompt_for(GenerationKind::Flashcard, "ATP stores energy.");
        assert!(prompt.contains("\"flashcards\""));
    }

    #[test]
    fn test_prompts_ask_for_full_coverage_and_markdown_math() {
        for kind in [GenerationKind::Quiz, GenerationKind::Flashcard] {
            let prompt = prompt_for(kind, "E = mc^2");
            assert!(prompt.contains("Cover every key point"));
            assert!(prompt.contains("equations with Markdown"));
        }
    }

    #[test]
    fn test_messages_for() {
        let messages = messages_for("hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content, "hello");
    }
}
