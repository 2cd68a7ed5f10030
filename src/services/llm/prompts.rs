//! Prompt templates for study-material generation.
//!
//! Every structured prompt asks for a bare JSON array so the output can go
//! through `parse_json_array`.

use crate::models::QuizType;

pub fn quiz_prompt(text: &str, quiz_type: QuizType) -> String {
    let (instructions, schema) = match quiz_type {
        QuizType::MultipleChoice => (
            "Create 5 multiple choice questions. Each question must have exactly 4 options and one correct answer.",
            r#"[{"type": "multiple_choice", "question": "...", "options": ["A", "B", "C", "D"], "answer": "A"}]"#,
        ),
        QuizType::ShortAnswer => (
            "Create 5 short answer questions that can be answered in one or two sentences.",
            r#"[{"type": "short_answer", "question": "...", "answer": "..."}]"#,
        ),
        QuizType::TrueFalse => (
            "Create 5 true/false statements. Mix true and false statements.",
            r#"[{"type": "true_false", "question": "...", "answer": true}]"#,
        ),
        QuizType::All => (
            "Create 6 questions: 2 multiple choice (4 options each), 2 short answer and 2 true/false.",
            r#"[{"type": "multiple_choice", "question": "...", "options": ["A", "B", "C", "D"], "answer": "A"}, {"type": "short_answer", "question": "...", "answer": "..."}, {"type": "true_false", "question": "...", "answer": false}]"#,
        ),
    };

    format!(
        "You are a helpful study assistant. Based on the study notes below, {instructions}\n\
         Only use facts stated in the notes.\n\
         Respond with ONLY a JSON array in this exact format, with no other text:\n\
         {schema}\n\n\
         Study notes:\n\
         \"\"\"\n{text}\n\"\"\"\n",
        instructions = lowercase_first(instructions),
        schema = schema,
        text = text,
    )
}

pub fn flashcards_prompt(text: &str) -> String {
    format!(
        "You are a helpful study assistant. Create 8 flashcards from the study notes below. \
         Each flashcard has a short term or question on the front and a concise explanation on the back.\n\
         Respond with ONLY a JSON array in this exact format, with no other text:\n\
         [{{\"front\": \"...\", \"back\": \"...\"}}]\n\n\
         Study notes:\n\
         \"\"\"\n{}\n\"\"\"\n",
        text
    )
}

pub fn summary_prompt(text: &str) -> String {
    format!(
        "You are a helpful study assistant. Summarize the study notes below in 3 to 5 short paragraphs \
         a student can review before an exam. Highlight key terms and definitions. \
         Respond with the summary only.\n\n\
         Study notes:\n\
         \"\"\"\n{}\n\"\"\"\n",
        text
    )
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_prompt_embeds_notes_and_schema() {
        let prompt = quiz_prompt("AI stands for Artificial Intelligence.", QuizType::TrueFalse);
        assert!(prompt.contains("AI stands for Artificial Intelligence."));
        assert!(prompt.contains("true/false"));
        assert!(prompt.contains(r#""type": "true_false""#));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_quiz_prompt_mixed_types() {
        let prompt = quiz_prompt("notes", QuizType::All);
        assert!(prompt.contains("multiple_choice"));
        assert!(prompt.contains("short_answer"));
        assert!(prompt.contains("true_false"));
    }

    #[test]
    fn test_flashcards_prompt_has_literal_braces() {
        let prompt = flashcards_prompt("notes");
        assert!(prompt.contains(r#"[{"front": "...", "back": "..."}]"#));
    }

    #[test]
    fn test_lowercase_first() {
        assert_eq!(lowercase_first("Create 5"), "create 5");
        assert_eq!(lowercase_first(""), "");
    }
}
