use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Builds the two-message prompt: a system instruction with the schema
/// interpolated verbatim, and the user's question untouched. The question is
/// plain prompt text here, never SQL; only the model's output is executed.
pub fn build_messages(schema_text: &str, question: &str) -> Vec<ChatMessage> {
    let system = format!(
        r#"You are a text-to-SQL converter for a vehicle parts catalog.
Translate the user's question into a single SQL query for the schema below.
Adhere to these rules:
- Return only SQL, with no explanation or commentary
- Use uppercase for SQL keywords (SELECT, FROM, WHERE, etc.)
- Use table aliases to prevent ambiguity, for example `SELECT m.name FROM models m JOIN makes mk ON m.make_id = mk.make_id`
- When creating a ratio, always cast the numerator as float

### Schema:
{}"#,
        schema_text
    );

    vec![
        ChatMessage {
            role: Role::System,
            content: system,
        },
        ChatMessage {
            role: Role::User,
            content: question.to_string(),
        },
    ]
}
