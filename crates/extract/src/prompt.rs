pub fn build_entity_prompt(question: &str) -> String {
    format!(
        r#"Extract organization and person etc entities from the text.

INSTRUCTIONS:
1. Identify every person, organization, business, product or place mentioned
2. Copy each name exactly as written in the text
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{"names": ["EntityName", "OtherEntity"]}}

If the text mentions no entities, output {{"names": []}}

Extract all the entities from the following input: {}

JSON OUTPUT:"#,
        question
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_prompt_embeds_question() {
        let prompt = build_entity_prompt("Who founded Acme?");
        assert!(prompt.contains("Who founded Acme?"));
        assert!(prompt.contains(r#"{"names": []}"#));
    }
}
