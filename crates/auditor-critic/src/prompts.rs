use auditor_schema::ResearchOutput;

/// Prompt templates for the critic
pub struct CriticPrompts;

impl CriticPrompts {
    /// Build the audit prompt for a research output
    pub fn build_audit_prompt(research: &ResearchOutput) -> String {
        let research_json = serde_json::to_string_pretty(research).unwrap_or_default();

        format!(
            r#"You are a strict research auditor. Verify that every claim below is supported by its own quoted evidence.

## Research Under Review
```json
{research_json}
```

## How to Audit
- A claim is supported only if its quotes state it directly.
- Flag anything the quotes do not say (UNSUPPORTED_CLAIM), say only weakly (WEAK_SUPPORT), or stretch beyond (OVER_INFERENCE).
- Flag missing qualifiers (MISSING_CONTEXT), conflicts between claims (CONTRADICTION) and ambiguous phrasing (UNCLEAR_WORDING).
- Severity: MUST_FIX blocks approval, SHOULD_FIX lowers confidence, NIT is cosmetic.
- Use verdict FAIL only when the source material cannot support any research at all.

## Output Format

<audit>
{{
  "supported_claims": 0,
  "issues": [
    {{
      "id": "I1",
      "severity": "MUST_FIX",
      "category": "UNSUPPORTED_CLAIM",
      "claim_id": "C1",
      "evidence": "Optional excerpt",
      "fix_guidance": "What the researcher should change"
    }}
  ],
  "summary": "One or two sentences explaining your judgment",
  "next_action": "Concrete guidance for the next revision"
}}
</audit>

This research has {claims} claims."#,
            research_json = research_json,
            claims = research.claims.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auditor_schema::{Claim, Evidence};

    #[test]
    fn test_prompt_embeds_research() {
        let research = ResearchOutput {
            title: "Cooling report".to_string(),
            summary: vec!["a".into(), "b".into(), "c".into()],
            claims: vec![
                Claim::new("C1", "one", vec![Evidence::new("q1")]),
                Claim::new("C2", "two", vec![Evidence::new("q2")]),
            ],
            open_questions: vec![],
            confidence_score: 0.5,
        };

        let prompt = CriticPrompts::build_audit_prompt(&research);
        assert!(prompt.contains("\"title\": \"Cooling report\""));
        assert!(prompt.contains("<audit>"));
        assert!(prompt.contains("\"supported_claims\": 0"));
        assert!(prompt.contains("This research has 2 claims."));
    }
}
