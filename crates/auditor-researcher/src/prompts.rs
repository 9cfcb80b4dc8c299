use auditor_schema::{AuditFeedback, ResearchOutput};

use crate::ResearchRequest;

const OUTPUT_FORMAT: &str = r#"## Output Format

Respond with a single JSON document wrapped in a research block:

<research>
{
  "title": "Title of the analyzed document",
  "summary": ["3 to 6 executive summary bullets"],
  "claims": [
    {
      "id": "C1",
      "text": "Short, testable claim",
      "evidence": [{"quote": "Verbatim excerpt", "location": "optional pointer"}],
      "notes": "Optional limitations"
    }
  ],
  "open_questions": ["Statements you could not support with a quote"],
  "confidence_score": 0.0
}
</research>"#;

/// Prompt templates for the researcher
pub struct ResearcherPrompts;

impl ResearcherPrompts {
    pub fn build_prompt(request: &ResearchRequest<'_>) -> String {
        match (request.prior_research, request.feedback) {
            (Some(prior), Some(feedback)) => {
                Self::build_revision_prompt(request.raw_input, prior, feedback)
            }
            _ => Self::build_initial_prompt(request.raw_input),
        }
    }

    pub fn build_initial_prompt(raw_input: &str) -> String {
        format!(
            r#"You are a senior researcher. Extract technical facts ONLY from the raw text below.

## Rules
1. Do not introduce facts that the quotes do not support.
2. Every claim needs at least one verbatim supporting quote.
3. Claims you cannot support belong in open_questions.
4. Provide at least 3 claims.

## Raw Text
```
{raw_input}
```

{format}"#,
            raw_input = raw_input,
            format = OUTPUT_FORMAT,
        )
    }

    pub fn build_revision_prompt(
        raw_input: &str,
        prior: &ResearchOutput,
        feedback: &AuditFeedback,
    ) -> String {
        let prior_json = serde_json::to_string_pretty(prior).unwrap_or_default();
        let issues = if feedback.issues.is_empty() {
            "- (no itemized issues)".to_string()
        } else {
            feedback
                .issues
                .iter()
                .map(|issue| {
                    let claim = issue
                        .claim_id
                        .as_deref()
                        .map(|id| format!(" [{}]", id))
                        .unwrap_or_default();
                    format!(
                        "- {} {:?}/{:?}{}: {}",
                        issue.id, issue.severity, issue.category, claim, issue.fix_guidance
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"You are a senior researcher revising your draft after an audit.

## Rules
1. Address every auditor issue explicitly.
2. Keep changes minimal: fix issues without rewriting unrelated claims.
3. Every claim needs at least one verbatim supporting quote from the raw text.
4. Move claims you cannot support to open_questions.

## Raw Text
```
{raw_input}
```

## Prior Draft
```json
{prior_json}
```

## Auditor Verdict
{verdict}: {summary}

## Auditor Issues
{issues}

## Next Action
{next_action}

{format}"#,
            raw_input = raw_input,
            prior_json = prior_json,
            verdict = feedback.verdict,
            summary = feedback.summary,
            issues = issues,
            next_action = feedback.next_action,
            format = OUTPUT_FORMAT,
        )
    }
}
