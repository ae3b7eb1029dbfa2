//! Prompt templates for the merge, debate, and research flows.
//!
//! All answer views handed to templates are anonymized: only positional
//! labels ("Answer A", "Expert B") appear in prompt content, never model ids.

use crate::debate::DebateRound;
use crate::merge::entities::AnonymizedAnswer;

/// Feedback substituted when the judge feedback call fails; the round
/// proceeds with it.
pub const GENERIC_FEEDBACK: &str =
    "Continue refining your answers for accuracy, clarity, and completeness.";

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt for the judge synthesis call.
    pub fn judge_system() -> &'static str {
        r#"You are the judge synthesizing several candidate answers into one final answer.
Your task is to:
1. Synthesize, not select: merge the strongest elements of every answer
2. Rewrite in your own voice; do not copy any answer verbatim
3. Use clear, structured formatting (headers and lists where they help)
4. Where answers contradict each other, resolve by accuracy, not by popularity"#
    }

    /// System prompt for judge synthesis in research mode.
    pub fn judge_system_research() -> &'static str {
        r#"You are the judge synthesizing several researched answers into one final answer.
Your task is to:
1. Synthesize, not select: merge the strongest elements of every answer
2. Rewrite in your own voice; do not copy any answer verbatim
3. Use clear, structured formatting (headers and lists where they help)
4. Where answers contradict each other, resolve by accuracy, not by popularity
5. Preserve source citations exactly in the form [Source N]
6. Do not introduce claims that no answer supports"#
    }

    /// User message for the judge call.
    ///
    /// When `rounds` is non-empty, the message is prefixed with an evolution
    /// context block listing each round's judge feedback so the judge
    /// understands the provenance of the final answers.
    pub fn judge_prompt(
        user_prompt: &str,
        answers: &[AnonymizedAnswer],
        rounds: &[DebateRound],
        research_summary: Option<&str>,
    ) -> String {
        let mut prompt = String::new();

        if !rounds.is_empty() {
            prompt.push_str("Evolution context: these answers were refined through debate.\n");
            for round in rounds {
                prompt.push_str(&format!(
                    "Round {} feedback: {}\n",
                    round.round_index, round.judge_feedback
                ));
            }
            prompt.push('\n');
        }

        if let Some(summary) = research_summary {
            prompt.push_str(&format!("Research summary: {}\n\n", summary));
        }

        prompt.push_str(&format!("Original question: {}\n\nCandidate answers:\n", user_prompt));
        for answer in answers {
            prompt.push_str(&format!("\n--- {} ---\n{}\n", answer.label, answer.content));
        }

        prompt.push_str(
            r#"
Produce the single best merged answer to the original question."#,
        );

        prompt
    }

    /// System prompt for the per-round judge feedback call.
    pub fn feedback_system() -> &'static str {
        r#"You are moderating a debate between anonymous experts.
Give short, directive feedback that tells them how to improve their answers."#
    }

    /// User message asking the judge for round feedback.
    pub fn feedback_prompt(question: &str, answers: &[AnonymizedAnswer]) -> String {
        let mut prompt = format!(
            r#"Question under debate: {}

Current answers:
"#,
            question
        );
        for answer in answers {
            prompt.push_str(&format!("\n--- {} ---\n{}\n", answer.label, answer.content));
        }
        prompt.push_str(
            r#"
In at most 100 words, give directive feedback: what is missing, what is wrong,
and what the experts should focus on in the next revision."#,
        );
        prompt
    }

    /// System prompt for a model refining its answer in round `round_index`.
    pub fn refine_system(round_index: usize, feedback: &str) -> String {
        format!(
            r#"You are an expert in refinement round {} of a moderated debate.
The moderator's feedback for this round:
{}

Revise your previous answer. Keep what is correct, fix what is not, and
address the feedback directly."#,
            round_index, feedback
        )
    }

    /// User message for a refinement call: the original question, the
    /// feedback, the other experts' answers, and the model's own previous
    /// answer.
    pub fn refine_prompt(
        question: &str,
        feedback: &str,
        others: &[AnonymizedAnswer],
        own_previous: &str,
    ) -> String {
        let mut prompt = format!(
            r#"Original question: {}

Moderator feedback: {}
"#,
            question, feedback
        );

        if !others.is_empty() {
            prompt.push_str("\nOther experts' current answers:\n");
            for other in others {
                prompt.push_str(&format!("\n--- {} ---\n{}\n", other.label, other.content));
            }
        }

        prompt.push_str(&format!(
            r#"
Your previous answer:
{}

Provide your revised answer."#,
            own_previous
        ));

        prompt
    }

    /// System prompt for the researched-answer fan-out.
    pub fn research_system(has_sources: bool) -> &'static str {
        if has_sources {
            r#"You are a research assistant answering from the provided sources.
Cite sources inline using the form [Source N]. Prioritize the research results
over your training knowledge, and be honest about gaps the sources leave open."#
        } else {
            r#"You are a research assistant. No external sources are available for this
query, so answer from your own knowledge and say clearly that no external
sources were consulted. Be honest about uncertainty."#
        }
    }

    /// User message for the researched-answer fan-out.
    pub fn research_prompt(question: &str, source_block: Option<&str>) -> String {
        match source_block {
            Some(block) => format!(
                r#"Research results:

{}

Question: {}

Answer the question using the research results above, citing them as [Source N]."#,
                block, question
            ),
            None => format!(
                r#"Question: {}

Answer from your own knowledge. No external sources are available."#,
                question
            ),
        }
    }
}
