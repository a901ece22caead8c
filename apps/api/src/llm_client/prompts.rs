//! Prompts for the match-scoring call.

pub const MATCH_SCORE_SYSTEM: &str = "You are a recruiting assistant that rates how well a \
candidate matches a job posting. Respond with a single integer from 0 to 100 and nothing else.";

pub const MATCH_SCORE_PROMPT_TEMPLATE: &str = "\
Candidate resume summary:
{resume}

Job posting:
{job}

Rate the candidate's fit for this job from 0 (no fit) to 100 (perfect fit). \
Reply with the integer only.";
