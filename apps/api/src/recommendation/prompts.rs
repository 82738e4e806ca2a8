// All LLM prompt constants for the recommendation pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for assessment generation — enforces JSON-only output.
pub const ASSESSMENT_SYSTEM: &str = "You are an expert career strategist producing a \
    structured readiness assessment grounded in a provided list of candidate roles. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT reference roles outside the provided candidate list.";

/// Assessment prompt template.
/// Replace: {grounding_instruction}, {profile_json}, {candidates_json}
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

USER PROFILE:
{profile_json}

CANDIDATE ROLES (source of truth — reference ONLY these, by exact role_id):
{candidates_json}

Assess the user's readiness for a transition into the candidate roles and
produce an action plan. Return a JSON object with this EXACT schema:
{
  "confidence": "low" | "medium" | "high",
  "factors": [
    {"name": "Skill alignment", "score": 72, "evidence": "Excel overlaps the analyst core skills"}
  ],
  "role_matches": [
    {"role_id": "the-exact-role_id-from-candidates", "rationale": "why this role is adjacent"}
  ],
  "plan": [
    {"horizon": "30_days", "tasks": ["..."]},
    {"horizon": "60_days", "tasks": ["..."]},
    {"horizon": "90_days", "tasks": ["..."]}
  ],
  "immediate_actions": ["..."],
  "plan_confidence": {"level": "low" | "medium" | "high", "improvement_hint": "..."}
}

HARD RULES:
1. EVERY role_id in `role_matches` MUST be copied verbatim from the candidate list
2. Provide at least 5 factors, each scored 0-100 with concrete evidence
3. Every plan horizon must appear exactly once with 3-5 tasks
4. Prefer tasks adapted from the candidates' starter plans over generic advice
5. Do NOT invent roles, employers, or credentials not present in the input"#;

/// System prompt for project-brief generation.
pub const BRIEFS_SYSTEM: &str = "You are an expert career coach turning candidate roles \
    into concrete portfolio project briefs. \
    You MUST respond with valid JSON only — a JSON array of brief objects. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// Project-brief prompt template.
/// Replace: {grounding_instruction}, {profile_json}, {candidates_json}
pub const BRIEFS_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

USER PROFILE:
{profile_json}

CANDIDATE ROLES (source of truth — target ONLY these, by exact role_id):
{candidates_json}

Propose portfolio project briefs that would demonstrate readiness for the
candidate roles. Return a JSON ARRAY:
[
  {
    "title": "...",
    "target_role_id": "the-exact-role_id-from-candidates",
    "summary": "what to build and why it proves readiness",
    "deliverables": ["..."]
  }
]

HARD RULES:
1. EVERY target_role_id MUST be copied verbatim from the candidate list
2. When a candidate role lists proof projects, your `title` MUST be one of those
   titles, copied verbatim — do not rename or embellish them
3. One brief per relevant role; skip roles with nothing concrete to build"#;
