// Cross-cutting prompt fragments shared by every generation call.
// Each pipeline that talks to the LLM defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Baseline grounding instruction included in every generation prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Every role you reference must be one of the candidate roles \
    provided in the context, identified by its exact `role_id`. \
    Do NOT invent roles, do NOT paraphrase role identifiers, and do NOT \
    reference roles outside the provided list. \
    If no provided role supports a claim, omit the claim entirely.";

/// Escalated instruction appended when a previous attempt referenced roles
/// outside the grounding set. Sent only by the retry controller.
pub const REINFORCED_GROUNDING_INSTRUCTION: &str = "\
    YOUR PREVIOUS ANSWER WAS REJECTED because it referenced roles that were \
    not in the candidate list. Every `role_id` in your response MUST be copied \
    verbatim from the provided candidate roles. Responses referencing any \
    other identifier will be rejected again.";
