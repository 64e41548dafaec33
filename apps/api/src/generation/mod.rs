// AI drafting for the editor: summaries and work-experience entries.
// All LLM calls go through llm_client.

pub mod handlers;
pub mod prompts;
pub mod summary;
pub mod work_experience;
