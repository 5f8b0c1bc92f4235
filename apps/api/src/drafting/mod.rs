// Contract assistant: drafting, review, clause suggestion, compliance checking,
// comparison and categorization. Each task is one prompt template rendered from
// caller fields; all model calls go through llm_client.

pub mod handlers;
pub mod prompts;
pub mod tasks;
pub mod template;
