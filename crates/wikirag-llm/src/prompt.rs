use wikirag_core::types::ScoredChunk;

pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant that answers questions based on the provided context.";

pub const NO_ANSWER: &str = "I cannot find a specific answer in the provided context.";

/// User message for one query. Context chunks keep their ranked order and are
/// separated by a blank line.
pub fn build_user_prompt(query: &str, context: &[ScoredChunk]) -> String {
    let context_text = context.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!(
        "Based on the following context, please answer the question.\n\
         If the answer cannot be found in the context, say \"{NO_ANSWER}\"\n\
         \n\
         Context:\n\
         {context_text}\n\
         \n\
         Question: {query}\n\
         \n\
         Answer:"
    )
}
