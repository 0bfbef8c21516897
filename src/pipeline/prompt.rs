use std::fmt::Write;

/// Number the retrieved chunks into a context block for the prompt
#[inline]
pub fn build_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .enumerate()
        .fold(String::new(), |mut context, (i, chunk)| {
            let _ = write!(context, "Context {}:\n{}\n\n", i + 1, chunk.as_ref());
            context
        })
}

/// The fixed question-answering prompt handed to the chat backend
#[inline]
pub fn build_rag_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful AI assistant. Answer the user's question based on the provided context.\n\n\
         Context:\n{}\n\n\
         Question: {}\n\n\
         Instructions:\n\
         - Provide a clear and concise answer based on the context\n\
         - If the context doesn't contain relevant information, say so\n\
         - Be specific and cite information from the context when possible\n\n\
         Answer:",
        context, query
    )
}
