//! Prompt template for meeting-minutes summarization.

/// Embed a raw transcript in the fixed minutes-of-meeting instruction
/// envelope for llama3-family models.
///
/// Pure formatting: no validation of input size or structure, no truncation.
/// Context-limit failures are the model runtime's concern.
pub fn summarize_context(text: &str) -> String {
    format!(
        "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\
         You are provided with a meeting transcript.\n\
         Your task is to generate minutes of meeting with all the crucial information.\n\
         Do not assume that the reader is aware of the details. Add any minute detail you think will be beneficial.\n\
         Do not alter any information or names.\n\
         \n\
         Organize the MoM in the following format -\n\
         Attendees: Participants involved\n\
         Agenda: Include the motive/agenda of the scheduled meeting\n\
         Points discussed: Include all essential points that were discussed along with the person name. Make sure to add all important terms.\n\
         Blocker: Include this field only if a blocker exists\n\
         Next steps: Follow up tasks\n\
         \n\
         Make sure to follow this template exactly.\n\
         \n\
         <|eot_id|><|start_header_id|>user<|end_header_id|>\n\
         Meeting Transcript: {text}<|eot_id|><|start_header_id|>assistant<|end_header_id|>"
    )
}
