//! End-of-session summaries: short poetic lines for closing credits.
//!
//! The model is asked for strict JSON but does not always comply, so the
//! reply goes through [`extract_json_payload`]. When neither the reply
//! nor a fenced block parses, or the provider call fails outright, the
//! caller still gets a report carrying two fixed fallback lines. This
//! endpoint never errors.

use serde::{Deserialize, Serialize};

use crate::llm::{extract_json_payload, LlmClient};

pub const FALLBACK_SUMMARIES: [&str; 2] = [
    "Meaningful discoveries in the conversation",
    "Special moments shared at the exhibition",
];

const SUMMARY_SYSTEM_PROMPT: &str = "You are an expert at creating poetic, emotional summaries for museum exhibition conversations. Create beautiful, concise summaries that capture the visitor's emotional journey and discoveries.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub session_id: String,
    pub total_messages: usize,
    pub summaries: Vec<String>,
}

/// Summarize a transcript into `count` credit lines.
pub async fn summarize_conversation(
    llm: &dyn LlmClient,
    session_id: &str,
    messages: &[ConversationMessage],
    count: usize,
) -> SummaryReport {
    let transcript = build_transcript(messages);
    let prompt = build_summary_prompt(&transcript, count);

    let summaries = match llm.chat(SUMMARY_SYSTEM_PROMPT, &prompt).await {
        Ok(raw) => parse_summaries(&raw),
        Err(e) => {
            tracing::error!(error = %e, session_id, "summary generation failed");
            None
        }
    }
    .unwrap_or_else(|| {
        tracing::warn!(session_id, "falling back to fixed summary lines");
        FALLBACK_SUMMARIES.iter().map(|s| s.to_string()).collect()
    });

    SummaryReport {
        session_id: session_id.to_string(),
        total_messages: messages.len(),
        summaries,
    }
}

fn build_transcript(messages: &[ConversationMessage]) -> String {
    let mut transcript = String::new();
    for msg in messages {
        transcript.push_str(&msg.role);
        transcript.push_str(": ");
        transcript.push_str(&msg.content);
        transcript.push('\n');
    }
    transcript
}

fn build_summary_prompt(transcript: &str, count: usize) -> String {
    format!(
        "Please analyze this conversation about the Tiger Exhibition and create {count} poetic, emotional summary sentences for ending credits.\n\
         \n\
         Conversation:\n\
         {transcript}\n\
         \n\
         Please create {count} short, poetic summary sentences that capture:\n\
         - The emotional experience of the visitor\n\
         - Key discoveries or insights from the conversation\n\
         - The artistic and cultural atmosphere of the exhibition\n\
         - The connection between traditional and modern Korean art\n\
         \n\
         Each summary should be:\n\
         - One sentence or short phrase\n\
         - Emotional and poetic\n\
         - Independent but harmonious with others\n\
         - Focused on the visitor's experience and discoveries\n\
         \n\
         Format your response as JSON:\n\
         {{\n\
             \"summaries\": [\n\
                 \"First poetic summary sentence\",\n\
                 \"Second poetic summary sentence\",\n\
                 \"Third poetic summary sentence\"\n\
             ]\n\
         }}\n\
         \n\
         Return only the JSON response:",
        count = count,
        transcript = transcript,
    )
}

fn parse_summaries(raw: &str) -> Option<Vec<String>> {
    let value = extract_json_payload(raw)?;
    let lines: Vec<String> = value
        .get("summaries")?
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines)
    }
}
