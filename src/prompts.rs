//! System instructions, tool declarations and the report schema sent to the
//! remote models.

use serde_json::{Value, json};

use crate::live::{ConversationKind, SessionSetup, ToolDeclaration};

/// Tool the onboarding assistant calls once the details are confirmed.
pub const START_SCAN_TOOL: &str = "start_facial_scan";
/// Tool the post-report assistant calls when the user wants a copy.
pub const SEND_REPORT_TOOL: &str = "send_report_to_whatsapp";

/// Build the onboarding system instruction.
///
/// The scripted questions must keep containing
/// [`NAME_PROMPT_FRAGMENT`](crate::slots::NAME_PROMPT_FRAGMENT) and
/// [`PHONE_PROMPT_FRAGMENT`](crate::slots::PHONE_PROMPT_FRAGMENT); the slot
/// interpreter recognises the questions by those fragments.
pub fn onboarding_instruction() -> String {
    format!(
        "\
You are \"Medzeal AI\", a friendly and professional assistant guiding a user \
through a facial skin check-up.

Keep your language short, warm and free of jargon.

Collect and verify the user's details:
1. Greet the user, then ask exactly: \"To prepare your skin report I need a few details. First, can I get your full name, please?\"
2. When the user answers, their name is shown on screen. Say: \"Thank you. I have your name as <name>. Is that correct on your screen?\" \
If they say no, ask them to spell it and confirm again.
3. Once the name is confirmed, ask exactly: \"Great! Now, can you please tell me your mobile number?\"
4. When the user answers, the number is shown on screen. Say: \"Okay, I have your number as <number>. Please check your screen, is that correct?\" \
If they say no, ask them to repeat it slowly.
5. Once the number is confirmed, say: \"Thank you, <name>! I'm now starting the facial scan.\" \
and immediately call the `{tool}` function without waiting for further input.",
        tool = START_SCAN_TOOL,
    )
}

/// Build the post-report system instruction.
pub fn post_report_instruction() -> String {
    format!(
        "\
The user has just received their skin report.
- Ask only: \"I've prepared your report. Would you like me to send a copy to you on WhatsApp?\"
- If they agree in any way, immediately call the `{SEND_REPORT_TOOL}` function.
- If they decline, reply \"Alright. Is there anything else I can help you with regarding the report?\" and end the conversation.
- Do not ask anything else."
    )
}

/// System instruction for the image model.
pub const ANALYSIS_INSTRUCTION: &str = "\
You are a dermatology assistant for the Medzeal clinic. Examine the facial photos for \
conditions such as acne (pimples, blackheads, whiteheads), cystic acne, rosacea, eczema, \
hyperpigmentation, fine lines, wrinkles, dark under-eye circles, enlarged pores, dehydration, \
excess oil and scarring. Describe each finding in one sentence and suggest a Medzeal service \
that addresses it. If the skin looks healthy, say so in the summary and return an empty \
issues list. Answer only with JSON matching the provided schema.";

/// Context line sent alongside the photos.
pub fn analysis_context(profile_name: &str) -> String {
    format!("This analysis is for user {profile_name}.")
}

/// The single tool declared for a conversation kind.
pub fn tool_for(kind: ConversationKind) -> ToolDeclaration {
    match kind {
        ConversationKind::Onboarding => ToolDeclaration {
            name: START_SCAN_TOOL.to_string(),
            description: "Start the camera for the facial scan once the user's name and \
                          mobile number are confirmed."
                .to_string(),
        },
        ConversationKind::PostReport => ToolDeclaration {
            name: SEND_REPORT_TOOL.to_string(),
            description: "Send the report to the user on WhatsApp after they agree.".to_string(),
        },
    }
}

/// Everything the realtime endpoint needs to start a conversation of `kind`.
pub fn session_setup(kind: ConversationKind, model: &str, voice: &str) -> SessionSetup {
    let instruction = match kind {
        ConversationKind::Onboarding => onboarding_instruction(),
        ConversationKind::PostReport => post_report_instruction(),
    };
    SessionSetup {
        kind,
        model: model.to_string(),
        voice: voice.to_string(),
        system_instruction: instruction,
        tool: tool_for(kind),
    }
}

/// JSON schema the image model's answer must follow.
pub fn report_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "One or two sentences summarising the findings."
            },
            "issues": {
                "type": "ARRAY",
                "description": "Every detected skin issue.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "issue": { "type": "STRING", "description": "Name of the issue, e.g. 'Acne Vulgaris'." },
                        "description": { "type": "STRING", "description": "One-sentence description." }
                    },
                    "required": ["issue", "description"]
                }
            },
            "recommendations": {
                "type": "ARRAY",
                "description": "Medzeal services that address the issues.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "treatment": { "type": "STRING", "description": "Service name, e.g. 'HydraFacial'." },
                        "description": { "type": "STRING", "description": "How the treatment helps, in one sentence." }
                    },
                    "required": ["treatment", "description"]
                }
            }
        },
        "required": ["summary", "issues", "recommendations"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{NAME_PROMPT_FRAGMENT, PHONE_PROMPT_FRAGMENT};

    #[test]
    fn onboarding_script_contains_slot_questions() {
        let lower = onboarding_instruction().to_lowercase();
        assert!(lower.contains(NAME_PROMPT_FRAGMENT));
        assert!(lower.contains(PHONE_PROMPT_FRAGMENT));
        assert!(lower.contains(START_SCAN_TOOL));
    }

    #[test]
    fn each_kind_declares_one_matching_tool() {
        let onboarding = session_setup(ConversationKind::Onboarding, "m", "Zephyr");
        assert_eq!(onboarding.tool.name, START_SCAN_TOOL);
        assert!(onboarding.system_instruction.contains(START_SCAN_TOOL));

        let post = session_setup(ConversationKind::PostReport, "m", "Zephyr");
        assert_eq!(post.tool.name, SEND_REPORT_TOOL);
        assert!(post.system_instruction.contains(SEND_REPORT_TOOL));
    }

    #[test]
    fn schema_requires_all_report_fields() {
        let schema = report_schema();
        assert_eq!(
            schema["required"],
            json!(["summary", "issues", "recommendations"])
        );
        assert_eq!(
            schema["properties"]["recommendations"]["items"]["required"],
            json!(["treatment", "description"])
        );
    }

    #[test]
    fn context_names_the_user() {
        assert_eq!(
            analysis_context("Asha Rao"),
            "This analysis is for user Asha Rao."
        );
    }
}
