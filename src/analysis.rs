//! Prompt construction for the code-analysis and image-analysis endpoints.
//! These are thin non-streaming users of the Completion Gateway.

use crate::schemas::ChatMessage;

/// Kinds of code analysis the assistant can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    General,
    Security,
    Performance,
    Style,
    Refactor,
}

impl AnalysisKind {
    /// Parse the wire value, defaulting to `General` for absent input.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.unwrap_or("general") {
            "general" => Some(Self::General),
            "security" => Some(Self::Security),
            "performance" => Some(Self::Performance),
            "style" => Some(Self::Style),
            "refactor" => Some(Self::Refactor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Style => "style",
            Self::Refactor => "refactor",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::General => {
                "Analyze this code for potential improvements, bugs, and best practices."
            }
            Self::Security => {
                "Perform a security analysis of this code, identifying potential vulnerabilities."
            }
            Self::Performance => {
                "Analyze this code for performance issues and optimization opportunities."
            }
            Self::Style => {
                "Review this code for style consistency and adherence to best practices."
            }
            Self::Refactor => {
                "Suggest refactoring opportunities to improve code structure and maintainability."
            }
        }
    }
}

/// Build the message pair for a code-analysis completion.
pub fn code_analysis_messages(
    kind: AnalysisKind,
    code: &str,
    language: &str,
    context: &str,
) -> Vec<ChatMessage> {
    let system = format!(
        "You are a code analysis AI with access to the full project context. {}\n\
         Provide specific, actionable feedback with code examples where appropriate.\n\
         Format your response with clear sections and use markdown for code blocks.\n\
         Consider the broader project context when making recommendations.",
        kind.instruction()
    );

    let mut user = format!("Language: {}\n\n", language);
    if !context.is_empty() {
        user.push_str(&format!("Project Context:\n{}\n\n", context));
    }
    user.push_str(&format!(
        "Code to analyze:\n```{}\n{}\n```",
        language, code
    ));

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Default prompt for image analysis when the caller supplies none.
pub const DEFAULT_IMAGE_PROMPT: &str = "Analyze this image and describe what you see.";

/// Build the vision message for an image-analysis completion. The image part
/// routes the request to the vision model.
pub fn image_analysis_messages(image_data: &str, prompt: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user_with_image(prompt, image_data)]
}
