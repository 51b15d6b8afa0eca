use serde::Serialize;
use serde_json::Value;

/// One block of a tool result. Only text blocks are produced.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn as_text(&self) -> &str {
        match self {
            ContentBlock::Text { text } => text,
        }
    }
}

/// What a single tool call hands back to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: Vec<ContentBlock>,
    pub structured: Option<Value>,
    pub is_error: bool,
}

impl ToolResult {
    pub fn document(text: String, structured: Value) -> Self {
        Self {
            content: vec![ContentBlock::Text { text }],
            structured: Some(structured),
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: format!("Error: {}", message),
            }],
            structured: None,
            is_error: true,
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(ContentBlock::as_text)
    }
}

// Build an MCP-compliant result envelope for tools/call outputs.
// - content: the text blocks, always present so clients can render something.
// - structuredContent: the parsed document on success.
// - isError: included only when true to keep payloads small.
pub fn mcp_wrap(result: &ToolResult) -> Value {
    let mut obj = serde_json::json!({ "content": result.content });
    if let Some(map) = obj.as_object_mut() {
        if let Some(structured) = &result.structured {
            map.insert("structuredContent".to_string(), structured.clone());
        }
        if result.is_error {
            map.insert("isError".to_string(), Value::Bool(true));
        }
    }
    obj
}
