//! JSON-schema definitions of the tools offered to the model

use serde_json::json;

use crate::ollama::Tool;

pub const PARSE_PROGRAM_TEXT: &str = "parse_program_text";
pub const FIX_PROGRAM_DATA: &str = "fix_program_data";
pub const GENERATE_PROGRAM_PDF: &str = "generate_program_pdf";
pub const GET_CURRENT_PROGRAM: &str = "get_current_program";
pub const UPDATE_CONCERT_INFO: &str = "update_concert_info";

/// Every tool the assistant can call, in the order they are offered
pub fn all() -> Vec<Tool> {
    vec![
        parse_program_text(),
        fix_program_data(),
        generate_program_pdf(),
        get_current_program(),
        update_concert_info(),
    ]
}

fn parse_program_text() -> Tool {
    Tool::function(
        PARSE_PROGRAM_TEXT,
        "Parse raw program text (from email, CSV, or free text) into structured concert program data: \
         student names, pieces, instruments, durations and performance order.",
        json!({
            "type": "object",
            "properties": {
                "raw_text": {
                    "type": "string",
                    "description": "The raw text containing the program list"
                },
                "concert_title": { "type": "string", "description": "Optional title for the concert" },
                "concert_date": { "type": "string", "description": "Optional date, e.g. \"March 15, 2026\"" },
                "concert_time": { "type": "string", "description": "Optional start time, e.g. \"2:00 PM\"" },
                "venue": { "type": "string", "description": "Optional venue name or address" }
            },
            "required": ["raw_text"]
        }),
    )
}

fn fix_program_data() -> Tool {
    Tool::function(
        FIX_PROGRAM_DATA,
        "Fix or modify the current program data using a natural language instruction, \
         e.g. \"Change Tommy's piece to Clair de Lune\" or \"Move Emma to the end\".",
        json!({
            "type": "object",
            "properties": {
                "fix_instruction": {
                    "type": "string",
                    "description": "What to change in the current program"
                }
            },
            "required": ["fix_instruction"]
        }),
    )
}

fn generate_program_pdf() -> Tool {
    Tool::function(
        GENERATE_PROGRAM_PDF,
        "Generate a printable concert program PDF from the current program data. \
         The style can be any natural language description and matching colors and decorations are designed for it.",
        json!({
            "type": "object",
            "properties": {
                "concert_title": { "type": "string", "description": "Override title (uses stored title if empty)" },
                "concert_date": { "type": "string", "description": "Override date (uses stored date if empty)" },
                "concert_time": { "type": "string", "description": "Override time (uses stored time if empty)" },
                "venue": { "type": "string", "description": "Override venue (uses stored venue if empty)" },
                "style": {
                    "type": "string",
                    "description": "Style description, e.g. \"Christmas red and green\", \"modern minimalist\", \"elegant gold\""
                }
            }
        }),
    )
}

fn get_current_program() -> Tool {
    Tool::function(
        GET_CURRENT_PROGRAM,
        "Get the current program data as a readable summary. Use this to check what data is loaded.",
        json!({ "type": "object", "properties": {} }),
    )
}

fn update_concert_info() -> Tool {
    Tool::function(
        UPDATE_CONCERT_INFO,
        "Update concert metadata: title, date, time, venue and type.",
        json!({
            "type": "object",
            "properties": {
                "concert_title": { "type": "string", "description": "The title of the concert" },
                "concert_date": { "type": "string", "description": "The date, e.g. \"March 15, 2026\"" },
                "concert_time": { "type": "string", "description": "The start time, e.g. \"2:00 PM\"" },
                "venue": { "type": "string", "description": "The venue name and/or address" },
                "concert_type": { "type": "string", "enum": ["ONLINE", "OFFLINE"] }
            }
        }),
    )
}
