//! Prompts for the one-shot model calls behind the tools

/// Extraction prompt: raw program text in, `{"performances": [...]}` out.
pub fn parse_prompt(raw_text: &str) -> String {
    format!(
        r#"You are a music concert program parser. Extract structured data from the teacher's input.
Return ONLY valid JSON with no markdown formatting, no backticks, no explanation.

The JSON must have this exact structure:
{{
    "performances": [
        {{
            "order": 1,
            "student_name": "Student Name",
            "piece_name": "Piece Name (Composer)",
            "instrument": "Piano",
            "estimated_duration_minutes": 4
        }}
    ]
}}

Rules:
- If instrument is not mentioned, guess based on context or use "Piano" as default
- If duration is not mentioned, estimate based on the piece (most pieces are 3-6 minutes)
- If composer is mentioned, include it in parentheses after the piece name
- Keep the original performance order
- Handle messy formats: emails, CSVs, numbered lists, free text

Input text to parse:
{raw_text}"#
    )
}

/// Correction prompt: the full record plus an instruction, full record out.
pub fn fix_prompt(current_json: &str, instruction: &str) -> String {
    format!(
        r#"You are a data correction assistant. The user wants to fix some data in a concert program.

Current program data:
{current_json}

User's correction instruction:
{instruction}

Apply the correction and return the COMPLETE updated program data as valid JSON.
Return ONLY the JSON, no markdown, no backticks, no explanation.
Keep the exact same JSON structure, only change what the user asked to fix."#
    )
}

/// Theme prompt: a free-form style description in, a theme JSON object out.
pub fn theme_prompt(style_description: &str) -> String {
    format!(
        r##"You are a graphic designer. Based on the user's style description, generate a color theme for a concert program PDF.

User's style request: "{style_description}"

Return ONLY valid JSON with no markdown, no backticks, no explanation. The JSON must have this exact structure:
{{
    "name": "Theme Name (2-3 words)",
    "bg_color": "#hexcolor (dark color for table header background)",
    "accent_color": "#hexcolor (decorative lines and accents)",
    "text_color": "#hexcolor (main text, should be dark and readable)",
    "subtitle_color": "#hexcolor (lighter secondary text)",
    "header_decoration": "short decorative text or symbols for section divider. Max 20 chars",
    "footer_decoration": "short decorative text or symbols for footer area. Max 20 chars",
    "layout": "list, table or minimal (list=centered piece-by-piece, table=structured grid, minimal=plain ruled grid)",
    "font_style": "serif or sans-serif",
    "title_size": 28
}}

Rules:
- Colors must be valid hex codes
- text_color must be dark enough to read on white background
- bg_color should work well with white text on top
- Match the mood: Christmas=red/green/gold, Summer=blue/cyan/light, Elegant=gold/navy, etc.
- Decorations are printed with standard PDF fonts, so prefer Latin characters and punctuation (e.g. "~ * ~", "- o -", "+ + +")
- Choose serif for formal/classical, sans-serif for modern/casual"##
    )
}
