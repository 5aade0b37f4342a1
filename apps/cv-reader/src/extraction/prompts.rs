// CV extraction prompt templates.

pub const EXTRACTION_SYSTEM: &str = "\
You are a precise resume data extractor. \
Read curriculum-vitae text and return the candidate's details as structured JSON. \
Answer with exactly the output format the user asks for. \
Extract only what the text states and never invent details. \
Use null for anything that is missing. \
Do NOT include explanations or apologies.";

pub const INFORMATION_EXTRACTION_PROMPT: &str = r#"Extract the candidate information from the CV below.

CV TEXT:
{cv_content}

Return the result as a single JSON object inside a ```JSON code block, using exactly this structure:
```JSON
{
  "name": "string" | null,
  "email": "string" | null,
  "phone": "string" | null,
  "location": "string" | null,
  "summary": "string" | null,
  "skills": ["string"],
  "experience": [
    {"company": "string", "title": "string", "start_date": "string" | null, "end_date": "string" | null, "description": "string" | null}
  ],
  "education": [
    {"institution": "string", "degree": "string" | null, "field": "string" | null, "start_date": "string" | null, "end_date": "string" | null}
  ],
  "certifications": ["string"],
  "languages": ["string"]
}
```

RULES:
1. Copy names, companies and institutions exactly as written.
2. Keep dates in the form they appear in the CV; use null when absent.
3. List experience and education most recent first.
4. Use an empty list when a section is missing.
5. Output nothing outside the ```JSON code block."#;

/// Fills the extraction template with the CV text, verbatim.
pub fn build_prompt(cv_content: &str) -> String {
    INFORMATION_EXTRACTION_PROMPT.replace("{cv_content}", cv_content)
}
