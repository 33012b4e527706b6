pub const CLINICAL_ROLE: &str = "Act as a clinical toxicologist and pharmacist.";

pub const ANALYSIS_TASKS: &str = "TASKS:\n\
1. Identify all medicine names/active ingredients. Fix handwriting and OCR typos intelligently.\n\
2. Analyze for potential drug-drug interactions between all identified medicines.\n\
3. Determine the Risk Severity: Low, Medium, High, or Critical.\n\
4. Provide a simplified explanation for a patient (no jargon).\n\
5. Suggest safer alternatives ONLY if risk is High/Critical.";

pub const OUTPUT_SCHEMA: &str = "OUTPUT FORMAT:\n\
Return ONLY a valid JSON object with these keys:\n\
- medicines_found (list of strings)\n\
- risk_level (string: Low, Medium, High, Critical)\n\
- risk_color (string: green, yellow, orange, red)\n\
- alert_message (string: brief explanation)\n\
- alternatives (list of strings, or empty if risk is low)";

#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub note: Option<&'a str>,
    pub image_count: usize,
    pub language: Option<&'a str>,
    pub conditions: Option<&'a str>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn describe_images(image_count: usize) -> String {
    if image_count <= 1 {
        "Analyze the provided prescription image.".to_string()
    } else {
        format!(
            "Analyze these {image_count} different prescription images. \
             Treat them as medicines taken together and check for interactions across all prescriptions, \
             not only within each one."
        )
    }
}

fn context_clauses(inputs: &PromptInputs<'_>) -> Vec<String> {
    let mut clauses = Vec::new();

    if let Some(note) = present(inputs.note) {
        clauses.push(format!(
            "USER NOTES (additional medications or context supplied by the patient): \"{note}\""
        ));
    }

    if let Some(conditions) = present(inputs.conditions) {
        clauses.push(format!(
            "PATIENT CONDITIONS: {conditions}.\n\
             CRITICAL: Check strictly for contraindications between every identified medicine and these conditions. \
             Raise the risk level if any medicine is unsafe for them and explain why in alert_message."
        ));
    }

    clauses
}

fn language_clause(language: Option<&str>) -> Option<String> {
    let language = present(language)?;
    if language.eq_ignore_ascii_case("english") {
        return None;
    }
    Some(format!(
        "LANGUAGE: Write alert_message and every entry of alternatives in {language}. \
         Keep medicines_found in English using standard medical terminology."
    ))
}

fn assemble(mut sections: Vec<String>, inputs: &PromptInputs<'_>) -> String {
    sections.extend(context_clauses(inputs));
    sections.push(ANALYSIS_TASKS.to_string());
    if let Some(clause) = language_clause(inputs.language) {
        sections.push(clause);
    }
    sections.push(OUTPUT_SCHEMA.to_string());
    sections.join("\n\n")
}

pub fn build_analysis_prompt(inputs: &PromptInputs<'_>) -> String {
    let sections = vec![
        CLINICAL_ROLE.to_string(),
        describe_images(inputs.image_count),
    ];
    assemble(sections, inputs)
}

/// Legacy two-stage flow: the prescription arrives as OCR text instead of images.
pub fn build_transcription_prompt(extracted_text: &str, inputs: &PromptInputs<'_>) -> String {
    let sections = vec![
        CLINICAL_ROLE.to_string(),
        format!(
            "Analyze the following text extracted from a handwritten prescription:\n\nTEXT: \"{}\"",
            extracted_text.trim()
        ),
    ];
    assemble(sections, inputs)
}
