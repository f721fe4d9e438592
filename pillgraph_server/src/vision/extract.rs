//! Turning raw vision-model output into a mergeable graph fragment.
//!
//! Models are instructed to answer with JSON only, but in practice the
//! output arrives wrapped in markdown code fences or with stray prose around
//! it. [`parse_scan_output`] strips the noise, locates the outermost JSON
//! object, and classifies the result: a usable fragment, the
//! `not_a_medication` sentinel, or unparseable output.

use pillgraph_core::GraphFragment;

/// Extraction prompt sent alongside the label image.
///
/// Instructs the model to validate that the image shows a medication before
/// extracting, and to answer with the `not_a_medication` sentinel otherwise.
pub const LABEL_PROMPT: &str = r#"You are a pharmaceutical analysis AI trained to identify medications from images.

STEP 1 - CRITICAL VALIDATION:
Examine the image carefully. Does it show a medication, pharmaceutical product, supplement, or vitamin?

If NO (the image shows food, beverages, household items, electronics, unclear/blurry content, or anything other than medication):
-> Respond with EXACTLY this JSON (nothing else): {"error": "not_a_medication"}

If YES (you can clearly see medication packaging or labeling):
-> Proceed to STEP 2

STEP 2 - EXTRACT MEDICATION DATA:
Return ONLY valid JSON matching this schema (no markdown, no explanations):

{
  "medications": {
    "<brand_name>": {
      "name": "<brand_name>",
      "ingredients": ["ingredient1", "ingredient2"],
      "sideEffects": ["effect1", "effect2"],
      "symptomsTreated": ["symptom1", "symptom2"]
    }
  },
  "ingredients": {
    "<ingredient_name>": {
      "name": "<ingredient_name>",
      "medications": ["<brand_name>"],
      "description": "Brief description (20 words max)"
    }
  },
  "effects": {
    "<effect_name>": {
      "name": "<effect_name>",
      "medicationsCausingIt": ["<brand_name>"],
      "medicationsTreatingIt": [],
      "description": "Brief description (20 words max)"
    }
  }
}

EXTRACTION RULES:
- NEVER return empty objects for medications, ingredients, or effects
- If you cannot identify a medication clearly, return {"error": "not_a_medication"} instead
- Use BRAND NAME as medication name (e.g., "Tylenol" not "Acetaminophen", "Advil" not "Ibuprofen")
- Brand name = largest text on packaging; active ingredients go in "ingredients" array
- Simplify brand names ("Tylenol" not "Tylenol Extra Strength")
- For natural products: simplest generic term ("Honey" not "Liquid Honey")
- List ALL active ingredients from the label
- Medication name is not the ingredient name (if med is "Ashwagandha Capsules", ingredient is "Ashwagandha extract")
- Include common side effects (use pharmaceutical knowledge)
- Include symptoms/conditions the medication treats
- Create ingredient entries with descriptions
- Create effect entries linking to medications
- Use proper capitalization ("Acetaminophen", "Headache")
- Return ONLY JSON, no markdown, no explanations

REMEMBER: If not a medication -> {"error": "not_a_medication"}
If medication but unclear -> {"error": "not_a_medication"}
Do NOT return empty objects!"#;

/// Classified outcome of a scan analysis.
#[derive(Debug)]
pub enum ScanAnalysis {
    /// The model recognized a medication and produced a usable fragment
    /// (guaranteed to contain at least one medication entry).
    Fragment(GraphFragment),
    /// The model reported the image is not a medication, or produced a
    /// fragment without any medications (treated the same).
    NotAMedication,
}

/// Parse a base64 data URL into `(mime_type, base64_payload)`.
///
/// Accepts the form `data:image/<subtype>;base64,<payload>`.
pub fn parse_data_url(url: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    if !mime.starts_with("image/") || payload.is_empty() {
        return None;
    }
    Some((mime.to_string(), payload.to_string()))
}

/// Parse raw model output into a [`ScanAnalysis`].
///
/// Returns `Err` with the raw output when no JSON object can be extracted at
/// all — the caller surfaces that as a provider failure.
pub fn parse_scan_output(output: &str) -> Result<ScanAnalysis, String> {
    let json_str = extract_json_object(output);

    let value: serde_json::Value = match serde_json::from_str(&json_str) {
        Ok(value) => value,
        Err(_) => return Err(output.to_string()),
    };

    // Sentinel check before shape decoding: {"error": "not_a_medication"}.
    if value
        .get("error")
        .and_then(|e| e.as_str())
        .is_some_and(|e| e == "not_a_medication")
    {
        return Ok(ScanAnalysis::NotAMedication);
    }

    let fragment: GraphFragment = match serde_json::from_value(value) {
        Ok(fragment) => fragment,
        Err(_) => return Err(output.to_string()),
    };

    // A recognizable scan must name at least one medication; an empty or
    // missing medications map counts as unrecognized.
    if fragment.medications.is_empty() {
        return Ok(ScanAnalysis::NotAMedication);
    }

    Ok(ScanAnalysis::Fragment(fragment))
}

/// Extract a JSON object from potentially noisy model output.
///
/// Strips markdown code fences first, then takes the span from the first `{`
/// to the last `}`, handling models that add prose before or after the JSON.
fn extract_json_object(text: &str) -> String {
    let mut trimmed = text.trim();

    if let Some(fenced) = trimmed.strip_prefix("```") {
        // Drop the info string ("json") up to the first newline, then cut at
        // the closing fence.
        let body = fenced.split_once('\n').map(|(_, rest)| rest).unwrap_or(fenced);
        trimmed = body.rsplit_once("```").map(|(body, _)| body).unwrap_or(body);
        trimmed = trimmed.trim();
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_parses() {
        let (mime, payload) = parse_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(payload, "aGVsbG8=");
    }

    #[test]
    fn data_url_rejects_other_shapes() {
        assert!(parse_data_url("aGVsbG8=").is_none());
        assert!(parse_data_url("data:text/plain;base64,aGVsbG8=").is_none());
        assert!(parse_data_url("data:image/png;base64,").is_none());
    }

    #[test]
    fn plain_json_fragment_parses() {
        let analysis = parse_scan_output(
            r#"{"medications":{"m1":{"name":"Advil","ingredients":["Ibuprofen"]}}}"#,
        )
        .unwrap();
        match analysis {
            ScanAnalysis::Fragment(fragment) => {
                assert_eq!(fragment.medications.len(), 1);
            }
            other => panic!("expected fragment, got {:?}", other),
        }
    }

    #[test]
    fn fenced_output_is_unwrapped() {
        let output = "```json\n{\"medications\":{\"m\":{\"name\":\"Advil\"}}}\n```";
        assert!(matches!(
            parse_scan_output(output).unwrap(),
            ScanAnalysis::Fragment(_)
        ));
    }

    #[test]
    fn prose_around_json_is_tolerated() {
        let output = "Here is the result:\n{\"medications\":{\"m\":{\"name\":\"Advil\"}}}\nHope that helps!";
        assert!(matches!(
            parse_scan_output(output).unwrap(),
            ScanAnalysis::Fragment(_)
        ));
    }

    #[test]
    fn sentinel_is_detected() {
        assert!(matches!(
            parse_scan_output(r#"{"error": "not_a_medication"}"#).unwrap(),
            ScanAnalysis::NotAMedication
        ));
        assert!(matches!(
            parse_scan_output("```json\n{\"error\": \"not_a_medication\"}\n```").unwrap(),
            ScanAnalysis::NotAMedication
        ));
    }

    #[test]
    fn empty_medications_counts_as_unrecognized() {
        assert!(matches!(
            parse_scan_output(r#"{"medications":{},"ingredients":{},"effects":{}}"#).unwrap(),
            ScanAnalysis::NotAMedication
        ));
        assert!(matches!(
            parse_scan_output(r#"{"ingredients":{"i":{"name":"Honey"}}}"#).unwrap(),
            ScanAnalysis::NotAMedication
        ));
    }

    #[test]
    fn unparseable_output_is_an_error() {
        let err = parse_scan_output("I could not read the label, sorry.").unwrap_err();
        assert!(err.contains("could not read"));
    }
}
