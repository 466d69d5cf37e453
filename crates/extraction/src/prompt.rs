/// Prompt sent alongside every invoice image.
///
/// The contract is deliberately strict: the model must answer with a single
/// JSON object using exactly these keys, so the reply can be handed to
/// [`crate::parse_model_output`] without any post-processing beyond a trim.
/// Missing values come back as `""` / `0`, never as prose.
pub const INVOICE_PROMPT: &str = r#"Return ONLY valid JSON.
No explanation. No markdown. No text.

Use EXACT keys below.

{
  "vendor_name": "",
  "invoice_no": "",
  "invoice_date": "",
  "total_amount": 0,
  "items": [
    {
      "description": "",
      "quantity": 0,
      "unit_price": 0,
      "total_price": 0
    }
  ]
}

If missing, use "" or 0.
JSON only.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_template_is_valid_json() {
        let start = INVOICE_PROMPT.find('{').expect("prompt contains a template");
        let end = INVOICE_PROMPT.rfind('}').expect("prompt contains a template");
        let template: serde_json::Value =
            serde_json::from_str(&INVOICE_PROMPT[start..=end]).expect("template must parse");

        let obj = template.as_object().expect("template is an object");
        for key in ["vendor_name", "invoice_no", "invoice_date", "total_amount", "items"] {
            assert!(obj.contains_key(key), "template missing key {key}");
        }

        let row = template["items"][0].as_object().expect("items row is an object");
        for key in ["description", "quantity", "unit_price", "total_price"] {
            assert!(row.contains_key(key), "items row missing key {key}");
        }
    }
}
