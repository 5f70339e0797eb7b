//! # Invocation Entry Points
//!
//! Template bytes in, a [`ValidationResult`] out. These are the functions a
//! host (the CLI, an event handler) calls once it has fetched a document.

use cfscan_core::{parse_template, ParseError, TemplateFormat, TemplateId, Timestamp};

use crate::aggregator::Validator;
use crate::report::ValidationResult;

/// Parse and validate one document.
pub fn validate_document(
    validator: &Validator,
    bytes: &[u8],
    template_id: impl Into<TemplateId>,
    format_hint: Option<TemplateFormat>,
) -> Result<ValidationResult, ParseError> {
    validate_document_at(validator, bytes, template_id, format_hint, Timestamp::now())
}

/// [`validate_document`] with an explicit processing time.
pub fn validate_document_at(
    validator: &Validator,
    bytes: &[u8],
    template_id: impl Into<TemplateId>,
    format_hint: Option<TemplateFormat>,
    timestamp: Timestamp,
) -> Result<ValidationResult, ParseError> {
    let template = parse_template(bytes, template_id, format_hint)?;
    Ok(validator.validate_at(&template, timestamp))
}

/// Parse and validate one document, turning a parse failure into the FAILED
/// record so every invocation yields exactly one result.
pub fn validate_or_record_failure(
    validator: &Validator,
    bytes: &[u8],
    template_id: impl Into<TemplateId>,
    format_hint: Option<TemplateFormat>,
) -> ValidationResult {
    let template_id = template_id.into();
    let timestamp = Timestamp::now();
    match validate_document_at(validator, bytes, template_id.clone(), format_hint, timestamp) {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(template_id = %template_id, error = %error, "template failed to parse");
            ValidationResult::parse_failure(template_id, &error, timestamp)
        }
    }
}
