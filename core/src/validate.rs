//! Response validation.
//!
//! # Design
//! A response is checked before any field is read from it. The service
//! reports failures as `<errors><error>…</error></errors>`, often with a
//! 4xx status but not always, so the body decides. A body with neither the
//! expected element nor an error list is rejected rather than accepted.

use log::{debug, warn};

use crate::error::{Result, TrackerError};
use crate::markup::Element;

const ERROR_SELECTOR: &str = "errors > error";

/// Parse `body` and check it against `expected_root`.
pub fn validate(body: &[u8], expected_root: &str) -> Result<()> {
    let document = Element::parse(body)?;
    validate_document(&document, expected_root)
}

/// Check an already parsed document against `expected_root`.
///
/// Service-reported errors win over the presence of the expected element;
/// several errors are joined with `"; "`.
pub fn validate_document(document: &Element, expected_root: &str) -> Result<()> {
    let errors: Vec<&str> = document
        .find_all(ERROR_SELECTOR)
        .into_iter()
        .map(Element::text)
        .collect();
    if !errors.is_empty() {
        let message = errors.join("; ");
        warn!("service rejected request: {message}");
        return Err(TrackerError::Validation(message));
    }

    if document.find(expected_root).is_some() {
        debug!("response contains <{expected_root}>");
        return Ok(());
    }

    Err(TrackerError::Validation(format!(
        "expected response root element to be {expected_root}, got none"
    )))
}
