//! PDF text extraction via `pdfium-render`.
//!
//! Lunch menus published as PDFs are usually a single page of plain lines,
//! so plugins get the text of each page and do their own splitting.

use pdfium_render::prelude::*;

use super::ApiError;

/// Plain text of every page, in page order.
pub fn page_texts(bytes: &[u8]) -> Result<Vec<String>, ApiError> {
    let bindings = Pdfium::bind_to_system_library()
        .map_err(|e| ApiError::Pdf(format!("pdfium library not available: {e}")))?;
    let pdfium = Pdfium::new(bindings);
    let doc = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ApiError::Pdf(format!("failed to parse PDF: {e}")))?;

    doc.pages()
        .iter()
        .map(|page| {
            page.text()
                .map(|text| text.all())
                .map_err(|e| ApiError::Pdf(format!("failed to extract text from page: {e}")))
        })
        .collect()
}
