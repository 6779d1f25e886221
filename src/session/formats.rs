//! Save filter resolution
//!
//! Maps a (document kind, target extension) pair to the office filter name
//! used for `storeToURL`. Unknown extensions fall back to the plain text
//! filter with a warning rather than failing the save.

use tracing::warn;

use crate::uno::DocumentKind;

/// Fallback filter when the extension is unknown for the document kind
pub const DEFAULT_FILTER: &str = "Text";

/// The filter name for a known (kind, extension) pair
pub fn filter_for(kind: DocumentKind, extension: &str) -> Option<&'static str> {
    match kind {
        DocumentKind::Writer => match extension {
            "odt" => Some("writer8"),
            "fodt" => Some("OpenDocument Text Flat XML"),
            "sxw" => Some("StarOffice XML (Writer)"),
            "doc" => Some("MS Word 97"),
            "docx" => Some("Office Open XML Text"),
            "rtf" => Some("Rich Text Format"),
            "txt" => Some("Text"),
            "pdf" => Some("writer_pdf_Export"),
            "html" => Some("HTML (StarWriter)"),
            _ => None,
        },
        DocumentKind::Calc => match extension {
            "ods" => Some("calc8"),
            "fods" => Some("OpenDocument Spreadsheet Flat XML"),
            "sxc" => Some("StarOffice XML (Calc)"),
            "xls" => Some("MS Excel 97"),
            "xlsx" => Some("Calc Office Open XML"),
            "csv" => Some("Text - txt - csv (StarCalc)"),
            "pdf" => Some("calc_pdf_Export"),
            "html" => Some("HTML (StarCalc)"),
            _ => None,
        },
        DocumentKind::Impress => match extension {
            "odp" => Some("impress8"),
            "fodp" => Some("OpenDocument Presentation Flat XML"),
            "sxi" => Some("StarOffice XML (Impress)"),
            "ppt" => Some("MS PowerPoint 97"),
            "pptx" => Some("Impress Office Open XML"),
            "pdf" => Some("impress_pdf_Export"),
            "png" => Some("impress_png_Export"),
            "jpg" | "jpeg" => Some("impress_jpg_Export"),
            "html" => Some("impress_html_Export"),
            _ => None,
        },
        DocumentKind::Draw => match extension {
            "odg" => Some("draw8"),
            "fodg" => Some("OpenDocument Drawing Flat XML"),
            "sxd" => Some("StarOffice XML (Draw)"),
            "pdf" => Some("draw_pdf_Export"),
            "png" => Some("draw_png_Export"),
            "jpg" | "jpeg" => Some("draw_jpg_Export"),
            "html" => Some("draw_html_Export"),
            _ => None,
        },
    }
}

/// Resolve the filter for a save target, falling back to [`DEFAULT_FILTER`]
/// when the extension is missing or unknown
pub fn resolve_filter(kind: DocumentKind, extension: Option<&str>) -> &'static str {
    match extension {
        Some(ext) => filter_for(kind, ext).unwrap_or_else(|| {
            warn!(
                "No {} filter registered for extension '{}', saving as '{}'",
                kind, ext, DEFAULT_FILTER
            );
            DEFAULT_FILTER
        }),
        None => {
            warn!(
                "Save target has no extension, saving as '{}'",
                DEFAULT_FILTER
            );
            DEFAULT_FILTER
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_formats_per_kind() {
        assert_eq!(filter_for(DocumentKind::Writer, "odt"), Some("writer8"));
        assert_eq!(filter_for(DocumentKind::Calc, "ods"), Some("calc8"));
        assert_eq!(filter_for(DocumentKind::Impress, "odp"), Some("impress8"));
        assert_eq!(filter_for(DocumentKind::Draw, "odg"), Some("draw8"));
    }

    #[test]
    fn test_pdf_export_is_kind_specific() {
        assert_eq!(
            filter_for(DocumentKind::Writer, "pdf"),
            Some("writer_pdf_Export")
        );
        assert_eq!(
            filter_for(DocumentKind::Calc, "pdf"),
            Some("calc_pdf_Export")
        );
        assert_eq!(
            filter_for(DocumentKind::Impress, "pdf"),
            Some("impress_pdf_Export")
        );
        assert_eq!(
            filter_for(DocumentKind::Draw, "pdf"),
            Some("draw_pdf_Export")
        );
    }

    #[test]
    fn test_foreign_formats() {
        assert_eq!(filter_for(DocumentKind::Writer, "doc"), Some("MS Word 97"));
        assert_eq!(
            filter_for(DocumentKind::Calc, "csv"),
            Some("Text - txt - csv (StarCalc)")
        );
        assert_eq!(
            filter_for(DocumentKind::Impress, "ppt"),
            Some("MS PowerPoint 97")
        );
    }

    #[test]
    fn test_html_export_is_kind_specific() {
        assert_eq!(
            filter_for(DocumentKind::Writer, "html"),
            Some("HTML (StarWriter)")
        );
        assert_eq!(
            filter_for(DocumentKind::Calc, "html"),
            Some("HTML (StarCalc)")
        );
        assert_eq!(
            filter_for(DocumentKind::Impress, "html"),
            Some("impress_html_Export")
        );
        assert_eq!(
            filter_for(DocumentKind::Draw, "html"),
            Some("draw_html_Export")
        );
    }

    #[test]
    fn test_legacy_staroffice_formats() {
        assert_eq!(
            filter_for(DocumentKind::Writer, "sxw"),
            Some("StarOffice XML (Writer)")
        );
        assert_eq!(
            filter_for(DocumentKind::Calc, "sxc"),
            Some("StarOffice XML (Calc)")
        );
        assert_eq!(
            filter_for(DocumentKind::Impress, "sxi"),
            Some("StarOffice XML (Impress)")
        );
        assert_eq!(
            filter_for(DocumentKind::Draw, "sxd"),
            Some("StarOffice XML (Draw)")
        );
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(filter_for(DocumentKind::Writer, "xyz"), None);
        assert_eq!(resolve_filter(DocumentKind::Writer, Some("xyz")), "Text");
        assert_eq!(resolve_filter(DocumentKind::Calc, None), "Text");
    }

    #[test]
    fn test_resolve_known_extension() {
        assert_eq!(resolve_filter(DocumentKind::Calc, Some("xlsx")), "Calc Office Open XML");
    }
}
