//! Small helpers shared by the book writer and the package drivers.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters that must be escaped inside an `href` attribute.
///
/// Path separators and fragment markers are kept so that relative
/// paths like `img/m/0.png` and `ch1.xhtml#epub-1.2` survive unchanged.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'%')
    .add(b'{')
    .add(b'}');

/// Escape text for use in XML character data and attribute values.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

/// Turn a logical book path into an `href` attribute value.
pub fn encode_href(path: &str) -> String {
    utf8_percent_encode(path, HREF).to_string()
}

/// Current UTC time formatted as RFC 3339, as required by `dcterms:modified`.
pub fn time_now_rfc3339() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
