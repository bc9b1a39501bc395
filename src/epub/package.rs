//! Structural package documents: `container.xml` and `content.opf`.

use crate::book::{MediaType, Package};
use crate::util::{encode_href, escape_xml};

/// Content of the `mimetype` entry.
pub const EPUB_MIME_TYPE: &str = "application/epub+zip";

/// Container.xml template.
pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Generate an EPUB 3 `content.opf` for a closed book.
pub fn generate_opf(package: &Package) -> String {
    let meta = &package.metadata;
    let mut opf = String::new();

    let language = if meta.language.is_empty() {
        "en"
    } else {
        &meta.language
    };
    opf.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId" xml:lang="{}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
        escape_xml(language)
    ));

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">urn:uuid:{}</dc:identifier>\n",
        package.uuid
    ));
    let title = if meta.title.is_empty() {
        "Untitled"
    } else {
        &meta.title
    };
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(title)));
    for author in &meta.authors {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
    }
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(language)
    ));
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        escape_xml(&meta.last_modified)
    ));

    // EPUB 2 readers look for the cover image here
    if let Some(ref id) = package.cover_image_id {
        opf.push_str(&format!(
            "    <meta name=\"cover\" content=\"{}\"/>\n",
            escape_xml(id)
        ));
    }

    opf.push_str("  </metadata>\n  <manifest>\n");

    for file in package.files.iter() {
        let mut properties = Vec::new();
        if file.path == package.nav_path {
            properties.push("nav");
        }
        if package.cover_image_id.as_deref() == Some(file.id.as_str()) {
            properties.push("cover-image");
        }
        let properties = if properties.is_empty() {
            String::new()
        } else {
            format!(" properties=\"{}\"", properties.join(" "))
        };
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&file.id),
            escape_xml(&encode_href(&file.path)),
            file.media_type.as_str(),
            properties
        ));
    }

    opf.push_str("  </manifest>\n  <spine>\n");
    for file in &package.spine {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\"/>\n",
            escape_xml(&file.id)
        ));
    }
    opf.push_str("  </spine>\n");

    if let Some(cover) = package
        .cover_id
        .as_deref()
        .and_then(|id| package.files.iter().find(|f| f.id == id))
        .filter(|f| f.media_type == MediaType::Xhtml)
    {
        opf.push_str(&format!(
            "  <guide>\n    <reference type=\"cover\" title=\"Cover\" href=\"{}\"/>\n  </guide>\n",
            escape_xml(&encode_href(&cover.path))
        ));
    }

    opf.push_str("</package>\n");
    opf
}
