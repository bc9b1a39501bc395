//! XHTML fragments written around the content of a book.
//!
//! The fragments differ slightly between [`Flavor::Epub`] (read by e-readers)
//! and [`Flavor::Xhtml`] (browsed from a directory).

use super::section::{SecNo, TocEntry};
use crate::epub::Flavor;
use crate::util::{encode_href, escape_xml};

/// Stylesheet shipped as `css/book.css`.
pub const STYLESHEET: &str = r#"body {
  margin: 0 1em;
  text-align: justify;
}
h1, h2, h3, h4, h5, h6 {
  text-align: left;
  page-break-after: avoid;
}
h1 {
  margin-top: 2em;
}
.secno {
  margin-right: 0.5em;
}
section.cover, div.cover {
  text-align: center;
}
div.cover img {
  max-width: 100%;
  max-height: 100%;
}
.titlepage {
  text-align: center;
  margin-top: 30%;
}
.titlepage .author {
  font-size: 120%;
}
img.imath {
  vertical-align: middle;
}
img.dmath {
  display: block;
  margin: 1em auto;
}
pre.latex-verbatim, .latex-verb {
  font-family: monospace;
}
.error {
  color: red;
}
nav#toc ol {
  list-style-type: none;
}
p.navlink {
  text-align: center;
  margin-top: 2em;
}
"#;

/// Template context shared by every page of one book.
pub(crate) struct Templates<'a> {
    pub flavor: Flavor,
    pub language: &'a str,
    pub css_path: &'a str,
    pub nav_path: &'a str,
}

impl Templates<'_> {
    fn head(&self, title: &str) -> String {
        let epub_ns = match self.flavor {
            Flavor::Epub => " xmlns:epub=\"http://www.idpf.org/2007/ops\"",
            Flavor::Xhtml => "",
        };
        let lang = escape_xml(self.language);
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml"{epub_ns} xml:lang="{lang}" lang="{lang}">
<head>
<meta charset="UTF-8"/>
<title>{}</title>
<link rel="stylesheet" type="text/css" href="{}"/>
</head>
"#,
            escape_xml(title),
            escape_xml(&encode_href(self.css_path))
        )
    }

    fn epub_type(&self, kind: &str) -> String {
        match self.flavor {
            Flavor::Epub => format!(" epub:type=\"{kind}\""),
            Flavor::Xhtml => String::new(),
        }
    }

    fn tail(&self) -> String {
        match self.flavor {
            Flavor::Epub => "</body>\n</html>\n".to_string(),
            Flavor::Xhtml => format!(
                "<p class=\"navlink\"><a href=\"{}\">Contents</a></p>\n</body>\n</html>\n",
                escape_xml(&encode_href(self.nav_path))
            ),
        }
    }

    pub fn chapter_head(&self, title: &str) -> String {
        let mut out = self.head(title);
        out.push_str(&format!("<body{}>\n", self.epub_type("bodymatter")));
        out
    }

    pub fn chapter_tail(&self) -> String {
        self.tail()
    }

    pub fn front_head(&self) -> String {
        let mut out = self.head("Front Matter");
        out.push_str(&format!("<body{}>\n", self.epub_type("frontmatter")));
        out
    }

    pub fn front_tail(&self) -> String {
        self.tail()
    }

    pub fn section_head(&self, level: usize, number: &SecNo, title: &str, id: &str) -> String {
        let h = level.clamp(1, 6);
        let kind = if level == 1 { "chapter" } else { "subchapter" };
        let number = if number.is_front() {
            String::new()
        } else {
            format!("<span class=\"secno\">{number}</span>")
        };
        format!(
            "<section id=\"{}\" class=\"level{level}\"{}>\n<h{h}>{number}{}</h{h}>\n",
            escape_xml(id),
            self.epub_type(kind),
            escape_xml(title)
        )
    }

    pub fn section_tail(&self) -> &'static str {
        "</section>\n"
    }

    pub fn cover_page(&self, image_path: &str) -> String {
        let mut out = self.head("Cover");
        out.push_str(&format!(
            "<body{}>\n<div class=\"cover\"><img src=\"{}\" alt=\"Cover\"/></div>\n",
            self.epub_type("cover"),
            escape_xml(&encode_href(image_path))
        ));
        out.push_str(&self.tail());
        out
    }

    pub fn title_page(&self, title: &str, authors: &[String]) -> String {
        let mut out = self.head(title);
        out.push_str(&format!(
            "<body{}>\n<div class=\"titlepage\">\n<h1 class=\"title\">{}</h1>\n",
            self.epub_type("titlepage"),
            escape_xml(title)
        ));
        for author in authors {
            out.push_str(&format!(
                "<p class=\"author\">{}</p>\n",
                escape_xml(author)
            ));
        }
        out.push_str("</div>\n");
        out.push_str(&self.tail());
        out
    }

    /// Navigation document with the nested table of contents.
    ///
    /// `fallback` is linked when the book has no sections, since a
    /// navigation list may not be empty.
    pub fn nav_document(&self, entries: &[TocEntry], fallback: Option<&str>) -> String {
        let mut out = self.head("Contents");
        out.push_str(&format!(
            "<body>\n<nav{} id=\"toc\">\n<h1>Contents</h1>\n",
            self.epub_type("toc")
        ));

        if entries.is_empty() {
            if let Some(href) = fallback {
                out.push_str(&format!(
                    "<ol>\n<li><a href=\"{}\">Start</a></li>\n</ol>\n",
                    escape_xml(&encode_href(href))
                ));
            }
        }
        for entry in entries {
            if entry.ascend > 0 {
                for _ in 0..entry.ascend {
                    out.push_str("<ol>\n<li>");
                }
            } else {
                out.push_str("</li>\n<li>");
            }
            out.push_str(&format!(
                "<a href=\"{}\">{}</a>",
                escape_xml(&encode_href(&entry.href())),
                escape_xml(&entry.title)
            ));
            for _ in 0..entry.descend {
                out.push_str("</li>\n</ol>\n");
            }
        }

        out.push_str("</nav>\n</body>\n</html>\n");
        out
    }
}
