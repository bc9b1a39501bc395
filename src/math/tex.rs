//! TeX source for a batch of formulas.

use super::FormulaKey;

/// Strut and gap typeset before every inline formula.
///
/// The cropper finds this mark in the leftmost column and uses its
/// midpoint as the vertical centre of the formula.
pub const CALIBRATION_MARK: &str = r"\vrule width6bp height4.3pt depth0pt \kern6bp";

/// Build a document that typesets each formula on a page of its own.
///
/// Pages appear in the order of `formulas`.
pub fn batch_source<'a>(
    preamble: &[String],
    formulas: impl IntoIterator<Item = &'a FormulaKey>,
) -> String {
    let mut out = String::from(
        r"\documentclass{minimal}

\usepackage[paperwidth=6in,paperheight=9in,margin=0pt]{geometry}

\usepackage{pdfrender}
\pdfrender{TextRenderingMode=2,LineWidth=0.05pt}

",
    );
    for line in preamble {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(
        r"\parindent0pt
\parskip0pt

\begin{document}
\fontsize{10}{12}\selectfont

",
    );

    for key in formulas {
        if key.is_inline() {
            out.push_str(CALIBRATION_MARK);
            out.push('\n');
            out.push('$');
            out.push_str(&key.formula);
            out.push_str("$\n");
        } else {
            out.push_str(&format!(
                "\\begin{{{env}}}\n  {}\n\\end{{{env}}}\n",
                key.formula,
                env = key.env
            ));
        }
        out.push_str("\\newpage\n\n");
    }

    out.push_str("\\end{document}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_source() {
        let inline = FormulaKey::new("$", "x^2");
        let display = FormulaKey::new("equation*", "a = b");
        let preamble = vec![r"\usepackage{amsmath}".to_string()];
        let tex = batch_source(&preamble, [&inline, &display]);

        assert!(tex.starts_with("\\documentclass{minimal}\n"));
        let pre = tex.find("\\usepackage{amsmath}\n").unwrap();
        let begin = tex.find("\\begin{document}").unwrap();
        assert!(pre < begin);

        let first = tex.find("\\kern6bp\n$x^2$\n\\newpage").unwrap();
        let second = tex
            .find("\\begin{equation*}\n  a = b\n\\end{equation*}\n\\newpage")
            .unwrap();
        assert!(first < second);
        assert!(tex.ends_with("\\end{document}\n"));
        assert_eq!(tex.matches("\\newpage").count(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let tex = batch_source(&[], Vec::<&FormulaKey>::new());
        assert!(!tex.contains("\\newpage"));
        assert!(tex.contains("\\parskip0pt\n"));
    }
}
