//! Section numbering and the table of contents.

use std::fmt;

/// Hierarchical section number, one slot per nesting level.
///
/// Front matter is numbered `0`; the first chapter is `1`, its first
/// section `1.1`, and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecNo(Vec<u32>);

impl SecNo {
    /// The pseudo-number used for front matter.
    pub fn front() -> Self {
        SecNo(vec![0])
    }

    /// Advance the counter at `level` (1-based); deeper slots are dropped,
    /// so the next deeper section starts again at 1.
    pub fn inc(&mut self, level: usize) {
        self.0.resize(level, 0);
        if let Some(last) = self.0.last_mut() {
            *last += 1;
        }
    }

    /// Top-level (chapter) component, `0` for front matter.
    pub fn chapter(&self) -> u32 {
        self.0.first().copied().unwrap_or(0)
    }

    pub fn is_front(&self) -> bool {
        self.chapter() == 0
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for SecNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{n}")?;
        }
        Ok(())
    }
}

/// A table of contents entry.
///
/// `ascend` and `descend` say how many outline levels to open before the
/// entry and close after it, so the navigation list can be written in a
/// single forward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: usize,
    pub title: String,
    /// File containing the section.
    pub path: String,
    /// Anchor id within that file.
    pub id: String,
    pub ascend: usize,
    pub descend: usize,
}

impl TocEntry {
    pub fn href(&self) -> String {
        format!("{}#{}", self.path, self.id)
    }
}

/// The ordered outline of a book.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    entries: Vec<TocEntry>,
}

impl Nav {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, fixing up the nesting counts of its predecessor.
    pub fn push(
        &mut self,
        level: usize,
        title: impl Into<String>,
        path: impl Into<String>,
        id: impl Into<String>,
    ) {
        let mut ascend = level;
        if let Some(prev) = self.entries.last_mut() {
            if level < prev.level {
                prev.descend = prev.level - level;
                ascend = 0;
            } else {
                prev.descend = 0;
                ascend = level - prev.level;
            }
        }
        self.entries.push(TocEntry {
            level,
            title: title.into(),
            path: path.into(),
            id: id.into(),
            ascend,
            descend: 0,
        });
    }

    /// Close every open outline level after the last entry.
    pub fn seal(&mut self) {
        if let Some(last) = self.entries.last_mut() {
            last.descend = last.level;
        }
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
