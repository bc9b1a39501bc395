//! The content store: every file a book contains, keyed by path.

use std::collections::HashMap;

use super::media::{File, MediaType};

/// Registered files, keyed by their package-relative path.
///
/// Paths are unique; ids are handed out in registration order.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    files: HashMap<String, File>,
    order: Vec<String>,
    next_id: usize,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new file named after `base_name`.
    ///
    /// The media type decides subdirectory and extension. If the path is
    /// taken, `2`, `3`, ... is appended to the base name until it is free.
    pub fn register(&mut self, base_name: &str, media_type: MediaType) -> File {
        let file = File {
            id: format!("f{}", self.next_id),
            media_type,
            path: self.unique_name(
                &format!("{}{}", media_type.dir(), base_name),
                media_type.extension(),
            ),
        };
        self.next_id += 1;

        self.order.push(file.path.clone());
        self.files.insert(file.path.clone(), file.clone());
        file
    }

    fn unique_name(&self, name: &str, ext: &str) -> String {
        let mut candidate = format!("{name}{ext}");
        let mut unique = 2;
        while self.files.contains_key(&candidate) {
            candidate = format!("{name}{unique}{ext}");
            unique += 1;
        }
        candidate
    }

    pub fn get(&self, path: &str) -> Option<&File> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Files in registration (manifest id) order.
    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.order.iter().filter_map(|path| self.files.get(path))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_paths() {
        let mut store = ContentStore::new();
        let paths: Vec<_> = (0..3)
            .map(|_| store.register("cover", MediaType::Png).path)
            .collect();
        assert_eq!(paths, vec!["img/cover.png", "img/cover2.png", "img/cover3.png"]);
    }

    #[test]
    fn test_ids_follow_registration() {
        let mut store = ContentStore::new();
        let a = store.register("ch1", MediaType::Xhtml);
        let b = store.register("book", MediaType::Css);
        let c = store.register("cover", MediaType::Jpeg);
        assert_eq!((a.id.as_str(), b.id.as_str(), c.id.as_str()), ("f0", "f1", "f2"));
        assert_eq!(b.path, "css/book.css");
        assert_eq!(c.path, "img/cover.jpg");

        let ids: Vec<_> = store.iter().map(|f| f.id.clone()).collect();
        assert_eq!(ids, vec!["f0", "f1", "f2"]);
    }

    #[test]
    fn test_collision_across_counter() {
        let mut store = ContentStore::new();
        // "ch1" twice collides with a later "ch12"
        store.register("ch1", MediaType::Xhtml);
        assert_eq!(store.register("ch1", MediaType::Xhtml).path, "ch12.xhtml");
        assert_eq!(store.register("ch12", MediaType::Xhtml).path, "ch122.xhtml");
        assert_eq!(store.len(), 3);
    }
}
