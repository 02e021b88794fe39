use anyhow::Result;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFilter {
    #[default]
    Png,
    All,
}

impl FileFilter {
    fn accepts(self, path: &Path) -> bool {
        match self {
            FileFilter::All => true,
            FileFilter::Png => path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png")),
        }
    }
}

/// One-directory-at-a-time picker for the local mask image.
pub struct FileBrowser {
    dir: PathBuf,
    pub entries: Vec<FileEntry>,
    pub selected: usize,
    filter: FileFilter,
}

impl FileBrowser {
    pub fn new(dir: PathBuf) -> Result<Self> {
        let mut browser = Self {
            dir,
            entries: Vec::new(),
            selected: 0,
            filter: FileFilter::default(),
        };

        browser.refresh()?;
        Ok(browser)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filter(&self) -> FileFilter {
        self.filter
    }

    pub fn refresh(&mut self) -> Result<()> {
        let dir = self.dir.clone();
        let filter = self.filter;

        let mut entries: Vec<FileEntry> = WalkBuilder::new(&dir)
            .max_depth(Some(1))
            .hidden(true)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .build()
            .flatten()
            .filter_map(|entry| {
                let path = entry.path().to_path_buf();
                if path == dir {
                    return None;
                }

                let metadata = entry.metadata().ok()?;
                let is_dir = metadata.is_dir();
                if !is_dir && !filter.accepts(&path) {
                    return None;
                }

                let name = entry.file_name().to_str()?.to_string();
                Some(FileEntry { path, name, is_dir })
            })
            .collect();

        entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });

        self.entries = entries;
        if self.entries.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.entries.len() {
            self.selected = self.entries.len() - 1;
        }

        Ok(())
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            self.selected = 0;
            return;
        }

        let max = self.entries.len().saturating_sub(1) as isize;
        let next = (self.selected as isize + delta).clamp(0, max);
        self.selected = next as usize;
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.entries.get(self.selected)
    }

    pub fn toggle_filter(&mut self) -> Result<()> {
        self.filter = match self.filter {
            FileFilter::Png => FileFilter::All,
            FileFilter::All => FileFilter::Png,
        };
        self.refresh()
    }

    pub fn go_parent(&mut self) -> Result<()> {
        let Some(parent) = self.dir.parent() else {
            return Ok(());
        };

        let previous = self.dir.clone();
        self.dir = parent.to_path_buf();
        self.selected = 0;
        self.refresh()?;

        if let Some(idx) = self.entries.iter().position(|e| e.path == previous) {
            self.selected = idx;
        }

        Ok(())
    }

    /// Descends into a selected directory, or returns the selected file.
    pub fn activate(&mut self) -> Result<Option<PathBuf>> {
        let Some(entry) = self.selected_entry().cloned() else {
            return Ok(None);
        };

        if !entry.is_dir {
            return Ok(Some(entry.path));
        }

        self.dir = entry.path;
        self.selected = 0;
        self.refresh()?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("calibration")).unwrap();
        fs::write(dir.path().join("calibration").join("mask.png"), b"png").unwrap();
        fs::write(dir.path().join("B_mask.PNG"), b"png").unwrap();
        fs::write(dir.path().join("a_mask.png"), b"png").unwrap();
        fs::write(dir.path().join("notes.txt"), b"txt").unwrap();
        fs::write(dir.path().join(".hidden.png"), b"png").unwrap();
        dir
    }

    fn names(browser: &FileBrowser) -> Vec<String> {
        browser.entries.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn lists_directories_first_then_png_files() {
        let dir = fixture();
        let browser = FileBrowser::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(names(&browser), ["calibration", "a_mask.png", "B_mask.PNG"]);
    }

    #[test]
    fn all_files_filter_shows_everything_visible() {
        let dir = fixture();
        let mut browser = FileBrowser::new(dir.path().to_path_buf()).unwrap();
        browser.toggle_filter().unwrap();
        assert_eq!(browser.filter(), FileFilter::All);
        assert_eq!(
            names(&browser),
            ["calibration", "a_mask.png", "B_mask.PNG", "notes.txt"]
        );
    }

    #[test]
    fn activate_descends_then_returns_file() {
        let dir = fixture();
        let mut browser = FileBrowser::new(dir.path().to_path_buf()).unwrap();

        assert_eq!(browser.activate().unwrap(), None);
        assert_eq!(browser.dir(), dir.path().join("calibration"));
        assert_eq!(names(&browser), ["mask.png"]);

        let picked = browser.activate().unwrap();
        assert_eq!(picked, Some(dir.path().join("calibration").join("mask.png")));
    }

    #[test]
    fn parent_reselects_the_directory_we_came_from() {
        let dir = fixture();
        let mut browser = FileBrowser::new(dir.path().join("calibration")).unwrap();
        browser.go_parent().unwrap();

        assert_eq!(browser.dir(), dir.path());
        assert_eq!(browser.selected_entry().unwrap().name, "calibration");
    }

    #[test]
    fn selection_is_clamped() {
        let dir = fixture();
        let mut browser = FileBrowser::new(dir.path().to_path_buf()).unwrap();
        browser.move_selection(10);
        assert_eq!(browser.selected, 2);
        browser.move_selection(-10);
        assert_eq!(browser.selected, 0);
    }
}
