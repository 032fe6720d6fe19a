//! Font configuration and loading.
//!
//! A [`FontConfig`] names the families that styles may reference. Each family
//! lists up to four TrueType files; variants that are not given reuse the
//! regular file. Files are looked up by their configured path first and then
//! by file name in the search directories, in this order:
//!
//! 1. directories added with [`FontConfig::with_search_dir`]
//! 2. the directory named by the `GUIDE_PDF_FONTS_DIR` environment variable
//! 3. `assets/fonts` next to the running executable
//! 4. `assets/fonts` inside this crate

use std::env;
use std::path::{Path, PathBuf};

use genpdf::fonts::{FontData, FontFamily};
use log::debug;

use crate::error::FontError;

/// Environment variable naming an extra font directory.
pub const FONTS_DIR_ENV: &str = "GUIDE_PDF_FONTS_DIR";

/// Family used for nearly all text in the guide.
pub const SIMHEI_FAMILY: &str = "SimHei";
/// Family used for the cover year.
pub const TIMES_FAMILY: &str = "Times New Roman";

const SIMHEI_PATH: &str = "/usr/share/fonts/truetype/chinese/SimHei.ttf";
const TIMES_PATH: &str = "/usr/share/fonts/truetype/english/Times-New-Roman.ttf";

/// Files of one font family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontSource {
    /// Regular face.
    pub regular: PathBuf,
    /// Bold face.
    pub bold: Option<PathBuf>,
    /// Italic face.
    pub italic: Option<PathBuf>,
    /// Bold italic face.
    pub bold_italic: Option<PathBuf>,
}

impl FontSource {
    /// A family with a single face used for every variant.
    pub fn single(regular: impl Into<PathBuf>) -> Self {
        Self {
            regular: regular.into(),
            bold: None,
            italic: None,
            bold_italic: None,
        }
    }

    /// Sets the bold face.
    pub fn with_bold(mut self, path: impl Into<PathBuf>) -> Self {
        self.bold = Some(path.into());
        self
    }

    /// Sets the italic face.
    pub fn with_italic(mut self, path: impl Into<PathBuf>) -> Self {
        self.italic = Some(path.into());
        self
    }

    /// Sets the bold italic face.
    pub fn with_bold_italic(mut self, path: impl Into<PathBuf>) -> Self {
        self.bold_italic = Some(path.into());
        self
    }
}

/// A named family and its files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FamilySpec {
    /// Name referenced by styles.
    pub name: String,
    /// Font files.
    pub source: FontSource,
}

/// The font families available to a render.
///
/// The first family is the document default.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontConfig {
    families: Vec<FamilySpec>,
    search_dirs: Vec<PathBuf>,
}

impl FontConfig {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The two families of the monetization guide at their usual system paths.
    pub fn guide_defaults() -> Self {
        Self::new()
            .with_family(SIMHEI_FAMILY, FontSource::single(SIMHEI_PATH))
            .with_family(TIMES_FAMILY, FontSource::single(TIMES_PATH))
    }

    /// Adds or replaces a family.
    pub fn with_family(mut self, name: impl Into<String>, source: FontSource) -> Self {
        let name = name.into();
        match self.families.iter_mut().find(|family| family.name == name) {
            Some(existing) => existing.source = source,
            None => self.families.push(FamilySpec { name, source }),
        }
        self
    }

    /// Adds a directory searched for font files by name.
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    /// Configured families, default first.
    pub fn families(&self) -> &[FamilySpec] {
        &self.families
    }

    /// Whether a family with this name is configured.
    pub fn contains(&self, name: &str) -> bool {
        self.families.iter().any(|family| family.name == name)
    }

    /// Name of the default family.
    pub fn default_family(&self) -> Option<&str> {
        self.families.first().map(|family| family.name.as_str())
    }

    fn search_directories(&self) -> Vec<PathBuf> {
        let mut dirs = self.search_dirs.clone();

        if let Some(dir) = env::var_os(FONTS_DIR_ENV) {
            if !dir.is_empty() {
                dirs.push(PathBuf::from(dir));
            }
        }

        if let Ok(current_exe) = env::current_exe() {
            if let Some(bin_dir) = current_exe.parent() {
                dirs.push(bin_dir.join("assets/fonts"));
            }
        }

        dirs.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));

        let mut unique: Vec<PathBuf> = Vec::with_capacity(dirs.len());
        for dir in dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        unique
    }

    /// Finds the file for `path`, reporting every location tried on failure.
    pub fn locate(&self, family: &str, path: &Path) -> Result<PathBuf, FontError> {
        let mut searched = vec![path.to_path_buf()];
        if path.is_file() {
            return Ok(path.to_path_buf());
        }

        if let Some(file_name) = path.file_name() {
            for dir in self.search_directories() {
                let candidate = dir.join(file_name);
                if candidate.is_file() {
                    debug!("found `{}` at {}", path.display(), candidate.display());
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(FontError::Missing {
            family: family.to_owned(),
            file: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            searched,
        })
    }

    /// Whether every configured font file can be found.
    pub fn is_available(&self) -> bool {
        !self.families.is_empty()
            && self.families.iter().all(|family| {
                variant_paths(&family.source)
                    .iter()
                    .all(|path| self.locate(&family.name, path).is_ok())
            })
    }

    /// Reads every configured family.
    pub fn load(&self) -> Result<Vec<(String, FontFamily<FontData>)>, FontError> {
        self.families
            .iter()
            .map(|family| Ok((family.name.clone(), self.load_family(family)?)))
            .collect()
    }

    fn load_family(&self, family: &FamilySpec) -> Result<FontFamily<FontData>, FontError> {
        let source = &family.source;
        let regular = self.load_face(&family.name, &source.regular)?;
        let variant = |path: &Option<PathBuf>| match path {
            Some(path) => self.load_face(&family.name, path),
            None => Ok(regular.clone()),
        };

        Ok(FontFamily {
            bold: variant(&source.bold)?,
            italic: variant(&source.italic)?,
            bold_italic: variant(&source.bold_italic)?,
            regular: regular.clone(),
        })
    }

    fn load_face(&self, family: &str, path: &Path) -> Result<FontData, FontError> {
        let resolved = self.locate(family, path)?;
        debug!("loading font family `{family}` from {}", resolved.display());
        FontData::load(&resolved, None).map_err(|source| FontError::Load {
            family: family.to_owned(),
            path: resolved,
            source,
        })
    }
}

fn variant_paths(source: &FontSource) -> Vec<&Path> {
    let mut paths = vec![source.regular.as_path()];
    paths.extend(
        [&source.bold, &source.italic, &source.bold_italic]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path),
    );
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_family_definition_replaces_earlier_one() {
        let config = FontConfig::new()
            .with_family("Body", FontSource::single("a.ttf"))
            .with_family("Mono", FontSource::single("m.ttf"))
            .with_family("Body", FontSource::single("b.ttf"));
        assert_eq!(config.families().len(), 2);
        assert_eq!(config.default_family(), Some("Body"));
        assert_eq!(config.families()[0].source.regular, PathBuf::from("b.ttf"));
        assert!(config.contains("Mono"));
        assert!(!config.contains("Arial"));
    }

    #[test]
    fn guide_defaults_name_both_families() {
        let config = FontConfig::guide_defaults();
        assert_eq!(config.default_family(), Some(SIMHEI_FAMILY));
        assert!(config.contains(TIMES_FAMILY));
    }

    #[test]
    fn file_is_found_by_name_in_search_dir() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("Custom.ttf");
        std::fs::write(&font, b"not really a font").unwrap();

        let config = FontConfig::new().with_search_dir(dir.path());
        let found = config
            .locate("Custom", Path::new("/nonexistent/fonts/Custom.ttf"))
            .unwrap();
        assert_eq!(found, font);
    }

    #[test]
    fn missing_file_lists_searched_locations() {
        let dir = tempfile::tempdir().unwrap();
        let config = FontConfig::new()
            .with_family("Ghost", FontSource::single("/nonexistent/Ghost-Regular.ttf"))
            .with_search_dir(dir.path());

        assert!(!config.is_available());
        match config.load() {
            Err(FontError::Missing {
                family,
                file,
                searched,
            }) => {
                assert_eq!(family, "Ghost");
                assert_eq!(file, "Ghost-Regular.ttf");
                assert_eq!(searched[0], PathBuf::from("/nonexistent/Ghost-Regular.ttf"));
                assert!(searched.contains(&dir.path().join("Ghost-Regular.ttf")));
            }
            Err(other) => panic!("expected missing font, got {other}"),
            Ok(_) => panic!("expected missing font"),
        }
    }

    #[test]
    fn unreadable_font_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("Broken.ttf");
        std::fs::write(&font, b"garbage").unwrap();

        let config = FontConfig::new().with_family("Broken", FontSource::single(&font));
        assert!(matches!(config.load(), Err(FontError::Load { .. })));
    }
}
