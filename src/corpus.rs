use crate::error::{Result, VectorizeError};
use crate::executor::ParallelExecutor;
use globset::{Glob, GlobMatcher};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for collecting documents from a directory
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Glob matched against file names (None = all files)
    pub include: Option<String>,

    /// Path components to exclude
    pub exclude_patterns: Vec<String>,

    /// Maximum file size to read (in bytes)
    pub max_file_size: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            include: None,
            exclude_patterns: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
                ".cache".to_string(),
                "__pycache__".to_string(),
            ],
            max_file_size: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// One file read as one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    pub path: PathBuf,
    pub text: String,
}

/// One document per line of `reader`
pub fn read_lines_from<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let documents = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
    Ok(documents)
}

/// One document per line of the file at `path`
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let documents = read_lines_from(BufReader::new(file))?;
    log::debug!("read {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

/// Read every matching file under `root` as one document
///
/// Files come back sorted by path, so document order (and with it the
/// fitted vocabulary) is stable across runs. Binary files are skipped.
pub fn read_directory(
    root: &Path,
    config: &CorpusConfig,
    executor: &ParallelExecutor,
) -> Result<Vec<CorpusFile>> {
    let files = collect_files(root, config)?;

    let documents: Vec<CorpusFile> = executor
        .map_each(files, |path| match read_document(&path) {
            Ok(Some(text)) => Some(CorpusFile { path, text }),
            Ok(None) => {
                log::debug!("skipping binary file {}", path.display());
                None
            }
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                None
            }
        })
        .into_iter()
        .flatten()
        .collect();

    log::info!(
        "read {} documents from {}",
        documents.len(),
        root.display()
    );
    Ok(documents)
}

/// Collect all files matching the configuration
fn collect_files(root: &Path, config: &CorpusConfig) -> Result<Vec<PathBuf>> {
    let include = config.include.as_deref().map(compile_glob).transpose()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !should_exclude(e.path(), &config.exclude_patterns))
    {
        let entry = entry.map_err(|e| VectorizeError::Walk(e.to_string()))?;

        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(matcher) = &include {
            if !matcher.is_match(entry.file_name()) {
                continue;
            }
        }

        // Check file size
        if let Ok(metadata) = entry.metadata() {
            if metadata.len() > config.max_file_size {
                continue;
            }
        }

        files.push(entry.into_path());
    }

    Ok(files)
}

fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = Glob::new(pattern).map_err(|e| {
        VectorizeError::Configuration(format!("invalid include glob {:?}: {}", pattern, e))
    })?;
    Ok(glob.compile_matcher())
}

/// Check if a path should be excluded
fn should_exclude(path: &Path, patterns: &[String]) -> bool {
    for component in path.components() {
        if let std::path::Component::Normal(name) = component {
            if let Some(name_str) = name.to_str() {
                if patterns.iter().any(|p| name_str == p) {
                    return true;
                }
            }
        }
    }
    false
}

/// File contents as text, `None` for binary files
fn read_document(path: &Path) -> std::io::Result<Option<String>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Some(String::new()));
    }

    let mmap = unsafe { Mmap::map(&file)? };

    // Check for binary file (null bytes in first 8KB)
    let check_len = std::cmp::min(8192, mmap.len());
    if mmap[..check_len].contains(&0) {
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&mmap).into_owned()))
}
