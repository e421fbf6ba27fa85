/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;

use ytaisub::file_utils::FileManager;
use crate::common;

#[test]
fn test_ensure_dir_withNestedPath_shouldCreateAll() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("a").join("b").join("c");

    FileManager::ensure_dir(&nested)?;
    assert!(nested.is_dir());

    // Idempotent
    FileManager::ensure_dir(&nested)?;
    Ok(())
}

#[test]
fn test_unique_path_withoutTag_shouldUseUuidStem() {
    let path = FileManager::unique_path("/work", None, "srt");
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    let stem = name.trim_end_matches(".srt");
    assert_eq!(stem.len(), 36);
    assert!(uuid_like(stem));
}

#[test]
fn test_find_by_stem_shouldOnlyMatchPrefix() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "abc.mp4", "")?;
    common::create_test_file(temp_dir.path(), "abc.en.srt", "")?;
    common::create_test_file(temp_dir.path(), "xyz.mp4", "")?;
    fs::create_dir(temp_dir.path().join("abc-dir"))?;

    let found = FileManager::find_by_stem(temp_dir.path(), "abc")?;
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| p.is_file()));
    Ok(())
}

#[test]
fn test_write_atomically_shouldReplaceExistingContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "out.srt", "old")?;

    FileManager::write_atomically(&path, "new")?;
    assert_eq!(FileManager::read_to_string(&path)?, "new");

    // No temporary files left behind
    assert_eq!(common::list_files(temp_dir.path()).len(), 1);
    Ok(())
}

#[test]
fn test_translated_sibling_path_shouldNeverEqualSource() {
    let source = std::path::Path::new("/videos/talk.en.srt");
    let sibling = FileManager::translated_sibling_path(source);
    assert_ne!(sibling, source);
    assert!(sibling.to_string_lossy().starts_with("/videos/talk.en_"));
}

fn uuid_like(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit() || c == '-') && s.matches('-').count() == 4
}
