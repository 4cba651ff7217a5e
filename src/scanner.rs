use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DemTilesError, Result};
use crate::writer::TILE_EXTENSION;

/// Names of the direct sub-directories of `base_dir`.
pub fn discover_date_directories(base_dir: &Path) -> Result<BTreeSet<String>> {
    let mut dirs = BTreeSet::new();

    for entry in fs::read_dir(base_dir).map_err(|e| DemTilesError::io(base_dir, e))? {
        let entry = entry.map_err(|e| DemTilesError::io(base_dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            dirs.insert(name.to_string());
        }
    }

    Ok(dirs)
}

/// Tile rasters inside one date directory, sorted by file name.
pub fn list_tile_files(date_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(date_dir).map_err(|e| DemTilesError::io(date_dir, e))? {
        let entry = entry.map_err(|e| DemTilesError::io(date_dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some(TILE_EXTENSION) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discovers_only_directories() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir(base.join("2024-08-02")).unwrap();
        fs::create_dir(base.join("2024-08-01")).unwrap();
        fs::write(base.join("notes.txt"), b"x").unwrap();
        fs::write(base.join("stray.tif"), b"x").unwrap();

        let dirs = discover_date_directories(base).unwrap();
        let dirs: Vec<_> = dirs.into_iter().collect();
        assert_eq!(dirs, vec!["2024-08-01", "2024-08-02"]);
    }

    #[test]
    fn test_lists_only_tif_files_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("2024-08-01");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("dem_tile_1_0_2024-08-01.tif"), b"x").unwrap();
        fs::write(dir.join("dem_tile_0_0_2024-08-01.tif"), b"x").unwrap();
        fs::write(dir.join("dem_tile_0_0_2024-08-01.tif.aux.xml"), b"x").unwrap();
        fs::write(dir.join("readme.md"), b"x").unwrap();
        fs::create_dir(dir.join("nested.tif")).unwrap();

        let files = list_tile_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["dem_tile_0_0_2024-08-01.tif", "dem_tile_1_0_2024-08-01.tif"]
        );
    }

    #[test]
    fn test_missing_base_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = discover_date_directories(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(DemTilesError::Io { .. })));
    }
}
