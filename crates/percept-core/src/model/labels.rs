//! Label vocabulary loading.

use std::path::Path;

use tracing::debug;

use crate::error::ModelError;

/// Load a label vocabulary from a file, one label per line.
///
/// Blank lines are skipped; line order defines class indexes.
pub fn load_labels(path: &Path) -> Result<Vec<String>, ModelError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ModelError::Load(format!("Failed to load labels: {}", e)))?;

    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    debug!("Loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_a_load_error() {
        let result = load_labels(Path::new("/nonexistent/labels.txt"));
        assert!(matches!(result, Err(ModelError::Load(_))));
    }

    #[test]
    fn test_line_order_defines_indexes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tabby cat\n\n  golden retriever  \nrobin").unwrap();

        let labels = load_labels(file.path()).unwrap();
        assert_eq!(labels, vec!["tabby cat", "golden retriever", "robin"]);
    }
}
