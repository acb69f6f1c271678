use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use fraudlens_alerts::Interpretation;
use serde::Deserialize;

/// Accepted batch file layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Rows(Vec<Vec<f64>>),
    Wrapped { features: Vec<Vec<f64>> },
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read batch from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn read_batch(path: &Path) -> Result<Vec<Vec<f64>>> {
    let content = read_source(path)?;
    let batch: BatchFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse batch: {}", path.display()))?;
    Ok(match batch {
        BatchFile::Rows(rows) => rows,
        BatchFile::Wrapped { features } => features,
    })
}

pub fn read_interpretation(path: &Path) -> Result<Interpretation> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse interpretation: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use fraudlens_alerts::RiskLevel;

    use super::*;

    fn file_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_plain_rows() {
        let file = file_with("[[1.0, 2.0], [3.5, -4]]");
        assert_eq!(
            read_batch(file.path()).unwrap(),
            vec![vec![1.0, 2.0], vec![3.5, -4.0]]
        );
    }

    #[test]
    fn reads_wrapped_rows() {
        let file = file_with(r#"{"features": [[0.5], [0.25]]}"#);
        assert_eq!(read_batch(file.path()).unwrap(), vec![vec![0.5], vec![0.25]]);
    }

    #[test]
    fn rejects_non_numeric_batch() {
        let file = file_with(r#"[["a", "b"]]"#);
        let err = read_batch(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse batch"));
    }

    #[test]
    fn reads_interpretation() {
        let file = file_with(
            r#"{"confidence": 0.8, "false_positive_likelihood": 0.1, "risk_level": "critical"}"#,
        );
        let interp = read_interpretation(file.path()).unwrap();
        assert_eq!(interp.confidence, 0.8);
        assert_eq!(interp.risk_level, Some(RiskLevel::Critical));
        assert!(interp.recommended_actions.is_empty());
    }
}
