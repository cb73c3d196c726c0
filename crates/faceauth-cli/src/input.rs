use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// A descriptor file is either a bare JSON array of numbers or an object
/// with a `descriptor` array (e.g. a saved request body or identity record).
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorDoc {
    Bare(Vec<f32>),
    Wrapped { descriptor: Vec<f32> },
}

/// Read a descriptor from `source`, where `-` means stdin.
pub fn read_descriptor(source: &str) -> Result<Vec<f32>> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading descriptor from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("reading descriptor file {source}"))?
    };
    parse_descriptor(&text).with_context(|| format!("parsing descriptor from {source}"))
}

pub fn parse_descriptor(text: &str) -> Result<Vec<f32>> {
    let doc: DescriptorDoc =
        serde_json::from_str(text).context("expected a JSON array of numbers or {\"descriptor\": [...]}")?;
    Ok(match doc {
        DescriptorDoc::Bare(values) | DescriptorDoc::Wrapped { descriptor: values } => values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        assert_eq!(parse_descriptor("[0.5, -1, 2.25]").unwrap(), vec![0.5, -1.0, 2.25]);
    }

    #[test]
    fn test_parse_wrapped_object() {
        let text = r#"{"displayName": "Alice", "descriptor": [1, 2]}"#;
        assert_eq!(parse_descriptor(text).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_descriptor("not json").is_err());
        assert!(parse_descriptor(r#"{"values": [1]}"#).is_err());
        assert!(parse_descriptor(r#"["a", "b"]"#).is_err());
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidate.json");
        std::fs::write(&path, "[0.0, 0.1]").unwrap();

        let values = read_descriptor(path.to_str().unwrap()).unwrap();
        assert_eq!(values, vec![0.0, 0.1]);
    }

    #[test]
    fn test_read_missing_file_errors() {
        assert!(read_descriptor("/nonexistent/faceauth/candidate.json").is_err());
    }
}
