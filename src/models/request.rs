use camino::Utf8PathBuf;

/// Inputs of a single repack run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackRequest {
    /// Factory image archive to repack; never modified
    pub source_archive: Utf8PathBuf,

    /// Images copied into the nested archive, in order; later files win on name clashes
    pub replacements: Vec<Utf8PathBuf>,
}

impl RepackRequest {
    pub fn new(source_archive: impl Into<Utf8PathBuf>, replacements: Vec<Utf8PathBuf>) -> Self {
        Self {
            source_archive: source_archive.into(),
            replacements,
        }
    }

    /// Build a request from the two UI text fields.
    ///
    /// The payload field holds `;`-separated paths; blank segments are ignored.
    pub fn from_fields(archive_field: &str, payload_field: &str) -> Self {
        Self {
            source_archive: Utf8PathBuf::from(archive_field.trim()),
            replacements: split_payload_field(payload_field),
        }
    }
}

/// Split a `;`-joined payload field into paths
pub fn split_payload_field(field: &str) -> Vec<Utf8PathBuf> {
    field
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(Utf8PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fields() {
        let request = RepackRequest::from_fields(
            " /images/factory.zip ",
            "/out/boot.img;/out/vendor_boot.img",
        );

        assert_eq!(request.source_archive, Utf8PathBuf::from("/images/factory.zip"));
        assert_eq!(
            request.replacements,
            vec![
                Utf8PathBuf::from("/out/boot.img"),
                Utf8PathBuf::from("/out/vendor_boot.img")
            ]
        );
    }

    #[test]
    fn test_blank_segments_are_dropped() {
        assert!(split_payload_field("").is_empty());
        assert_eq!(split_payload_field(";a.img;; ;b.img;").len(), 2);
    }
}
