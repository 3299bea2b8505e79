//! Editing of existing torrents
//!
//! Changes the tracker, name, source or privacy fields of a loaded
//! descriptor. Piece data and file layout are never touched.

use tracing::{debug, info};

use crate::torrent::info::Metainfo;

/// Fields to change on a descriptor; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetainfoEdit {
    /// New torrent name
    pub name: Option<String>,
    /// New source tag; an empty string removes it
    pub source: Option<String>,
    /// New tracker URLs, one tier each
    pub announce: Option<Vec<String>>,
    /// New private flag
    pub private: Option<bool>,
}

impl MetainfoEdit {
    /// Check if the edit changes nothing
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Editable view of a descriptor's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetainfoValues {
    pub name: String,
    pub source: Option<String>,
    pub announce: Vec<String>,
    pub private: bool,
}

impl Metainfo {
    /// Current values of the editable fields
    pub fn values(&self) -> MetainfoValues {
        MetainfoValues {
            name: self.info.name.clone(),
            source: self.info.source.clone(),
            announce: self
                .announce_list
                .iter()
                .filter(|tier| tier.len() == 1)
                .map(|tier| tier[0].clone())
                .collect(),
            private: self.info.private,
        }
    }

    /// Apply `edit` in place.
    ///
    /// Changing the name, source or private flag changes the info-hash.
    pub fn apply_edit(&mut self, edit: &MetainfoEdit) {
        if edit.is_empty() {
            debug!("Empty edit, torrent '{}' unchanged", self.info.name);
            return;
        }

        if let Some(name) = &edit.name {
            self.info.name = name.clone();
        }
        if let Some(source) = &edit.source {
            self.info.source = Some(source.clone()).filter(|s| !s.is_empty());
        }
        if let Some(announce) = &edit.announce {
            self.set_announce_urls(announce);
        }
        if let Some(private) = edit.private {
            self.info.private = private;
        }

        info!("Edited torrent '{}'", self.info.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torrent::info::{FileEntry, Info};

    fn sample() -> Metainfo {
        Metainfo {
            announce_list: vec![
                vec!["http://a/announce".to_string()],
                vec!["http://b/announce".to_string(), "http://c/announce".to_string()],
            ],
            creation_date: Some(1),
            comment: None,
            created_by: None,
            info: Info {
                name: "before".to_string(),
                piece_length: 16384,
                pieces: vec![1u8; 20],
                private: false,
                source: Some("OLD".to_string()),
                files: vec![FileEntry { length: 10, path: vec!["before".to_string()] }],
                total_length: 10,
            },
        }
    }

    #[test]
    fn test_values_skip_multi_url_tiers() {
        let values = sample().values();
        assert_eq!(values.announce, vec!["http://a/announce".to_string()]);
        assert_eq!(values.source.as_deref(), Some("OLD"));
        assert!(!values.private);
    }

    #[test]
    fn test_apply_edit() {
        let mut meta = sample();
        meta.apply_edit(&MetainfoEdit {
            name: Some("after".to_string()),
            source: Some("NEW".to_string()),
            announce: Some(vec!["udp://x:1".to_string(), "udp://y:2".to_string()]),
            private: Some(true),
        });

        let values = meta.values();
        assert_eq!(values.name, "after");
        assert_eq!(values.source.as_deref(), Some("NEW"));
        assert_eq!(meta.announce_list, vec![vec!["udp://x:1".to_string()], vec!["udp://y:2".to_string()]]);
        assert!(values.private);
        assert_eq!(meta.info.pieces, vec![1u8; 20]);
    }

    #[test]
    fn test_empty_source_removes_tag() {
        let mut meta = sample();
        meta.apply_edit(&MetainfoEdit {
            source: Some(String::new()),
            ..Default::default()
        });
        assert!(meta.info.source.is_none());
    }

    #[test]
    fn test_empty_edit_is_noop() {
        let mut meta = sample();
        meta.apply_edit(&MetainfoEdit::default());
        assert_eq!(meta, sample());
    }

    #[test]
    fn test_edit_survives_round_trip() {
        let mut meta = sample();
        let before = meta.info_hash().unwrap();
        meta.apply_edit(&MetainfoEdit {
            private: Some(true),
            ..Default::default()
        });
        assert_ne!(meta.info_hash().unwrap(), before);

        let decoded = Metainfo::from_bytes(&meta.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.values(), meta.values());
    }
}
