//! `.torrent` metainfo loading (BEP 3 single and multi-file layouts).

mod bencode;

use std::fs;
use std::path::{Component, Path, PathBuf};

use sha1::{Digest, Sha1};

use self::bencode::{Dict, Value};
use crate::error::DescriptorError;
use crate::model::{Descriptor, DescriptorFile, InfoHash};
use crate::service::DescriptorLoader;

/// File suffix recognised as a torrent descriptor.
pub const DESCRIPTOR_SUFFIX: &str = ".torrent";

/// Loads descriptors from bencoded metainfo files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetainfoLoader;

impl MetainfoLoader {
    /// Parse metainfo bytes that were read from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::Malformed`] when the payload is not valid
    /// bencode or does not describe a well-formed torrent.
    pub fn parse(source: &Path, data: &[u8]) -> Result<Descriptor, DescriptorError> {
        let malformed = |reason: String| DescriptorError::Malformed {
            path: source.to_path_buf(),
            reason,
        };

        let root = bencode::decode(data).map_err(|err| malformed(err.to_string()))?;
        let root = root
            .as_dict()
            .ok_or_else(|| malformed("root is not a dictionary".into()))?;
        let info = root
            .get(b"info")
            .and_then(Value::as_dict)
            .ok_or_else(|| malformed("missing info dictionary".into()))?;

        let digest: [u8; 20] = Sha1::digest(info.raw()).into();
        let parsed = parse_info(info).map_err(|reason| malformed(reason.into()))?;

        Ok(Descriptor {
            source: source.to_path_buf(),
            name: parsed.name,
            info_hash: InfoHash::new(digest),
            trackers: collect_trackers(root),
            piece_length: parsed.piece_length,
            files: parsed.files,
            single_file: parsed.single_file,
            private: parsed.private,
        })
    }
}

impl DescriptorLoader for MetainfoLoader {
    fn load(&self, path: &Path) -> Result<Descriptor, DescriptorError> {
        let data = fs::read(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &data)
    }
}

struct ParsedInfo {
    name: String,
    piece_length: u64,
    files: Vec<DescriptorFile>,
    single_file: bool,
    private: bool,
}

fn parse_info(info: &Dict<'_>) -> Result<ParsedInfo, &'static str> {
    let name = info
        .get(b"name")
        .and_then(Value::as_str)
        .ok_or("info.name missing or not utf-8")?;
    if !is_safe_component(name) {
        return Err("info.name is not a safe path component");
    }

    let piece_length = info
        .get(b"piece length")
        .and_then(Value::as_int)
        .and_then(|value| u64::try_from(value).ok())
        .filter(|value| *value > 0)
        .ok_or("info.piece length missing or not positive")?;

    let pieces = info
        .get(b"pieces")
        .and_then(Value::as_bytes)
        .ok_or("info.pieces missing")?;
    if pieces.is_empty() || pieces.len() % 20 != 0 {
        return Err("info.pieces is not a list of sha-1 digests");
    }

    let private = info.get(b"private").and_then(Value::as_int) == Some(1);

    let (files, single_file) = match (info.get(b"length"), info.get(b"files")) {
        (Some(length), None) => {
            let length = non_negative(length).ok_or("info.length is not a size")?;
            let file = DescriptorFile {
                path: PathBuf::from(name),
                length,
            };
            (vec![file], true)
        }
        (None, Some(files)) => (parse_files(name, files)?, false),
        (Some(_), Some(_)) => return Err("info has both length and files"),
        (None, None) => return Err("info has neither length nor files"),
    };

    Ok(ParsedInfo {
        name: name.to_string(),
        piece_length,
        files,
        single_file,
        private,
    })
}

fn parse_files(name: &str, files: &Value<'_>) -> Result<Vec<DescriptorFile>, &'static str> {
    let entries = files.as_list().ok_or("info.files is not a list")?;
    if entries.is_empty() {
        return Err("info.files is empty");
    }
    entries
        .iter()
        .map(|entry| {
            let entry = entry.as_dict().ok_or("file entry is not a dictionary")?;
            let length = entry
                .get(b"length")
                .and_then(non_negative)
                .ok_or("file entry length is not a size")?;
            let components = entry
                .get(b"path")
                .and_then(Value::as_list)
                .filter(|components| !components.is_empty())
                .ok_or("file entry path missing")?;
            let mut path = PathBuf::from(name);
            for component in components {
                let component = component
                    .as_str()
                    .filter(|component| is_safe_component(component))
                    .ok_or("file entry path has an unsafe component")?;
                path.push(component);
            }
            Ok(DescriptorFile { path, length })
        })
        .collect()
}

fn non_negative(value: &Value<'_>) -> Option<u64> {
    value.as_int().and_then(|value| u64::try_from(value).ok())
}

fn is_safe_component(component: &str) -> bool {
    let mut parts = Path::new(component).components();
    matches!(
        (parts.next(), parts.next()),
        (Some(Component::Normal(_)), None)
    ) && !component.contains(['/', '\\'])
}

fn collect_trackers(root: &Dict<'_>) -> Vec<String> {
    let mut trackers: Vec<String> = Vec::new();
    let mut push = |url: &str| {
        if !url.is_empty() && !trackers.iter().any(|known| known == url) {
            trackers.push(url.to_string());
        }
    };

    if let Some(announce) = root.get(b"announce").and_then(Value::as_str) {
        push(announce);
    }
    for tier in root
        .get(b"announce-list")
        .and_then(Value::as_list)
        .unwrap_or_default()
    {
        for url in tier.as_list().unwrap_or_default() {
            if let Some(url) = url.as_str() {
                push(url);
            }
        }
    }
    trackers
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirseeder_test_support::fixtures::TorrentFixture;
    use tempfile::TempDir;

    #[test]
    fn parses_single_file_descriptor() -> anyhow::Result<()> {
        let fixture = TorrentFixture::single_file("movie.mkv", 40_000)
            .with_announce("http://tracker.local:6969/announce");
        let descriptor = MetainfoLoader::parse(Path::new("movie.torrent"), &fixture.encode())?;

        assert_eq!(descriptor.name, "movie.mkv");
        assert!(descriptor.single_file);
        assert_eq!(descriptor.total_size(), 40_000);
        assert_eq!(descriptor.files[0].path, PathBuf::from("movie.mkv"));
        assert_eq!(
            descriptor.trackers,
            vec!["http://tracker.local:6969/announce".to_string()]
        );
        let expected: [u8; 20] = Sha1::digest(fixture.encode_info()).into();
        assert_eq!(descriptor.info_hash, InfoHash::new(expected));
        Ok(())
    }

    #[test]
    fn parses_multi_file_descriptor() -> anyhow::Result<()> {
        let fixture = TorrentFixture::multi_file("album", &[("cd1/01.flac", 10), ("02.flac", 20)])
            .private();
        let descriptor = MetainfoLoader::parse(Path::new("album.torrent"), &fixture.encode())?;

        assert!(!descriptor.single_file);
        assert!(descriptor.private);
        let paths: Vec<_> = descriptor.files.iter().map(|file| file.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("album/cd1/01.flac"),
                PathBuf::from("album/02.flac")
            ]
        );
        assert_eq!(descriptor.total_size(), 30);
        Ok(())
    }

    #[test]
    fn distinct_payloads_have_distinct_identities() -> anyhow::Result<()> {
        let first = MetainfoLoader::parse(
            Path::new("a.torrent"),
            &TorrentFixture::single_file("a.bin", 1).encode(),
        )?;
        let second = MetainfoLoader::parse(
            Path::new("b.torrent"),
            &TorrentFixture::single_file("b.bin", 1).encode(),
        )?;
        assert_ne!(first.info_hash, second.info_hash);
        Ok(())
    }

    #[test]
    fn rejects_malformed_payloads() {
        let cases: [&[u8]; 5] = [
            b"not bencode at all",
            b"le",
            b"d8:announce3:urle",
            b"d4:infod4:name3:../12:piece lengthi1e6:pieces20:aaaaaaaaaaaaaaaaaaaa6:lengthi1eee",
            b"d4:infod4:name1:x12:piece lengthi1e6:pieces3:abc6:lengthi1eee",
        ];
        for data in cases {
            let err = MetainfoLoader::parse(Path::new("bad.torrent"), data)
                .expect_err("payload should be rejected");
            assert!(matches!(err, DescriptorError::Malformed { .. }), "{err:?}");
        }
    }

    #[test]
    fn rejects_traversal_in_file_paths() {
        let fixture = TorrentFixture::multi_file("safe", &[("../escape.bin", 4)]);
        let err = MetainfoLoader::parse(Path::new("evil.torrent"), &fixture.encode())
            .expect_err("traversal rejected");
        match err {
            DescriptorError::Malformed { reason, .. } => {
                assert!(reason.contains("unsafe component"), "{reason}");
            }
            DescriptorError::Io { .. } => panic!("expected malformed error"),
        }
    }

    #[test]
    fn loader_reports_io_failures() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("missing.torrent");
        let err = MetainfoLoader.load(&missing).expect_err("missing file");
        assert!(matches!(err, DescriptorError::Io { .. }));
        assert_eq!(err.path(), &missing);
    }

    #[test]
    fn loader_reads_descriptor_from_disk() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = TorrentFixture::single_file("disk.iso", 512).write_to(dir.path(), "disk.torrent")?;
        let descriptor = MetainfoLoader.load(&path)?;
        assert_eq!(descriptor.source, path);
        assert_eq!(descriptor.name, "disk.iso");
        Ok(())
    }
}
