//! Descriptor and payload fixtures.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_PIECE_LENGTH: u64 = 16_384;

/// Encodable bencode value used to assemble fixture descriptors.
#[derive(Debug, Clone)]
enum Bencode {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<Bencode>),
    Dict(BTreeMap<Vec<u8>, Bencode>),
}

impl Bencode {
    fn string(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }

    fn int(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Int(value) => buf.extend_from_slice(format!("i{value}e").as_bytes()),
            Self::Bytes(bytes) => {
                buf.extend_from_slice(format!("{}:", bytes.len()).as_bytes());
                buf.extend_from_slice(bytes);
            }
            Self::List(items) => {
                buf.push(b'l');
                for item in items {
                    item.encode_into(buf);
                }
                buf.push(b'e');
            }
            Self::Dict(entries) => {
                buf.push(b'd');
                for (key, value) in entries {
                    Self::Bytes(key.clone()).encode_into(buf);
                    value.encode_into(buf);
                }
                buf.push(b'e');
            }
        }
    }
}

fn dict<const N: usize>(entries: [(&str, Bencode); N]) -> BTreeMap<Vec<u8>, Bencode> {
    entries
        .into_iter()
        .map(|(key, value)| (key.as_bytes().to_vec(), value))
        .collect()
}

/// Builder for syntactically valid `.torrent` files.
#[derive(Debug, Clone)]
pub struct TorrentFixture {
    name: String,
    files: Vec<(String, u64)>,
    single_file: bool,
    announce: Option<String>,
    private: bool,
}

impl TorrentFixture {
    /// Descriptor for a single file called `name`.
    #[must_use]
    pub fn single_file(name: &str, length: u64) -> Self {
        Self {
            name: name.to_string(),
            files: vec![(name.to_string(), length)],
            single_file: true,
            announce: None,
            private: false,
        }
    }

    /// Descriptor for a directory called `name` holding `files` (`/`-separated paths).
    #[must_use]
    pub fn multi_file(name: &str, files: &[(&str, u64)]) -> Self {
        Self {
            name: name.to_string(),
            files: files
                .iter()
                .map(|(path, length)| ((*path).to_string(), *length))
                .collect(),
            single_file: false,
            announce: None,
            private: false,
        }
    }

    /// Add a primary announce URL.
    #[must_use]
    pub fn with_announce(mut self, url: &str) -> Self {
        self.announce = Some(url.to_string());
        self
    }

    /// Mark the descriptor private.
    #[must_use]
    pub const fn private(mut self) -> Self {
        self.private = true;
        self
    }

    fn total_size(&self) -> u64 {
        self.files.iter().map(|(_, length)| length).sum()
    }

    fn info(&self) -> Bencode {
        let piece_count = self.total_size().div_ceil(DEFAULT_PIECE_LENGTH).max(1);
        let pieces = vec![0_u8; usize::try_from(piece_count * 20).unwrap_or(20)];
        let mut info = dict([
            ("name", Bencode::string(&self.name)),
            ("piece length", Bencode::int(DEFAULT_PIECE_LENGTH)),
            ("pieces", Bencode::Bytes(pieces)),
        ]);
        if self.single_file {
            info.insert(b"length".to_vec(), Bencode::int(self.total_size()));
        } else {
            let files = self
                .files
                .iter()
                .map(|(path, length)| {
                    let components = path.split('/').map(Bencode::string).collect();
                    Bencode::Dict(dict([
                        ("length", Bencode::int(*length)),
                        ("path", Bencode::List(components)),
                    ]))
                })
                .collect();
            info.insert(b"files".to_vec(), Bencode::List(files));
        }
        if self.private {
            info.insert(b"private".to_vec(), Bencode::Int(1));
        }
        Bencode::Dict(info)
    }

    /// Bencoded `info` dictionary exactly as embedded in [`Self::encode`].
    #[must_use]
    pub fn encode_info(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.info().encode_into(&mut buf);
        buf
    }

    /// Full bencoded descriptor.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut root = dict([("info", self.info())]);
        if let Some(announce) = &self.announce {
            root.insert(b"announce".to_vec(), Bencode::string(announce));
        }
        let mut buf = Vec::new();
        Bencode::Dict(root).encode_into(&mut buf);
        buf
    }

    /// Write the descriptor into `dir/file_name`.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while writing the file.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> io::Result<PathBuf> {
        let path = dir.join(file_name);
        fs::write(&path, self.encode())?;
        Ok(path)
    }

    /// Materialise the complete payload beneath `destination` (zero-filled).
    ///
    /// # Errors
    ///
    /// Returns the IO error raised while creating directories or files.
    pub fn write_payload(&self, destination: &Path) -> io::Result<()> {
        for (path, length) in &self.files {
            let target = if self.single_file {
                destination.join(&self.name)
            } else {
                destination.join(&self.name).join(path)
            };
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = fs::File::create(&target)?;
            file.set_len(*length)?;
        }
        Ok(())
    }
}

/// Write a file with the descriptor suffix that is not valid bencode.
///
/// # Errors
///
/// Returns the IO error raised while writing the file.
pub fn write_malformed_descriptor(dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    let path = dir.join(file_name);
    fs::write(&path, b"this is not a torrent")?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn encodes_single_file_descriptor() {
        let encoded = TorrentFixture::single_file("a", 3).encode();
        let expected = b"d4:infod6:lengthi3e4:name1:a12:piece lengthi16384e6:pieces20:";
        assert!(encoded.starts_with(expected));
        assert!(encoded.ends_with(b"ee"));
    }

    #[test]
    fn payload_matches_declared_lengths() -> io::Result<()> {
        let dir = TempDir::new()?;
        let fixture = TorrentFixture::multi_file("pack", &[("nested/one.bin", 5), ("two.bin", 0)]);
        fixture.write_payload(dir.path())?;
        assert_eq!(
            fs::metadata(dir.path().join("pack/nested/one.bin"))?.len(),
            5
        );
        assert_eq!(fs::metadata(dir.path().join("pack/two.bin"))?.len(), 0);
        Ok(())
    }
}
