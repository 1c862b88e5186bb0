use std::io::Write;

use camino::Utf8Path;
use fs_err as fs;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// One line of a wheel's `RECORD` file: `path,hash_algorithm=hash_value,size`. The hash/size are
/// absent for the `RECORD` file's own entry (it can't record its own hash).
///
/// <https://packaging.python.org/en/latest/specifications/recording-installed-packages/>
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RecordEntry {
    pub path: String,
    pub hash: Option<String>,
    pub size: Option<u64>,
}

impl RecordEntry {
    pub fn for_file(relative_path: &str, absolute_path: &Utf8Path) -> Result<Self, Error> {
        let bytes = fs::read(absolute_path)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        let hash = format!("sha256={}", base64_urlsafe_nopad(&digest));
        Ok(Self {
            path: relative_path.to_string(),
            hash: Some(hash),
            size: Some(bytes.len() as u64),
        })
    }

    /// Whether the file currently on disk at `root.join(&self.path)` still matches this entry's
    /// recorded hash.
    pub fn verify(&self, root: &Utf8Path) -> Result<bool, Error> {
        let Some(expected) = &self.hash else { return Ok(true) };
        let absolute = root.join(&self.path);
        let actual = Self::for_file(&self.path, &absolute)?;
        Ok(actual.hash.as_deref() == Some(expected.as_str()))
    }
}

/// RFC 4648 base64url, no padding — the encoding PEP 376 `RECORD` hashes use.
fn base64_urlsafe_nopad(bytes: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut out = String::with_capacity((bytes.len() * 4).div_ceil(3));
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = *chunk.get(1).unwrap_or(&0) as u32;
        let b2 = *chunk.get(2).unwrap_or(&0) as u32;
        let n = (b0 << 16) | (b1 << 8) | b2;
        out.push(ALPHABET[((n >> 18) & 0x3f) as usize] as char);
        out.push(ALPHABET[((n >> 12) & 0x3f) as usize] as char);
        if chunk.len() > 1 {
            out.push(ALPHABET[((n >> 6) & 0x3f) as usize] as char);
        }
        if chunk.len() > 2 {
            out.push(ALPHABET[(n & 0x3f) as usize] as char);
        }
    }
    out
}

pub fn write_record(path: &Utf8Path, entries: &[RecordEntry]) -> Result<(), Error> {
    let mut sorted = entries.to_vec();
    sorted.sort();
    let mut out = fs::File::create(path)?;
    for entry in &sorted {
        writeln!(
            out,
            "{},{},{}",
            entry.path,
            entry.hash.as_deref().unwrap_or(""),
            entry.size.map(|s| s.to_string()).unwrap_or_default(),
        )?;
    }
    Ok(())
}

pub fn read_record(path: &Utf8Path) -> Result<Vec<RecordEntry>, Error> {
    let raw = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in raw.lines() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(3, ',');
        let path = fields.next().unwrap_or_default().to_string();
        let hash = fields.next().filter(|s| !s.is_empty()).map(str::to_string);
        let size = fields.next().filter(|s| !s.is_empty()).and_then(|s| s.parse().ok());
        entries.push(RecordEntry { path, hash, size });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_after_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("a.py"), b"print(1)\n").unwrap();

        let entry = RecordEntry::for_file("a.py", &root.join("a.py")).unwrap();
        assert!(entry.verify(root).unwrap());
    }

    #[test]
    fn verify_fails_after_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("a.py"), b"print(1)\n").unwrap();
        let entry = RecordEntry::for_file("a.py", &root.join("a.py")).unwrap();

        fs::write(root.join("a.py"), b"print(2)\n").unwrap();
        assert!(!entry.verify(root).unwrap());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("a.py"), b"x = 1\n").unwrap();
        let entries = vec![RecordEntry::for_file("a.py", &root.join("a.py")).unwrap()];

        let record_path = root.join("RECORD");
        write_record(&record_path, &entries).unwrap();
        let read_back = read_record(&record_path).unwrap();
        assert_eq!(entries, read_back);
    }
}
