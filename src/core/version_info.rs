//! Best-effort product version lookup for Windows executables.
//!
//! Locates the `VS_VERSION_INFO` resource by its UTF-16 key and reads the
//! `ProductVersion` string from its `StringFileInfo` table, falling back to the
//! numeric product version in `VS_FIXEDFILEINFO`. Any file that is not a PE
//! image, or has no version resource, reports `None`.

use std::path::Path;
use tracing::debug;

const VERSION_INFO_KEY: &str = "VS_VERSION_INFO";
const FIXED_FILE_INFO_SIGNATURE: u32 = 0xFEEF_04BD;
const FIXED_FILE_INFO_LEN: usize = 52;
// wLength, wValueLength, wType
const BLOCK_HEADER_LEN: usize = 6;

pub fn product_version(path: &Path) -> Option<String> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unable to read version metadata");
            return None;
        }
    };
    product_version_from_bytes(&data)
}

pub fn product_version_from_bytes(data: &[u8]) -> Option<String> {
    if !data.starts_with(b"MZ") {
        return None;
    }

    let key = utf16_key(VERSION_INFO_KEY);
    let mut from = 0;
    while let Some(found) = find(&data[from..], &key) {
        let key_at = from + found;
        from = key_at + 2;

        // Resource blocks are DWORD-aligned.
        let Some(start) = key_at.checked_sub(BLOCK_HEADER_LEN) else {
            continue;
        };
        if start % 4 != 0 {
            continue;
        }
        let Some(block) = Block::read(data, start) else {
            continue;
        };
        if block.key != VERSION_INFO_KEY {
            continue;
        }

        let fixed = fixed_product_version(data, &block);
        if let Some(version) = string_product_version(data, &block) {
            return Some(version);
        }
        if fixed.is_some() {
            return fixed;
        }
    }
    None
}

/// One node of the version resource tree.
struct Block {
    end: usize,
    key: String,
    value_start: usize,
    value_len: usize,
    is_text: bool,
    children_start: usize,
}

impl Block {
    fn read(data: &[u8], start: usize) -> Option<Block> {
        let length = usize::from(read_u16(data, start)?);
        let value_length = usize::from(read_u16(data, start + 2)?);
        let is_text = read_u16(data, start + 4)? == 1;
        if length < BLOCK_HEADER_LEN {
            return None;
        }
        let end = start.checked_add(length)?.min(data.len());

        let (key, key_end) = read_utf16z(data, start + BLOCK_HEADER_LEN, end)?;
        let value_start = align4(key_end);
        // Text values are measured in UTF-16 code units.
        let value_len = if is_text { value_length * 2 } else { value_length };
        let children_start = align4(value_start + value_len).min(end);

        Some(Block {
            end,
            key,
            value_start,
            value_len,
            is_text,
            children_start,
        })
    }

    fn children<'a>(&self, data: &'a [u8]) -> impl Iterator<Item = Block> + 'a {
        let end = self.end;
        let mut at = self.children_start;
        std::iter::from_fn(move || {
            if at + BLOCK_HEADER_LEN > end {
                return None;
            }
            let child = Block::read(data, at)?;
            at = align4(child.end).max(at + 4);
            Some(child)
        })
    }

    fn text(&self, data: &[u8]) -> Option<String> {
        if !self.is_text {
            return None;
        }
        let end = (self.value_start + self.value_len).min(self.end);
        let (text, _) = read_utf16z(data, self.value_start, end.max(self.value_start))?;
        Some(text)
    }
}

fn fixed_product_version(data: &[u8], block: &Block) -> Option<String> {
    if block.value_len < FIXED_FILE_INFO_LEN {
        return None;
    }
    let at = block.value_start;
    if read_u32(data, at)? != FIXED_FILE_INFO_SIGNATURE {
        return None;
    }
    // dwSignature, dwStrucVersion, dwFileVersionMS/LS, dwProductVersionMS/LS
    let product_ms = read_u32(data, at + 16)?;
    let product_ls = read_u32(data, at + 20)?;

    Some(format!(
        "{}.{}.{}.{}",
        product_ms >> 16,
        product_ms & 0xFFFF,
        product_ls >> 16,
        product_ls & 0xFFFF
    ))
}

fn string_product_version(data: &[u8], root: &Block) -> Option<String> {
    root.children(data)
        .filter(|child| child.key == "StringFileInfo")
        .flat_map(|info| info.children(data).collect::<Vec<_>>())
        .flat_map(|table| table.children(data).collect::<Vec<_>>())
        .filter(|entry| entry.key == "ProductVersion")
        .find_map(|entry| {
            let text = entry.text(data)?;
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
}

fn utf16_key(key: &str) -> Vec<u8> {
    key.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn align4(at: usize) -> usize {
    (at + 3) & !3
}

/// Reads a NUL-terminated UTF-16LE string starting at `at` and bounded by
/// `end`. Returns the string and the offset just past its terminator.
fn read_utf16z(data: &[u8], at: usize, end: usize) -> Option<(String, usize)> {
    let mut units = Vec::new();
    let mut pos = at;
    while pos + 2 <= end {
        let unit = read_u16(data, pos)?;
        pos += 2;
        if unit == 0 {
            return Some((String::from_utf16_lossy(&units), pos));
        }
        units.push(unit);
    }
    // Unterminated strings run to the end of the block.
    (!units.is_empty()).then(|| (String::from_utf16_lossy(&units), pos))
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes: [u8; 2] = data.get(at..at.checked_add(2)?)?.try_into().ok()?;
    Some(u16::from_le_bytes(bytes))
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(at..at.checked_add(4)?)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

#[cfg(test)]
fn encode_block(key: &str, is_text: bool, value: &[u8], children: &[Vec<u8>]) -> Vec<u8> {
    let mut block = vec![0u8; BLOCK_HEADER_LEN];
    block.extend_from_slice(&utf16_key(key));
    block.resize(align4(block.len()), 0);
    block.extend_from_slice(value);
    for child in children {
        block.resize(align4(block.len()), 0);
        block.extend_from_slice(child);
    }

    let value_length = if is_text { value.len() / 2 } else { value.len() };
    let length = block.len() as u16;
    block[0..2].copy_from_slice(&length.to_le_bytes());
    block[2..4].copy_from_slice(&(value_length as u16).to_le_bytes());
    block[4..6].copy_from_slice(&u16::from(is_text).to_le_bytes());
    block
}

#[cfg(test)]
fn encode_version_resource(product: (u16, u16, u16, u16), product_string: Option<&str>) -> Vec<u8> {
    let ms = (u32::from(product.0) << 16) | u32::from(product.1);
    let ls = (u32::from(product.2) << 16) | u32::from(product.3);
    let mut fixed = Vec::new();
    for field in [FIXED_FILE_INFO_SIGNATURE, 0x0001_0000, ms, ls, ms, ls] {
        fixed.extend_from_slice(&field.to_le_bytes());
    }
    fixed.resize(FIXED_FILE_INFO_LEN, 0);

    let mut children = Vec::new();
    if let Some(text) = product_string {
        let entry = encode_block("ProductVersion", true, &utf16_key(text), &[]);
        let company = encode_block("CompanyName", true, &utf16_key("Sysinternals"), &[]);
        let table = encode_block("040904b0", true, &[], &[company, entry]);
        children.push(encode_block("StringFileInfo", true, &[], &[table]));
    }
    encode_block(VERSION_INFO_KEY, false, &fixed, &children)
}

/// A minimal PE-looking file carrying a version resource.
#[cfg(test)]
pub(crate) fn fake_executable(product: (u16, u16, u16, u16)) -> Vec<u8> {
    fake_executable_with(product, None, &[])
}

#[cfg(test)]
pub(crate) fn fake_executable_with(
    product: (u16, u16, u16, u16),
    product_string: Option<&str>,
    preamble: &[u8],
) -> Vec<u8> {
    let mut data = b"MZ".to_vec();
    data.resize(64, 0);
    data.extend_from_slice(preamble);
    data.resize(align4(data.len()), 0);
    data.extend_from_slice(&encode_version_resource(product, product_string));
    data.resize(data.len() + 32, 0);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_fixed_product_version() {
        let data = fake_executable((2, 11, 0, 7));
        assert_eq!(product_version_from_bytes(&data), Some("2.11.0.7".to_string()));
    }

    #[test]
    fn test_prefers_product_version_string() {
        let data = fake_executable_with((3, 96, 0, 0), Some("3.96"), &[]);
        assert_eq!(product_version_from_bytes(&data), Some("3.96".to_string()));
    }

    #[test]
    fn test_ignores_signature_outside_version_resource() {
        let mut decoy = Vec::new();
        decoy.extend_from_slice(&FIXED_FILE_INFO_SIGNATURE.to_le_bytes());
        decoy.extend_from_slice(&[0x90; 28]);

        let data = fake_executable_with((3, 96, 0, 0), None, &decoy);
        assert_eq!(product_version_from_bytes(&data), Some("3.96.0.0".to_string()));

        let data = fake_executable_with((3, 96, 0, 0), Some("3.96"), &decoy);
        assert_eq!(product_version_from_bytes(&data), Some("3.96".to_string()));
    }

    #[test]
    fn test_ignores_misaligned_key() {
        let mut data = b"MZ".to_vec();
        data.resize(65, 0);
        data.extend_from_slice(&encode_version_resource((1, 0, 0, 0), None));
        assert_eq!(product_version_from_bytes(&data), None);
    }

    #[test]
    fn test_non_executable_has_no_version() {
        assert_eq!(product_version_from_bytes(b"Sysinternals EULA text"), None);
        assert_eq!(product_version_from_bytes(b""), None);
    }

    #[test]
    fn test_executable_without_resource() {
        let mut data = b"MZ".to_vec();
        data.resize(256, 0);
        data[128..132].copy_from_slice(&FIXED_FILE_INFO_SIGNATURE.to_le_bytes());
        assert_eq!(product_version_from_bytes(&data), None);
    }

    #[test]
    fn test_truncated_resource() {
        let mut data = fake_executable((1, 2, 3, 4));
        data.truncate(64 + BLOCK_HEADER_LEN + 40);
        assert_eq!(product_version_from_bytes(&data), None);
    }

    #[test]
    fn test_missing_file() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(product_version(&temp.path().join("absent.exe")), None);
    }
}
