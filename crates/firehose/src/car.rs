//! Content-addressed archive (CAR) reader.
//!
//! The commit `blocks` bytes are a varint-length-prefixed CBOR header
//! (`{version, roots}`) followed by varint-length-prefixed sections, each a
//! binary cid immediately followed by the DAG-CBOR record bytes. Every
//! sha2-256 cid is recomputed from the block bytes and checked; a mismatch
//! drops that block but not the archive.

use std::collections::HashMap;
use std::io::Cursor;

use ipld_core::cid::Cid;
use ipld_core::ipld::Ipld;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error};

use crate::error::FrameError;

const MULTIHASH_SHA2_256: u64 = 0x12;

#[derive(Debug, Deserialize)]
struct ArchiveHeader {
    version: u64,
    roots: Vec<Cid>,
}

/// A decoded archive: the header fields plus a flat map of cid -> record.
#[derive(Debug, Default)]
pub struct Archive {
    pub version: u64,
    pub roots: Vec<Cid>,
    pub blocks: HashMap<Cid, Ipld>,
    /// Blocks dropped for digest mismatch or undecodable bytes.
    pub rejected: usize,
}

impl Archive {
    /// Decode an archive. Empty input yields an empty archive; commits
    /// without new records legitimately carry no blocks.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }

        let mut cursor = Cursor::new(bytes);
        let header_len = read_varint(&mut cursor)?
            .ok_or_else(|| FrameError::ArchiveDecode("missing header".into()))?;
        let header_bytes = take(&mut cursor, header_len as usize)?;
        let header: ArchiveHeader = serde_ipld_dagcbor::from_slice(header_bytes)
            .map_err(|err| FrameError::ArchiveDecode(format!("unreadable header: {err}")))?;

        let mut blocks = HashMap::new();
        let mut rejected = 0usize;
        while let Some(section_len) = read_varint(&mut cursor)? {
            let section = take(&mut cursor, section_len as usize)?;
            let mut section_cursor = Cursor::new(section);
            let cid = Cid::read_bytes(&mut section_cursor)
                .map_err(|err| FrameError::ArchiveDecode(format!("unreadable cid: {err}")))?;
            let data = &section[section_cursor.position() as usize..];

            if let Err(err) = verify_digest(&cid, data) {
                error!(cid = %cid, error = %err, "dropping block with bad digest");
                rejected += 1;
                continue;
            }
            match serde_ipld_dagcbor::from_slice::<Ipld>(data) {
                Ok(record) => {
                    blocks.insert(cid, record);
                }
                Err(err) => {
                    debug!(cid = %cid, error = %err, "skipping undecodable block");
                    rejected += 1;
                }
            }
        }

        Ok(Self {
            version: header.version,
            roots: header.roots,
            blocks,
            rejected,
        })
    }
}

fn verify_digest(cid: &Cid, data: &[u8]) -> Result<(), FrameError> {
    let hash = cid.hash();
    if hash.code() != MULTIHASH_SHA2_256 {
        debug!(cid = %cid, code = hash.code(), "skipping digest check for non-sha2-256 multihash");
        return Ok(());
    }
    let digest = Sha256::digest(data);
    if hash.digest() != digest.as_slice() {
        return Err(FrameError::CidMismatch {
            cid: cid.to_string(),
        });
    }
    Ok(())
}

/// Read an unsigned LEB128 varint. `None` signals clean end-of-input at a
/// section boundary.
fn read_varint(cursor: &mut Cursor<&[u8]>) -> Result<Option<u64>, FrameError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let pos = cursor.position() as usize;
        let buf = *cursor.get_ref();
        if pos >= buf.len() {
            if shift == 0 {
                return Ok(None);
            }
            return Err(FrameError::ArchiveDecode("truncated varint".into()));
        }
        let byte = buf[pos];
        cursor.set_position(pos as u64 + 1);
        if shift >= 63 && byte > 1 {
            return Err(FrameError::ArchiveDecode("varint overflow".into()));
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
    }
}

fn take<'a>(cursor: &mut Cursor<&'a [u8]>, len: usize) -> Result<&'a [u8], FrameError> {
    let pos = cursor.position() as usize;
    let buf = *cursor.get_ref();
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| FrameError::ArchiveDecode("truncated section".into()))?;
    cursor.set_position(end as u64);
    Ok(&buf[pos..end])
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use ipld_core::cid::multihash::Multihash;
    use serde::Serialize;

    pub const DAG_CBOR_CODEC: u64 = 0x71;

    pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    pub fn cid_for(data: &[u8]) -> Cid {
        let digest = Sha256::digest(data);
        let hash = Multihash::wrap(MULTIHASH_SHA2_256, digest.as_slice()).unwrap();
        Cid::new_v1(DAG_CBOR_CODEC, hash)
    }

    #[derive(Serialize)]
    struct HeaderSer {
        version: u64,
        roots: Vec<Cid>,
    }

    /// Assemble archive bytes from (cid, record-bytes) sections.
    pub fn archive_bytes(sections: &[(Cid, Vec<u8>)]) -> Vec<u8> {
        let header = HeaderSer {
            version: 1,
            roots: sections.iter().map(|(cid, _)| *cid).collect(),
        };
        let header_bytes = serde_ipld_dagcbor::to_vec(&header).unwrap();

        let mut out = Vec::new();
        encode_varint(header_bytes.len() as u64, &mut out);
        out.extend_from_slice(&header_bytes);
        for (cid, data) in sections {
            let mut section = cid.to_bytes();
            section.extend_from_slice(data);
            encode_varint(section.len() as u64, &mut out);
            out.extend_from_slice(&section);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::testutil::{archive_bytes, cid_for, encode_varint};
    use super::*;

    fn post_record_bytes(text: &str) -> Vec<u8> {
        let mut map = BTreeMap::new();
        map.insert(
            "$type".to_string(),
            Ipld::String("app.bsky.feed.post".into()),
        );
        map.insert("text".to_string(), Ipld::String(text.into()));
        serde_ipld_dagcbor::to_vec(&Ipld::Map(map)).unwrap()
    }

    #[test]
    fn decodes_blocks_by_cid() {
        let data = post_record_bytes("hello world");
        let cid = cid_for(&data);
        let archive = Archive::decode(&archive_bytes(&[(cid, data)])).unwrap();

        assert_eq!(archive.version, 1);
        assert_eq!(archive.blocks.len(), 1);
        assert_eq!(archive.rejected, 0);
        let record = &archive.blocks[&cid];
        assert!(matches!(record, Ipld::Map(_)));
    }

    #[test]
    fn empty_input_is_an_empty_archive() {
        let archive = Archive::decode(&[]).unwrap();
        assert!(archive.blocks.is_empty());
    }

    #[test]
    fn digest_mismatch_drops_only_that_block() {
        let good = post_record_bytes("good");
        let bad = post_record_bytes("bad");
        let good_cid = cid_for(&good);
        // Claim the wrong cid for the second block.
        let wrong_cid = cid_for(b"something else entirely");
        let archive = Archive::decode(&archive_bytes(&[(good_cid, good), (wrong_cid, bad)]))
            .unwrap();

        assert_eq!(archive.blocks.len(), 1);
        assert!(archive.blocks.contains_key(&good_cid));
        assert_eq!(archive.rejected, 1);
    }

    #[test]
    fn truncated_varint_is_an_error() {
        let data = post_record_bytes("x");
        let cid = cid_for(&data);
        let mut bytes = archive_bytes(&[(cid, data)]);
        bytes.push(0x80); // continuation byte with no terminator
        assert!(matches!(
            Archive::decode(&bytes),
            Err(FrameError::ArchiveDecode(_))
        ));
    }

    #[test]
    fn truncated_section_is_an_error() {
        let data = post_record_bytes("x");
        let cid = cid_for(&data);
        let mut bytes = Vec::new();
        let header = serde_ipld_dagcbor::to_vec(&Ipld::Map(BTreeMap::from([
            ("version".to_string(), Ipld::Integer(1)),
            ("roots".to_string(), Ipld::List(vec![Ipld::Link(cid)])),
        ])))
        .unwrap();
        encode_varint(header.len() as u64, &mut bytes);
        bytes.extend_from_slice(&header);
        encode_varint(1000, &mut bytes); // longer than what follows
        bytes.extend_from_slice(&cid.to_bytes());
        assert!(matches!(
            Archive::decode(&bytes),
            Err(FrameError::ArchiveDecode(_))
        ));
    }
}
