//! ZIP entry lookup by exact name.
//!
//! The zip reader keeps one slot per distinct name and fills it from the
//! last central record carrying that name. The first record is what a
//! lookup must return, so whenever a slot matches, the central records in
//! front of it are walked for an earlier record with the same name; if one
//! exists it is read through its local header instead.

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use ::zip::ZipArchive;
use ::zip::read::read_zipfile_from_stream;
use ::zip::result::ZipError;
use tracing::trace;

use crate::LoadError;
use crate::LoaderConfig;
use crate::Result;
use crate::copy::CopyBuffer;
use crate::copy::CopyError;
use crate::copy::copy_with_buffer;

use super::traits::EntryExtractor;
use super::traits::Extraction;

const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const CENTRAL_HEADER_LEN: usize = 46;
const ZIP64_EXTRA_ID: u16 = 0x0001;
const DATA_DESCRIPTOR_FLAG: u16 = 1 << 3;

/// Finds an entry by scanning the archive in stored order.
///
/// Names are compared case-sensitively against the full stored name, with
/// `/` separators as written by the archiver. The first match wins, also
/// when the archive holds several records with that name; no index is built
/// and nothing is cached between calls.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use zipload_core::LoaderConfig;
/// use zipload_core::formats::{EntryExtractor, ZipEntryExtractor};
/// use zipload_core::test_utils::create_test_zip;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let data = create_test_zip(vec![("bin/Foo.dll", b"payload")]);
/// let mut reader = Cursor::new(data);
///
/// let extractor = ZipEntryExtractor::new();
/// let found = extractor.extract(&mut reader, "bin/Foo.dll", &LoaderConfig::default())?;
/// assert_eq!(found.bytes(), Some(&b"payload"[..]));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipEntryExtractor;

impl ZipEntryExtractor {
    /// Creates a new ZIP entry extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EntryExtractor for ZipEntryExtractor {
    fn extract<R: Read + Seek>(
        &self,
        reader: &mut R,
        entry_name: &str,
        config: &LoaderConfig,
    ) -> Result<Extraction> {
        let mut archive = ZipArchive::new(&mut *reader).map_err(invalid_archive)?;

        let Some(index) = find_entry(&archive, entry_name) else {
            trace!(entry = entry_name, scanned = archive.len(), "entry not found");
            return Ok(Extraction::NotFound);
        };

        let (kept_start, kept_name) = {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| read_error(entry_name, e))?;
            (entry.central_header_start(), entry.name_raw().to_vec())
        };
        let directory = Directory {
            start: archive.central_directory_start(),
            archive_offset: archive.offset(),
        };
        drop(archive);

        let earlier = directory
            .first_record_named(reader, &kept_name, kept_start)
            .map_err(|e| LoadError::InvalidArchive {
                reason: format!("central directory: {e}"),
            })?;

        let bytes = match earlier {
            Some(record) => {
                trace!(
                    entry = entry_name,
                    header_start = record.header_start,
                    "entry name is duplicated, reading the first record"
                );
                read_local_entry(reader, &record, entry_name, config.max_entry_size)?
            }
            None => {
                let mut archive = ZipArchive::new(&mut *reader).map_err(invalid_archive)?;
                read_entry(&mut archive, index, entry_name, config.max_entry_size)?
            }
        };

        trace!(entry = entry_name, index, bytes = bytes.len(), "entry extracted");
        Ok(Extraction::Found(bytes))
    }
}

fn find_entry<R: Read + Seek>(archive: &ZipArchive<R>, entry_name: &str) -> Option<usize> {
    (0..archive.len()).find(|&index| archive.name_for_index(index) == Some(entry_name))
}

/// Where the central directory sits in the underlying stream.
struct Directory {
    start: u64,
    archive_offset: u64,
}

/// A central record that lost its slot to a later record with the same name.
struct LocalRecord {
    header_start: u64,
    flags: u16,
}

impl Directory {
    /// Walks the central records in stored order up to `end` and returns the
    /// first one named `name`.
    fn first_record_named<R: Read + Seek>(
        &self,
        reader: &mut R,
        name: &[u8],
        end: u64,
    ) -> io::Result<Option<LocalRecord>> {
        let mut position = reader.seek(SeekFrom::Start(self.start))?;

        while position < end {
            let mut header = [0u8; CENTRAL_HEADER_LEN];
            reader.read_exact(&mut header)?;
            if u32_at(&header, 0) != CENTRAL_HEADER_SIGNATURE {
                return Err(invalid_data(format!(
                    "no central record signature at offset {position}"
                )));
            }

            let name_len = u16_at(&header, 28);
            let extra_len = u16_at(&header, 30);
            let comment_len = u16_at(&header, 32);

            let mut variable = vec![0u8; usize::from(name_len) + usize::from(extra_len)];
            reader.read_exact(&mut variable)?;
            reader.seek(SeekFrom::Current(i64::from(comment_len)))?;

            let (record_name, extra) = variable.split_at(usize::from(name_len));
            if record_name == name {
                let offset = local_header_offset(&header, extra)?;
                let header_start = offset
                    .checked_add(self.archive_offset)
                    .ok_or_else(|| invalid_data("local header offset overflows".to_string()))?;
                return Ok(Some(LocalRecord {
                    header_start,
                    flags: u16_at(&header, 8),
                }));
            }

            position += CENTRAL_HEADER_LEN as u64
                + u64::from(name_len)
                + u64::from(extra_len)
                + u64::from(comment_len);
        }

        Ok(None)
    }
}

/// Reads the local header offset of a central record, following the zip64
/// extra field when the fixed field is saturated.
fn local_header_offset(header: &[u8; CENTRAL_HEADER_LEN], extra: &[u8]) -> io::Result<u64> {
    let offset = u32_at(header, 42);
    if offset != u32::MAX {
        return Ok(u64::from(offset));
    }

    // zip64 values appear only for saturated fields: uncompressed, compressed, offset
    let skip = [u32_at(header, 24), u32_at(header, 20)]
        .into_iter()
        .filter(|&size| size == u32::MAX)
        .count()
        * 8;

    let mut rest = extra;
    while rest.len() >= 4 {
        let id = u16::from_le_bytes([rest[0], rest[1]]);
        let len = usize::from(u16::from_le_bytes([rest[2], rest[3]]));
        let body = rest
            .get(4..4 + len)
            .ok_or_else(|| invalid_data("truncated extra field".to_string()))?;

        if id == ZIP64_EXTRA_ID {
            return body
                .get(skip..skip + 8)
                .and_then(|bytes| bytes.try_into().ok())
                .map(u64::from_le_bytes)
                .ok_or_else(|| invalid_data("zip64 field lacks the header offset".to_string()));
        }
        rest = &rest[4 + len..];
    }

    Err(invalid_data("zip64 header offset missing".to_string()))
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    entry_name: &str,
    max_size: u64,
) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_index(index)
        .map_err(|e| read_error(entry_name, e))?;

    let declared = entry.size();
    copy_entry(&mut entry, declared, entry_name, max_size)
}

fn read_local_entry<R: Read + Seek>(
    reader: &mut R,
    record: &LocalRecord,
    entry_name: &str,
    max_size: u64,
) -> Result<Vec<u8>> {
    if record.flags & DATA_DESCRIPTOR_FLAG != 0 {
        return Err(LoadError::EntryRead {
            entry: entry_name.to_string(),
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "duplicated entry keeps its sizes in a data descriptor",
            ),
        });
    }

    reader
        .seek(SeekFrom::Start(record.header_start))
        .map_err(|source| LoadError::EntryRead {
            entry: entry_name.to_string(),
            source,
        })?;

    let entry = read_zipfile_from_stream(reader).map_err(|e| read_error(entry_name, e))?;
    let Some(mut entry) = entry else {
        return Err(LoadError::EntryRead {
            entry: entry_name.to_string(),
            source: invalid_data(format!(
                "no local header at offset {}",
                record.header_start
            )),
        });
    };

    let declared = entry.size();
    copy_entry(&mut entry, declared, entry_name, max_size)
}

fn copy_entry(
    entry: &mut impl Read,
    declared: u64,
    entry_name: &str,
    max_size: u64,
) -> Result<Vec<u8>> {
    if declared > max_size {
        return Err(LoadError::EntryTooLarge {
            entry: entry_name.to_string(),
            size: declared,
            max: max_size,
        });
    }

    let mut bytes = Vec::with_capacity(usize::try_from(declared).unwrap_or_default());
    let mut buffer = CopyBuffer::new();

    match copy_with_buffer(entry, &mut bytes, &mut buffer, max_size) {
        Ok(_) => Ok(bytes),
        Err(CopyError::Io(source)) => Err(LoadError::EntryRead {
            entry: entry_name.to_string(),
            source,
        }),
        Err(CopyError::LimitExceeded { copied, limit }) => Err(LoadError::EntryTooLarge {
            entry: entry_name.to_string(),
            size: copied,
            max: limit,
        }),
    }
}

fn invalid_archive(err: ZipError) -> LoadError {
    LoadError::InvalidArchive {
        reason: err.to_string(),
    }
}

fn read_error(entry_name: &str, err: ZipError) -> LoadError {
    let source = match err {
        ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    };

    LoadError::EntryRead {
        entry: entry_name.to_string(),
        source,
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn u16_at(header: &[u8; CENTRAL_HEADER_LEN], at: usize) -> u16 {
    u16::from_le_bytes([header[at], header[at + 1]])
}

fn u32_at(header: &[u8; CENTRAL_HEADER_LEN], at: usize) -> u32 {
    u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
}
