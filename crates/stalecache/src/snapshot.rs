//! Snapshot file codec
//!
//! File format:
//! ```text
//! STALSNP\n
//! [version: u32 LE]
//! [groups: u32 LE]
//! group*:   uri:str variants:u32 variant*
//! variant:  selectors:u32 (name:str present:u8 [value:str])*
//!           wildcard:u8 storage_time_ms:i64 status:u16
//!           headers:u32 (name:str value:str)*
//!           payload:u8 (0 none | 1 mime:str data:bytes | 2 mime:str path:str)
//! STALEND\n
//! ```
//! `str` and `bytes` are a u32 LE length followed by raw bytes. Groups are
//! stored least recently used first.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use memmap2::Mmap;
use nom::{
    bytes::complete::tag,
    combinator::{map, map_opt, map_res},
    error::ErrorKind,
    multi::{length_count, length_data},
    number::complete::{le_i64, le_u16, le_u32, u8 as byte},
    sequence::{pair, preceded, terminated},
    IResult,
};
use stalewise::{CacheItem, Error, Header, HttpResponse, Payload, Result, Status, Vary};

use crate::storage::EntryGroup;

/// Magic header for snapshot files
pub const SNAPSHOT_MAGIC: &[u8] = b"STALSNP\n";

/// Trailer closing a complete snapshot
pub const SNAPSHOT_END: &[u8] = b"STALEND\n";

/// Current format version
pub const SNAPSHOT_VERSION: u32 = 1;

const PAYLOAD_NONE: u8 = 0;
const PAYLOAD_INLINE: u8 = 1;
const PAYLOAD_FILE: u8 = 2;

/// Serialize groups, least recently used first
pub fn encode(groups: &[EntryGroup]) -> Result<Vec<u8>> {
    let mut out = Encoder::default();
    out.raw(SNAPSHOT_MAGIC);
    out.u32(SNAPSHOT_VERSION);
    out.len(groups.len())?;

    for group in groups {
        out.str(&group.uri)?;
        out.len(group.variants.len())?;
        for (vary, item) in &group.variants {
            encode_variant(&mut out, vary, item)?;
        }
    }

    out.raw(SNAPSHOT_END);
    Ok(out.buf)
}

fn encode_variant(out: &mut Encoder, vary: &Vary, item: &CacheItem) -> Result<()> {
    let selectors: Vec<_> = vary.iter().collect();
    out.len(selectors.len())?;
    for (name, value) in selectors {
        out.str(name)?;
        match value {
            Some(value) => {
                out.u8(1);
                out.str(value)?;
            }
            None => out.u8(0),
        }
    }
    out.u8(u8::from(vary.is_wildcard()));

    let response = item.response();
    out.i64(item.storage_time().timestamp_millis());
    out.u16(response.status().code());

    out.len(response.headers().len())?;
    for header in response.headers() {
        out.str(header.name())?;
        out.str(header.value())?;
    }

    match response.payload() {
        None => out.u8(PAYLOAD_NONE),
        Some(Payload::Inline { mime, data }) => {
            out.u8(PAYLOAD_INLINE);
            out.str(mime)?;
            out.bytes(data)?;
        }
        Some(Payload::File { mime, path }) => {
            let path = path.to_str().ok_or_else(|| {
                Error::Parse(format!("payload path {} is not UTF-8", path.display()))
            })?;
            out.u8(PAYLOAD_FILE);
            out.str(mime)?;
            out.str(path)?;
        }
    }
    Ok(())
}

#[derive(Default)]
struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    fn raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.raw(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.raw(&value.to_le_bytes());
    }

    fn i64(&mut self, value: i64) {
        self.raw(&value.to_le_bytes());
    }

    fn len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| Error::Parse(format!("length {} does not fit in a snapshot", len)))?;
        self.u32(len);
        Ok(())
    }

    fn bytes(&mut self, data: &[u8]) -> Result<()> {
        self.len(data.len())?;
        self.raw(data);
        Ok(())
    }

    fn str(&mut self, value: &str) -> Result<()> {
        self.bytes(value.as_bytes())
    }
}

/// Deserialize a complete snapshot
///
/// The whole buffer must be consumed.
pub fn decode(input: &[u8]) -> Result<Vec<EntryGroup>> {
    let fail = |err| corrupt(input.len(), err);

    let (rest, version) = preceded(tag(SNAPSHOT_MAGIC), le_u32)(input).map_err(fail)?;
    if version != SNAPSHOT_VERSION {
        return Err(Error::Parse(format!(
            "unsupported snapshot version {} (expected {})",
            version, SNAPSHOT_VERSION
        )));
    }

    let (rest, groups) =
        terminated(length_count(le_u32, group), tag(SNAPSHOT_END))(rest).map_err(fail)?;
    if !rest.is_empty() {
        return Err(Error::Parse(format!(
            "{} trailing bytes after snapshot end",
            rest.len()
        )));
    }

    Ok(groups)
}

fn corrupt(total: usize, err: nom::Err<nom::error::Error<&[u8]>>) -> Error {
    match err {
        nom::Err::Incomplete(_) => Error::Parse("snapshot is truncated".to_string()),
        nom::Err::Error(e) | nom::Err::Failure(e) => Error::Parse(format!(
            "snapshot is corrupt at byte {}: {:?}",
            total - e.input.len(),
            e.code
        )),
    }
}

fn string(input: &[u8]) -> IResult<&[u8], String> {
    map_res(length_data(le_u32), |raw: &[u8]| {
        std::str::from_utf8(raw).map(str::to_owned)
    })(input)
}

fn blob(input: &[u8]) -> IResult<&[u8], Bytes> {
    map(length_data(le_u32), Bytes::copy_from_slice)(input)
}

fn flag(input: &[u8]) -> IResult<&[u8], bool> {
    map_opt(byte, |value| match value {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    })(input)
}

fn selector(input: &[u8]) -> IResult<&[u8], (String, Option<String>)> {
    let (input, name) = string(input)?;
    let (input, present) = flag(input)?;
    if present {
        let (input, value) = string(input)?;
        Ok((input, (name, Some(value))))
    } else {
        Ok((input, (name, None)))
    }
}

fn vary(input: &[u8]) -> IResult<&[u8], Vary> {
    let (input, selectors) = length_count(le_u32, selector)(input)?;
    let (input, wildcard) = flag(input)?;
    let vary = if wildcard {
        Vary::wildcard()
    } else {
        Vary::new(selectors)
    };
    Ok((input, vary))
}

fn header(input: &[u8]) -> IResult<&[u8], Header> {
    map(pair(string, string), |(name, value)| Header::new(name, value))(input)
}

fn payload(input: &[u8]) -> IResult<&[u8], Option<Payload>> {
    let (input, kind) = byte::<_, nom::error::Error<&[u8]>>(input)?;
    match kind {
        PAYLOAD_NONE => Ok((input, None)),
        PAYLOAD_INLINE => map(pair(string, blob), |(mime, data)| {
            Some(Payload::inline(mime, data))
        })(input),
        PAYLOAD_FILE => map(pair(string, string), |(mime, path)| {
            Some(Payload::file(mime, path))
        })(input),
        _ => Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Tag))),
    }
}

fn timestamp(input: &[u8]) -> IResult<&[u8], DateTime<Utc>> {
    map_opt(le_i64, DateTime::<Utc>::from_timestamp_millis)(input)
}

fn status(input: &[u8]) -> IResult<&[u8], Status> {
    map(le_u16, Status)(input)
}

fn variant(input: &[u8]) -> IResult<&[u8], (Vary, Arc<CacheItem>)> {
    let (input, vary) = vary(input)?;
    let (input, storage_time) = timestamp(input)?;
    let (input, status) = status(input)?;
    let (input, headers) = length_count(le_u32, header)(input)?;
    let (input, payload) = payload(input)?;

    let mut response = HttpResponse::new(status, headers.into_iter().collect());
    if let Some(payload) = payload {
        response = response.with_payload(payload);
    }

    let item = CacheItem::with_storage_time(response, storage_time);
    Ok((input, (vary, Arc::new(item))))
}

fn group(input: &[u8]) -> IResult<&[u8], EntryGroup> {
    let (input, uri) = string(input)?;
    let (input, variants) = length_count(le_u32, variant)(input)?;
    Ok((input, EntryGroup { uri, variants }))
}

/// Sibling path a snapshot is written to before being renamed into place
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a snapshot atomically (temp file, fsync, rename)
pub fn write_file(path: &Path, groups: &[EntryGroup]) -> Result<()> {
    let data = encode(groups)?;
    let tmp = temp_path(path);

    {
        let mut file = File::create(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    tracing::debug!(
        path = %path.display(),
        groups = groups.len(),
        bytes = data.len(),
        "wrote snapshot"
    );
    Ok(())
}

/// Read and decode a snapshot file
pub fn read_file(path: &Path) -> Result<Vec<EntryGroup>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(Error::Parse("snapshot is empty".to_string()));
    }

    // SAFETY: the map is read-only and dropped before this function returns;
    // snapshots are only ever replaced by rename, never modified in place.
    let map = unsafe { Mmap::map(&file)? };
    decode(&map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stalewise::Headers;
    use tempfile::TempDir;

    fn stored_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2009, 4, 22, 10, 10, 30).unwrap()
    }

    fn item(headers: Headers, payload: Option<Payload>) -> Arc<CacheItem> {
        let mut response = HttpResponse::new(Status::OK, headers);
        if let Some(payload) = payload {
            response = response.with_payload(payload);
        }
        Arc::new(CacheItem::with_storage_time(response, stored_at()))
    }

    fn sample() -> Vec<EntryGroup> {
        let english = Vary::new([("Accept-Language", Some("en"))]);
        let absent = Vary::new([("Accept-Language", None::<&str>)]);

        vec![
            EntryGroup {
                uri: "http://example.com/a".to_string(),
                variants: vec![
                    (
                        english,
                        item(
                            Headers::new()
                                .add("ETag", "\"1\"")
                                .add("Cache-Control", "max-age=60"),
                            Some(Payload::inline("text/plain", &b"hello"[..])),
                        ),
                    ),
                    (absent, item(Headers::new().add("ETag", "\"2\""), None)),
                ],
            },
            EntryGroup {
                uri: "http://example.com/b".to_string(),
                variants: vec![(
                    Vary::empty(),
                    item(
                        Headers::new().add("Last-Modified", "Wed, 22 Apr 2009 10:00:00 GMT"),
                        Some(Payload::file("image/png", "/var/cache/b.png")),
                    ),
                )],
            },
        ]
    }

    #[test]
    fn test_round_trip() {
        let groups = sample();
        let data = encode(&groups).unwrap();

        assert_eq!(&data[..SNAPSHOT_MAGIC.len()], SNAPSHOT_MAGIC);
        assert!(data.ends_with(SNAPSHOT_END));
        assert_eq!(decode(&data).unwrap(), groups);
    }

    #[test]
    fn test_empty_snapshot() {
        let data = encode(&[]).unwrap();
        assert_eq!(data.len(), SNAPSHOT_MAGIC.len() + 8 + SNAPSHOT_END.len());
        assert!(decode(&data).unwrap().is_empty());
    }

    #[test]
    fn test_every_truncation_is_rejected() {
        let data = encode(&sample()).unwrap();

        for len in 0..data.len() {
            assert!(
                matches!(decode(&data[..len]), Err(Error::Parse(_))),
                "prefix of {} bytes decoded",
                len
            );
        }
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = encode(&sample()).unwrap();
        data[0] = b'X';
        assert!(matches!(decode(&data), Err(Error::Parse(_))));
    }

    #[test]
    fn test_unknown_version() {
        let mut data = encode(&[]).unwrap();
        data[SNAPSHOT_MAGIC.len()..SNAPSHOT_MAGIC.len() + 4].copy_from_slice(&7u32.to_le_bytes());

        match decode(&data) {
            Err(Error::Parse(msg)) => assert!(msg.contains("version 7"), "{}", msg),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut data = encode(&sample()).unwrap();
        data.push(0);
        assert!(matches!(decode(&data), Err(Error::Parse(_))));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut data = Vec::new();
        data.extend_from_slice(SNAPSHOT_MAGIC);
        data.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.push(0xff);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(SNAPSHOT_END);

        assert!(matches!(decode(&data), Err(Error::Parse(_))));
    }

    #[test]
    fn test_unknown_payload_tag() {
        let groups = vec![EntryGroup {
            uri: "u".to_string(),
            variants: vec![(Vary::empty(), item(Headers::new(), None))],
        }];
        let mut data = encode(&groups).unwrap();
        let tag_at = data.len() - SNAPSHOT_END.len() - 1;
        assert_eq!(data[tag_at], PAYLOAD_NONE);
        data[tag_at] = 9;

        assert!(matches!(decode(&data), Err(Error::Parse(_))));
    }

    #[test]
    fn test_wildcard_selector() {
        let groups = vec![EntryGroup {
            uri: "u".to_string(),
            variants: vec![(Vary::wildcard(), item(Headers::new(), None))],
        }];
        let decoded = decode(&encode(&groups).unwrap()).unwrap();
        assert!(decoded[0].variants[0].0.is_wildcard());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("persistent.snap");

        write_file(&path, &sample()).unwrap();

        assert!(!temp_path(&path).exists());
        assert_eq!(read_file(&path).unwrap(), sample());
    }

    #[test]
    fn test_read_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("persistent.snap");
        fs::write(&path, b"").unwrap();

        assert!(matches!(read_file(&path), Err(Error::Parse(_))));
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path(Path::new("/cache/persistent.snap")),
            PathBuf::from("/cache/persistent.snap.tmp")
        );
    }
}
