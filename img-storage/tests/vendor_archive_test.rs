//! fastman92 (`VERF`) archives: read-only support, compressed payloads,
//! refusal paths for encryption and rebuild.

use img_codec::Codec;
use img_storage::{Archive, Compression, ImgError, ImgVersion, SECTOR_SIZE};
use std::fs;
use std::path::{Path, PathBuf};

struct VerfEntry<'a> {
    name: &'a str,
    payload: &'a [u8],
    /// Uncompressed length for compressed entries
    original_len: usize,
    algorithm_id: u32,
}

fn write_verf_fixture(dir: &Path, name: &str, archive_flags: u32, items: &[VerfEntry]) -> PathBuf {
    let header_end = 32 + 64 * items.len() as u64;
    let data_start = header_end.div_ceil(SECTOR_SIZE) * SECTOR_SIZE;

    let mut out = Vec::new();
    out.extend_from_slice(b"VERF");
    out.extend_from_slice(&archive_flags.to_le_bytes());
    out.extend_from_slice(b"test author\x00");
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&(items.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    let mut data = Vec::new();
    for item in items {
        let offset = data_start + data.len() as u64;
        let stored_sectors = item.payload.len().div_ceil(SECTOR_SIZE as usize) as u32;
        let original_sectors = item.original_len.div_ceil(SECTOR_SIZE as usize) as u32;

        out.extend_from_slice(&((offset / SECTOR_SIZE) as u32).to_le_bytes());
        if item.algorithm_id == 0 {
            out.extend_from_slice(&stored_sectors.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
        } else {
            out.extend_from_slice(&original_sectors.to_le_bytes());
            out.extend_from_slice(&stored_sectors.to_le_bytes());
        }
        out.extend_from_slice(&item.algorithm_id.to_le_bytes());
        let mut field = [0u8; 40];
        field[..item.name.len()].copy_from_slice(item.name.as_bytes());
        out.extend_from_slice(&field);
        out.extend_from_slice(&[0u8; 8]);

        data.extend_from_slice(item.payload);
        let padded = (data.len() as u64).div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
        data.resize(padded as usize, 0);
    }

    out.resize(data_start as usize, 0);
    out.extend_from_slice(&data);

    let path = dir.join(name);
    fs::write(&path, out).unwrap();
    path
}

#[test]
fn compressed_entries_decode_through_the_registry() {
    let tmp = tempfile::tempdir().unwrap();
    let original: Vec<u8> = b"DFF geometry ".repeat(200);
    let framed = img_codec::compress(&original, Codec::FramedZlib, None)
        .unwrap()
        .into_bytes();

    let path = write_verf_fixture(
        tmp.path(),
        "mod.img",
        0x0002, // sub-version 2, no encryption
        &[
            VerfEntry {
                name: "packed.dff",
                payload: &framed,
                original_len: original.len(),
                algorithm_id: 1,
            },
            VerfEntry {
                name: "plain.txd",
                payload: b"raw texture bytes",
                original_len: 0,
                algorithm_id: 0,
            },
        ],
    );

    let archive = Archive::open(&path).unwrap();
    assert_eq!(archive.layout(), ImgVersion::Fastman92);
    assert_eq!(archive.vendor_header().unwrap().sub_version(), 2);
    assert_eq!(archive.len(), 2);

    let packed = archive.find_entry("packed.dff").unwrap();
    assert_eq!(
        archive.entry(packed).unwrap().compression(),
        Compression::Known(Codec::FramedZlib)
    );
    assert_eq!(archive.read(packed).unwrap(), original);

    // Raw bytes come back exactly as stored, frame header and all.
    let raw = archive.read_raw(packed).unwrap();
    assert_eq!(&raw[..framed.len()], &framed[..]);

    let plain = archive.find_entry("plain.txd").unwrap();
    let bytes = archive.read(plain).unwrap();
    assert_eq!(&bytes[..17], b"raw texture bytes");
}

#[test]
fn encrypted_archives_refuse_payload_reads() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_verf_fixture(
        tmp.path(),
        "locked.img",
        0x0100, // encryption type 1
        &[VerfEntry {
            name: "secret.dff",
            payload: &[0xAB; 64],
            original_len: 0,
            algorithm_id: 0,
        }],
    );

    let archive = Archive::open(&path).unwrap();
    assert!(archive.vendor_header().unwrap().is_encrypted());
    assert!(archive.entries()[0].is_encrypted());

    let handle = archive.handles().next().unwrap();
    let err = archive.read(handle).unwrap_err();
    assert!(matches!(err, ImgError::UnsupportedLayoutOperation(_)));
}

#[test]
fn unknown_algorithm_ids_fail_loudly() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_verf_fixture(
        tmp.path(),
        "odd.img",
        0,
        &[VerfEntry {
            name: "strange.dff",
            payload: &[0x01; 32],
            original_len: 32,
            algorithm_id: 0xB,
        }],
    );

    let archive = Archive::open(&path).unwrap();
    assert_eq!(
        archive.entries()[0].compression(),
        Compression::Unknown(0xB)
    );

    let handle = archive.handles().next().unwrap();
    let err = archive.read(handle).unwrap_err();
    assert!(matches!(err, ImgError::UnsupportedCompression(0xB)));
}

#[test]
fn vendor_rebuild_is_an_explicit_refusal() {
    let tmp = tempfile::tempdir().unwrap();
    let path = write_verf_fixture(
        tmp.path(),
        "nowrite.img",
        0,
        &[VerfEntry {
            name: "entry.dff",
            payload: &[0x33; 100],
            original_len: 0,
            algorithm_id: 0,
        }],
    );

    let mut archive = Archive::open(&path).unwrap();
    let err = archive.rebuild(None).unwrap_err();
    assert!(matches!(err, ImgError::UnsupportedLayoutOperation(_)));

    // The mutation path still works; only the write-out is unsupported.
    archive.add("added.dff", vec![1, 2, 3]).unwrap();
    assert!(archive.is_dirty());
}
