#![allow(dead_code)]

use acpi_view::{FileHandle, FileSink, FileSinkError, PhysRegions};
use std::collections::BTreeMap;

pub const OEM_ID: &[u8; 6] = b"SUNSID";
pub const OEM_TABLE_ID: &[u8; 8] = b"VIEWTEST";

pub const RSDP_ADDRESS: u64 = 0x000E_0000;
pub const XSDT_ADDRESS: u64 = 0x1000;
pub const FADT_ADDRESS: u64 = 0x2000;
pub const FACS_ADDRESS: u64 = 0x3000;
pub const DSDT_ADDRESS: u64 = 0x4000;
pub const OEM_TABLE_ADDRESS: u64 = 0x5000;

/// Set `bytes[at]` so that all of `bytes` sums to zero.
pub fn fix_checksum(bytes: &mut [u8], at: usize) {
    bytes[at] = 0;
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    bytes[at] = 0u8.wrapping_sub(sum);
}

/// A table with the common header, `body` after it and a valid checksum.
pub fn table(signature: &[u8; 4], revision: u8, body: &[u8]) -> Vec<u8> {
    let length = u32::try_from(36 + body.len()).unwrap();
    let mut t = Vec::with_capacity(36 + body.len());
    t.extend_from_slice(signature);
    t.extend_from_slice(&length.to_le_bytes());
    t.push(revision);
    t.push(0);
    t.extend_from_slice(OEM_ID);
    t.extend_from_slice(OEM_TABLE_ID);
    t.extend_from_slice(&1u32.to_le_bytes());
    t.extend_from_slice(b"TEST");
    t.extend_from_slice(&1u32.to_le_bytes());
    t.extend_from_slice(body);
    fix_checksum(&mut t, 9);
    t
}

/// An ACPI 2.0 RSDP pointing at `xsdt`, with both checksums valid.
pub fn rsdp(xsdt: u64) -> Vec<u8> {
    let mut r = Vec::with_capacity(36);
    r.extend_from_slice(b"RSD PTR ");
    r.push(0);
    r.extend_from_slice(OEM_ID);
    r.push(2);
    r.extend_from_slice(&0u32.to_le_bytes());
    r.extend_from_slice(&36u32.to_le_bytes());
    r.extend_from_slice(&xsdt.to_le_bytes());
    r.extend_from_slice(&[0; 4]);
    fix_checksum(&mut r[..20], 8);
    fix_checksum(&mut r, 32);
    r
}

pub fn xsdt(entries: &[u64]) -> Vec<u8> {
    let body: Vec<u8> = entries.iter().flat_map(|e| e.to_le_bytes()).collect();
    table(b"XSDT", 1, &body)
}

/// A 276-byte revision 6 FADT referencing `facs` and `dsdt` through the
/// 64-bit pointers.
pub fn fadt(facs: u64, dsdt: u64, flags: u32) -> Vec<u8> {
    let mut body = vec![0u8; 276 - 36];
    let at = |offset: usize| offset - 36;
    body[at(112)..at(116)].copy_from_slice(&flags.to_le_bytes());
    body[at(131)] = 5;
    body[at(132)..at(140)].copy_from_slice(&facs.to_le_bytes());
    body[at(140)..at(148)].copy_from_slice(&dsdt.to_le_bytes());
    table(b"FACP", 6, &body)
}

pub fn facs() -> Vec<u8> {
    let mut f = vec![0u8; 64];
    f[..4].copy_from_slice(b"FACS");
    f[4..8].copy_from_slice(&64u32.to_le_bytes());
    f[32] = 2;
    f
}

pub fn dsdt() -> Vec<u8> {
    // DefScope (\_SB_) with an empty body.
    table(b"DSDT", 2, &[0x10, 0x05, 0x5C, 0x5F, 0x53, 0x42, 0x5F])
}

/// The graph RSDP → XSDT → {FADT → {FACS, DSDT}, OEMX}.
pub fn platform() -> PhysRegions {
    let mut memory = PhysRegions::new();
    memory.insert(RSDP_ADDRESS, rsdp(XSDT_ADDRESS));
    memory.insert(XSDT_ADDRESS, xsdt(&[FADT_ADDRESS, OEM_TABLE_ADDRESS]));
    memory.insert(FADT_ADDRESS, fadt(FACS_ADDRESS, DSDT_ADDRESS, 0));
    memory.insert(FACS_ADDRESS, facs());
    memory.insert(DSDT_ADDRESS, dsdt());
    memory.insert(OEM_TABLE_ADDRESS, table(b"OEMX", 1, &[0xAB; 8]));
    memory
}

/// In-memory file system for binary dumps.
#[derive(Default)]
pub struct MemoryFiles {
    pub files: BTreeMap<String, Vec<u8>>,
    names: Vec<String>,
    /// Accept at most this many bytes per write.
    pub short_write: Option<usize>,
}

impl MemoryFiles {
    /// A file system whose writes accept at most `limit` bytes.
    pub fn truncating(limit: usize) -> Self {
        Self {
            short_write: Some(limit),
            ..Self::default()
        }
    }
}

impl FileSink for MemoryFiles {
    fn create_file(&mut self, name: &str) -> Result<FileHandle, FileSinkError> {
        self.files.insert(name.to_owned(), Vec::new());
        self.names.push(name.to_owned());
        Ok(FileHandle(self.names.len() - 1))
    }

    fn write(&mut self, handle: FileHandle, bytes: &[u8]) -> Result<usize, FileSinkError> {
        let name = self.names.get(handle.0).ok_or(FileSinkError::Write)?;
        let file = self.files.get_mut(name).ok_or(FileSinkError::Write)?;
        let n = self.short_write.map_or(bytes.len(), |limit| limit.min(bytes.len()));
        file.extend_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn delete_file(&mut self, handle: FileHandle) -> Result<(), FileSinkError> {
        let name = self.names.get(handle.0).ok_or(FileSinkError::Delete)?;
        self.files.remove(name).map(|_| ()).ok_or(FileSinkError::Delete)
    }
}
