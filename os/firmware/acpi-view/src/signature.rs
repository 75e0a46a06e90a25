//! # ACPI table signatures

use core::fmt;

/// A 4-byte ACPI table signature, stored as the little-endian `u32` the
/// bytes form in memory.
///
/// ```rust
/// # use acpi_view::Signature;
/// let madt = Signature::new(*b"APIC");
/// assert_eq!(madt, Signature::MADT);
/// assert_eq!(madt.as_u32(), 0x4349_5041);
/// assert_eq!(format!("{madt}"), "APIC");
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Signature(u32);

impl Signature {
    /// Pseudo-signature used to route the RSDP, whose real signature is the
    /// 8-byte `"RSD PTR "`.
    pub const RSDP: Self = Self::new(*b"RSDP");
    pub const XSDT: Self = Self::new(*b"XSDT");
    pub const RSDT: Self = Self::new(*b"RSDT");
    pub const FADT: Self = Self::new(*b"FACP");
    pub const FACS: Self = Self::new(*b"FACS");
    pub const DSDT: Self = Self::new(*b"DSDT");
    pub const SSDT: Self = Self::new(*b"SSDT");
    pub const MADT: Self = Self::new(*b"APIC");
    pub const GTDT: Self = Self::new(*b"GTDT");
    pub const IORT: Self = Self::new(*b"IORT");
    pub const SRAT: Self = Self::new(*b"SRAT");
    pub const SLIT: Self = Self::new(*b"SLIT");
    pub const MCFG: Self = Self::new(*b"MCFG");
    pub const HEST: Self = Self::new(*b"HEST");
    pub const HMAT: Self = Self::new(*b"HMAT");
    pub const PPTT: Self = Self::new(*b"PPTT");
    pub const BGRT: Self = Self::new(*b"BGRT");
    pub const DBG2: Self = Self::new(*b"DBG2");
    pub const SPCR: Self = Self::new(*b"SPCR");
    pub const TPM2: Self = Self::new(*b"TPM2");
    pub const WSMT: Self = Self::new(*b"WSMT");
    pub const MPAM: Self = Self::new(*b"MPAM");
    pub const PCCT: Self = Self::new(*b"PCCT");
    pub const AEST: Self = Self::new(*b"AEST");
    pub const APMT: Self = Self::new(*b"APMT");
    pub const EINJ: Self = Self::new(*b"EINJ");
    pub const ERST: Self = Self::new(*b"ERST");
    pub const HPET: Self = Self::new(*b"HPET");
    pub const RAS2: Self = Self::new(*b"RAS2");
    pub const RASF: Self = Self::new(*b"RASF");
    pub const SPMI: Self = Self::new(*b"SPMI");
    pub const AGDI: Self = Self::new(*b"AGDI");
    pub const RIMT: Self = Self::new(*b"RIMT");

    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Read a signature from the first four bytes of `bytes`.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..4)?;
        Some(Self::new([b[0], b[1], b[2], b[3]]))
    }

    /// Parse a signature typed by a user, e.g. `"apic"`. ASCII letters are
    /// upper-cased; anything but exactly four ASCII characters is rejected.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(u8::is_ascii) {
            return None;
        }
        let mut b = [0u8; 4];
        for (dst, src) in b.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Some(Self::new(b))
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            let c = if b.is_ascii_graphic() || b == b' ' {
                char::from(b)
            } else {
                '.'
            };
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(\"{self}\")")
    }
}

impl From<[u8; 4]> for Signature {
    #[inline]
    fn from(bytes: [u8; 4]) -> Self {
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_lower_case() {
        assert_eq!(Signature::parse("facp"), Some(Signature::FADT));
        assert_eq!(Signature::parse("FACPX"), None);
        assert_eq!(Signature::parse(""), None);
    }

    #[test]
    fn display_masks_unprintable_bytes() {
        let s = Signature::new([b'A', 0, b'C', 0xFF]);
        assert_eq!(alloc::format!("{s}"), "A.C.");
    }
}
