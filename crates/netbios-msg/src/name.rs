//! NetBIOS names and their level-1 wire encoding.
//!
//! A NetBIOS name is 16 bytes: up to 15 upper-case OEM characters, padded with
//! spaces, followed by a one-byte suffix identifying the service. On the wire
//! each byte is split into two nibbles, each written as `'A' + nibble`
//! (RFC 1001 14.1), and the result is prefixed by its length (32) and
//! followed by the optional scope labels.

use std::io::{Read, Seek, SeekFrom, Write};

use binrw::{Endian, prelude::*};

use crate::NbtMsgError;

/// Length of a raw NetBIOS name, including the suffix byte.
pub const NETBIOS_NAME_LEN: usize = 16;
/// Maximum number of characters of the name part.
pub const MAX_NAME_CHARS: usize = NETBIOS_NAME_LEN - 1;
/// Length of a level-1 encoded name, without scope.
pub const ENCODED_NAME_LEN: usize = NETBIOS_NAME_LEN * 2;

const MAX_LABEL_LEN: usize = 63;
const MAX_ENCODED_TOTAL_LEN: usize = 255;
const POINTER_MASK: u8 = 0xc0;

/// The 16th byte of a NetBIOS name, identifying the registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NameSuffix(pub u8);

impl NameSuffix {
    pub const WORKSTATION: Self = Self(0x00);
    pub const MESSENGER: Self = Self(0x03);
    pub const RAS_SERVER: Self = Self(0x06);
    pub const DOMAIN_MASTER_BROWSER: Self = Self(0x1b);
    pub const DOMAIN_CONTROLLERS: Self = Self(0x1c);
    pub const MASTER_BROWSER: Self = Self(0x1d);
    pub const BROWSER_ELECTIONS: Self = Self(0x1e);
    pub const NETDDE: Self = Self(0x1f);
    pub const FILE_SERVER: Self = Self(0x20);
    pub const RAS_CLIENT: Self = Self(0x21);

    /// A short description of well-known suffixes.
    pub fn description(&self) -> Option<&'static str> {
        Some(match *self {
            Self::WORKSTATION => "Workstation",
            Self::MESSENGER => "Messenger",
            Self::RAS_SERVER => "RAS Server",
            Self::DOMAIN_MASTER_BROWSER => "Domain Master Browser",
            Self::DOMAIN_CONTROLLERS => "Domain Controllers",
            Self::MASTER_BROWSER => "Master Browser",
            Self::BROWSER_ELECTIONS => "Browser Elections",
            Self::NETDDE => "NetDDE",
            Self::FILE_SERVER => "File Server",
            Self::RAS_CLIENT => "RAS Client",
            _ => return None,
        })
    }
}

impl From<u8> for NameSuffix {
    fn from(value: u8) -> Self {
        NameSuffix(value)
    }
}

impl From<NameSuffix> for u8 {
    fn from(value: NameSuffix) -> Self {
        value.0
    }
}

impl std::fmt::Display for NameSuffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.description() {
            Some(description) => write!(f, "<{:02x}> {}", self.0, description),
            None => write!(f, "<{:02x}>", self.0),
        }
    }
}

/// A validated, 16-byte NetBIOS name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetBiosName {
    raw: [u8; NETBIOS_NAME_LEN],
}

impl NetBiosName {
    /// Builds a name from a caller string.
    ///
    /// The string is converted to upper-case OEM characters. Non-ASCII
    /// characters, control characters and `.` (the scope separator) cannot be
    /// represented and fail with [`NbtMsgError::CharsetError`]; empty, blank or
    /// over-long names fail with [`NbtMsgError::InvalidName`].
    ///
    /// `"*"` builds the wildcard name, whichever suffix is given.
    pub fn new(name: &str, suffix: NameSuffix) -> crate::Result<Self> {
        if name.is_empty() {
            return Err(NbtMsgError::InvalidName("name is empty".into()));
        }
        if name == "*" {
            return Ok(Self::wildcard());
        }

        let oem = to_oem(name)?;
        if oem.len() > MAX_NAME_CHARS {
            return Err(NbtMsgError::InvalidName(format!(
                "{name} is longer than {MAX_NAME_CHARS} characters"
            )));
        }
        if oem.iter().all(|&b| b == b' ') {
            return Err(NbtMsgError::InvalidName("name is blank".into()));
        }

        let mut raw = [b' '; NETBIOS_NAME_LEN];
        raw[..oem.len()].copy_from_slice(&oem);
        raw[MAX_NAME_CHARS] = suffix.0;
        Ok(Self { raw })
    }

    /// The wildcard name `*`, padded with NUL bytes, used by node status queries.
    pub fn wildcard() -> Self {
        let mut raw = [0; NETBIOS_NAME_LEN];
        raw[0] = b'*';
        Self { raw }
    }

    /// Validates a raw 16-byte name received from the wire.
    pub fn from_raw(raw: [u8; NETBIOS_NAME_LEN]) -> crate::Result<Self> {
        for &b in &raw[..MAX_NAME_CHARS] {
            if b != 0 && !(0x20..0x7f).contains(&b) {
                return Err(NbtMsgError::CharsetError(format!(
                    "byte {b:#04x} in received name is not a printable OEM character"
                )));
            }
        }
        Ok(Self { raw })
    }

    /// Decodes a level-1 encoded name.
    pub fn from_level1(encoded: &[u8; ENCODED_NAME_LEN]) -> crate::Result<Self> {
        Self::from_raw(level1_decode(encoded)?)
    }

    pub fn as_raw(&self) -> &[u8; NETBIOS_NAME_LEN] {
        &self.raw
    }

    /// The name part, without padding and suffix.
    pub fn name(&self) -> String {
        self.raw[..MAX_NAME_CHARS]
            .iter()
            .map(|&b| b as char)
            .collect::<String>()
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    pub fn suffix(&self) -> NameSuffix {
        NameSuffix(self.raw[MAX_NAME_CHARS])
    }

    pub fn is_wildcard(&self) -> bool {
        self.raw[0] == b'*' && self.raw[1..].iter().all(|&b| b == 0)
    }

    pub fn to_level1(&self) -> [u8; ENCODED_NAME_LEN] {
        level1_encode(&self.raw)
    }
}

impl std::fmt::Display for NetBiosName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{:02x}>", self.name(), self.suffix().0)
    }
}

/// Converts a caller string to the OEM bytes of a NetBIOS name.
fn to_oem(name: &str) -> crate::Result<Vec<u8>> {
    name.chars()
        .map(|c| {
            if !c.is_ascii() {
                Err(NbtMsgError::CharsetError(format!(
                    "'{c}' has no OEM representation"
                )))
            } else if c.is_ascii_control() || c == '.' {
                Err(NbtMsgError::CharsetError(format!(
                    "{c:?} is not allowed in a NetBIOS name"
                )))
            } else {
                Ok(c.to_ascii_uppercase() as u8)
            }
        })
        .collect()
}

/// Splits every byte into two nibbles, written as `'A' + nibble`.
pub fn level1_encode(raw: &[u8; NETBIOS_NAME_LEN]) -> [u8; ENCODED_NAME_LEN] {
    let mut encoded = [0; ENCODED_NAME_LEN];
    for (i, b) in raw.iter().enumerate() {
        encoded[2 * i] = b'A' + (b >> 4);
        encoded[2 * i + 1] = b'A' + (b & 0x0f);
    }
    encoded
}

/// Reverses [`level1_encode`]; every character must be within `'A'..='P'`.
pub fn level1_decode(encoded: &[u8; ENCODED_NAME_LEN]) -> crate::Result<[u8; NETBIOS_NAME_LEN]> {
    let nibble = |c: u8| -> crate::Result<u8> {
        if (b'A'..=b'P').contains(&c) {
            Ok(c - b'A')
        } else {
            Err(NbtMsgError::InvalidEncoding(format!(
                "{:?} is not a level-1 character",
                c as char
            )))
        }
    };

    let mut raw = [0; NETBIOS_NAME_LEN];
    for (i, pair) in encoded.chunks_exact(2).enumerate() {
        raw[i] = (nibble(pair[0])? << 4) | nibble(pair[1])?;
    }
    Ok(raw)
}

/// A level-1 encoded name with its optional scope, as found in questions,
/// resource records and session requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedName {
    pub name: NetBiosName,
    /// Dot-separated scope labels, if any.
    pub scope: Option<String>,
}

impl EncodedName {
    pub fn new(name: NetBiosName) -> Self {
        Self { name, scope: None }
    }

    pub fn with_scope(name: NetBiosName, scope: &str) -> crate::Result<Self> {
        let labels: Vec<&str> = scope.split('.').collect();
        if labels.iter().any(|l| l.is_empty() || l.len() > MAX_LABEL_LEN) {
            return Err(NbtMsgError::InvalidName(format!("invalid scope {scope}")));
        }
        if !scope.is_ascii() {
            return Err(NbtMsgError::CharsetError(format!(
                "scope {scope} is not ASCII"
            )));
        }
        let total = 1 + ENCODED_NAME_LEN + labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
        if total > MAX_ENCODED_TOTAL_LEN {
            return Err(NbtMsgError::InvalidName(format!("scope {scope} is too long")));
        }
        Ok(Self {
            name,
            scope: Some(scope.to_string()),
        })
    }
}

impl From<NetBiosName> for EncodedName {
    fn from(name: NetBiosName) -> Self {
        EncodedName::new(name)
    }
}

impl BinRead for EncodedName {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        let length = u8::read_options(reader, endian, ())?;
        if length as usize != ENCODED_NAME_LEN {
            return Err(
                NbtMsgError::InvalidEncoding(format!("first label length is {length}, not 32"))
                    .at(pos),
            );
        }

        let encoded = <[u8; ENCODED_NAME_LEN]>::read_options(reader, endian, ())?;
        let name = NetBiosName::from_level1(&encoded).map_err(|e| e.at(pos))?;

        let mut labels = Vec::new();
        let mut total = 1 + ENCODED_NAME_LEN;
        loop {
            let label_pos = reader.stream_position()?;
            let label_len = u8::read_options(reader, endian, ())? as usize;
            total += 1;
            if label_len == 0 {
                break;
            }
            if label_len > MAX_LABEL_LEN {
                return Err(NbtMsgError::InvalidEncoding(format!(
                    "scope label length {label_len} exceeds {MAX_LABEL_LEN}"
                ))
                .at(label_pos));
            }
            total += label_len;
            if total > MAX_ENCODED_TOTAL_LEN {
                return Err(NbtMsgError::InvalidEncoding("encoded name too long".into())
                    .at(label_pos));
            }

            let mut label = vec![0; label_len];
            reader.read_exact(&mut label)?;
            let label = String::from_utf8(label)
                .ok()
                .filter(|l| l.is_ascii())
                .ok_or_else(|| {
                    NbtMsgError::CharsetError("scope label is not ASCII".into()).at(label_pos)
                })?;
            labels.push(label);
        }

        Ok(EncodedName {
            name,
            scope: (!labels.is_empty()).then(|| labels.join(".")),
        })
    }
}

impl BinWrite for EncodedName {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        (ENCODED_NAME_LEN as u8).write_options(writer, endian, ())?;
        self.name.to_level1().write_options(writer, endian, ())?;
        if let Some(scope) = &self.scope {
            for label in scope.split('.') {
                (label.len() as u8).write_options(writer, endian, ())?;
                writer.write_all(label.as_bytes())?;
            }
        }
        0u8.write_options(writer, endian, ())
    }
}

/// The owner name of a resource record: either a full name, or a compression
/// pointer to a name earlier in the packet (RFC 883 label compression).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordName {
    Name(EncodedName),
    Pointer(u16),
}

impl RecordName {
    /// The name, when it is not a pointer.
    pub fn name(&self) -> Option<&NetBiosName> {
        match self {
            RecordName::Name(n) => Some(&n.name),
            RecordName::Pointer(_) => None,
        }
    }
}

impl BinRead for RecordName {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let first = u8::read_options(reader, endian, ())?;
        if first & POINTER_MASK == POINTER_MASK {
            let second = u8::read_options(reader, endian, ())?;
            let offset = u16::from_be_bytes([first & !POINTER_MASK, second]);
            return Ok(RecordName::Pointer(offset));
        }
        reader.seek(SeekFrom::Current(-1))?;
        Ok(RecordName::Name(EncodedName::read_options(reader, endian, ())?))
    }
}

impl BinWrite for RecordName {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        match self {
            RecordName::Name(name) => name.write_options(writer, endian, ()),
            RecordName::Pointer(offset) => {
                (offset | ((POINTER_MASK as u16) << 8)).write_options(writer, Endian::Big, ())
            }
        }
    }
}

impl From<EncodedName> for RecordName {
    fn from(name: EncodedName) -> Self {
        RecordName::Name(name)
    }
}
