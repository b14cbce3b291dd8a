//! SMB negotiate probe over an established session.

use maybe_async::maybe_async;
use netbios_msg::{Smb1NegotiateRequest, Smb2ReplyHeader, SmbReply};

use crate::{Error, Result, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbFamily {
    Smb1,
    Smb2,
}

/// What the server answered to a multi-protocol NEGOTIATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbProbe {
    pub family: SmbFamily,
    pub status: u32,
    /// SMB1: index of the chosen dialect in the offered list.
    pub dialect_index: Option<u16>,
    /// SMB2: the chosen dialect revision, e.g. `0x02ff` for a multi-protocol reply.
    pub dialect_revision: Option<u16>,
    pub server_guid: Option<[u8; 16]>,
}

impl SmbProbe {
    /// Revision of a reply to a multi-protocol negotiate, before the dialect is settled.
    pub const SMB2_WILDCARD_REVISION: u16 = 0x02ff;

    fn from_smb2(header: &Smb2ReplyHeader) -> Self {
        let prefix = header.negotiate_prefix();
        SmbProbe {
            family: SmbFamily::Smb2,
            status: header.status,
            dialect_index: None,
            dialect_revision: prefix.map(|p| p.dialect_revision),
            server_guid: prefix.map(|p| p.server_guid),
        }
    }

    /// The name of the dialect the server chose, when known.
    pub fn dialect_name(&self) -> Option<String> {
        match self.family {
            SmbFamily::Smb1 => {
                let index = self.dialect_index? as usize;
                Smb1NegotiateRequest::default()
                    .dialect_names()
                    .into_iter()
                    .nth(index)
            }
            SmbFamily::Smb2 => self.dialect_revision.map(|r| match r {
                Self::SMB2_WILDCARD_REVISION => "SMB 2.???".to_string(),
                r => format!("SMB {}.{}.{}", r >> 8, (r >> 4) & 0xf, r & 0xf),
            }),
        }
    }
}

impl From<&SmbReply> for SmbProbe {
    fn from(reply: &SmbReply) -> Self {
        match reply {
            SmbReply::Smb1(header) => SmbProbe {
                family: SmbFamily::Smb1,
                status: header.status,
                dialect_index: header.dialect_index(),
                dialect_revision: None,
                server_guid: None,
            },
            SmbReply::Smb2(header) => Self::from_smb2(header),
        }
    }
}

#[maybe_async]
impl Session {
    /// Sends an SMB1 multi-protocol NEGOTIATE offering SMB2, and reads the reply header.
    ///
    /// The reply status becomes [`Session::last_nt_status`]; an error status, by NT
    /// severity or SMB1 DOS error class, fails with [`Error::NtStatus`].
    pub async fn smb_negotiate_probe(&mut self) -> Result<SmbProbe> {
        let request: Vec<u8> = Smb1NegotiateRequest::default().try_into()?;
        self.send(&request).await?;
        let reply = self.recv().await?;
        let reply = SmbReply::try_from(reply.as_slice())?;

        let status = reply.status();
        self.last_nt_status = status;
        if reply.is_error() {
            log::debug!(
                "Negotiate with {} failed: {}",
                self.called_name(),
                netbios_msg::Status::try_display_as_status(status)
            );
            return Err(Error::NtStatus(status));
        }
        Ok(SmbProbe::from(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_name() {
        let smb1 = SmbProbe {
            family: SmbFamily::Smb1,
            status: 0,
            dialect_index: Some(0),
            dialect_revision: None,
            server_guid: None,
        };
        assert_eq!(smb1.dialect_name().as_deref(), Some("NT LM 0.12"));

        let smb2 = SmbProbe {
            family: SmbFamily::Smb2,
            dialect_index: None,
            dialect_revision: Some(0x0311),
            ..smb1
        };
        assert_eq!(smb2.dialect_name().as_deref(), Some("SMB 3.1.1"));
        let wildcard = SmbProbe {
            dialect_revision: Some(SmbProbe::SMB2_WILDCARD_REVISION),
            ..smb2.clone()
        };
        assert_eq!(wildcard.dialect_name().as_deref(), Some("SMB 2.???"));
        assert_eq!(
            SmbProbe {
                dialect_index: Some(0xffff),
                ..smb1
            }
            .dialect_name(),
            None
        );
    }
}
