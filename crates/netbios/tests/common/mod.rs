//! Loopback responders standing in for a name server and a file server.
#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use binrw::{BinRead, BinWrite, io::Cursor};
use netbios::*;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, UdpSocket},
};

pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

/// A name service answering with whatever `handler` returns for each request.
pub struct NsResponder {
    pub port: u16,
    pub queries: Arc<AtomicUsize>,
}

impl NsResponder {
    pub async fn spawn<F>(handler: F) -> NsResponder
    where
        F: Fn(&NsPacket) -> Option<NsPacket> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let queries = Arc::new(AtomicUsize::new(0));
        let counter = queries.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(request) = NsPacket::read(&mut Cursor::new(&buf[..len])) else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(response) = handler(&request) {
                    socket.send_to(&encode(&response), from).await.unwrap();
                }
            }
        });
        NsResponder { port, queries }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// A client configuration using this responder as its WINS server.
    pub fn config(&self) -> ClientConfig {
        config_for_wins(self.port)
    }
}

pub fn config_for_wins(port: u16) -> ClientConfig {
    ClientConfig {
        name_service: NameServiceConfig {
            timeout: TEST_TIMEOUT,
            retries: 1,
            wins_server: Some(Ipv4Addr::LOCALHOST),
            broadcast: false,
            port,
            bind_address: Ipv4Addr::LOCALHOST,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn encode<T>(value: &T) -> Vec<u8>
where
    T: BinWrite + binrw::meta::WriteEndian,
    for<'a> T::Args<'a>: Default,
{
    let mut cursor = Cursor::new(Vec::new());
    value.write_args(&mut cursor, Default::default()).unwrap();
    cursor.into_inner()
}

fn response_to(request: &NsPacket, rcode: u8, answers: Vec<ResourceRecord>) -> NsPacket {
    NsPacket {
        transaction_id: request.transaction_id,
        flags: NsFlags::new()
            .with_response(true)
            .with_authoritative(true)
            .with_rcode(rcode),
        questions: vec![],
        answers,
        authorities: vec![],
        additionals: vec![],
    }
}

pub fn positive_answer(request: &NsPacket, address: Ipv4Addr, ttl: u32) -> NsPacket {
    let rdata = encode(&NbAddress {
        flags: NbFlags::new(),
        address,
    });
    let record = ResourceRecord {
        name: request.questions[0].name.clone().into(),
        record_type: RecordType::Nb,
        record_class: RecordClass::Internet,
        ttl,
        rdata,
    };
    response_to(request, 0, vec![record])
}

pub fn negative_answer(request: &NsPacket) -> NsPacket {
    response_to(request, 3, vec![])
}

pub fn node_status_answer(request: &NsPacket, rdata: Vec<u8>) -> NsPacket {
    let record = ResourceRecord {
        name: request.questions[0].name.clone().into(),
        record_type: RecordType::NbStat,
        record_class: RecordClass::Internet,
        ttl: 0,
        rdata,
    };
    response_to(request, 0, vec![record])
}

pub fn sample_node_status() -> NodeStatus {
    let entry = |name: &str, suffix: NameSuffix, group: bool| NodeName {
        name: NetBiosName::new(name, suffix).unwrap(),
        flags: NodeNameFlags::new().with_active(true).with_group(group),
    };
    NodeStatus {
        names: vec![
            entry("FILESRV", NameSuffix::WORKSTATION, false),
            entry("WORKGROUP", NameSuffix::WORKSTATION, true),
            entry("FILESRV", NameSuffix::FILE_SERVER, false),
        ],
        unit_id: [0x52, 0x54, 0x00, 0x12, 0x34, 0x56],
        statistics: vec![0; 40],
    }
}

/// Builds an SMB2 reply header with the given status and body.
pub fn smb2_reply(status: u32, body: &[u8]) -> Vec<u8> {
    let mut reply = Vec::with_capacity(64 + body.len());
    reply.extend_from_slice(b"\xfeSMB");
    reply.extend_from_slice(&64u16.to_le_bytes());
    reply.extend_from_slice(&0u16.to_le_bytes());
    reply.extend_from_slice(&status.to_le_bytes());
    reply.extend_from_slice(&0u16.to_le_bytes());
    reply.extend_from_slice(&1u16.to_le_bytes());
    reply.extend_from_slice(&1u32.to_le_bytes());
    reply.extend_from_slice(&[0u8; 4 + 8 + 8 + 8 + 16]);
    reply.extend_from_slice(body);
    reply
}

/// Builds an SMB1 NEGOTIATE reply header with the given status and flags2, and an empty body.
pub fn smb1_reply(status: u32, flags2: u16) -> Vec<u8> {
    let mut reply = Vec::with_capacity(35);
    reply.extend_from_slice(b"\xffSMB");
    reply.push(0x72);
    reply.extend_from_slice(&status.to_le_bytes());
    reply.push(0x98);
    reply.extend_from_slice(&flags2.to_le_bytes());
    reply.extend_from_slice(&[0u8; 2 + 8 + 2]);
    reply.extend_from_slice(&0xffffu16.to_le_bytes());
    reply.extend_from_slice(&1u16.to_le_bytes());
    reply.extend_from_slice(&[0u8; 2 + 2 + 3]);
    reply
}

/// The leading part of an SMB2 NEGOTIATE response body.
pub fn smb2_negotiate_body(dialect: u16, guid: [u8; 16]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&65u16.to_le_bytes());
    body.extend_from_slice(&1u16.to_le_bytes());
    body.extend_from_slice(&dialect.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes());
    body.extend_from_slice(&guid);
    body
}

/// How the file server answers a session request.
#[derive(Clone)]
pub enum SessionAnswer {
    Accept,
    Reject(u8),
    /// SMB directly over TCP: no session request is expected.
    Direct,
}

async fn read_packet(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    let len = ((header[1] as usize) << 16) | u16::from_be_bytes([header[2], header[3]]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    (header[0], payload)
}

fn frame(packet_type: u8, payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u32;
    let mut framed = vec![packet_type, (len >> 16) as u8, (len >> 8) as u8, len as u8];
    framed.extend_from_slice(payload);
    framed
}

/// Serves a single connection: the session handshake, then one SMB exchange answered with `smb_reply`.
pub async fn spawn_file_server(answer: SessionAnswer, smb_reply: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let direct = matches!(answer, SessionAnswer::Direct);
        match answer {
            SessionAnswer::Accept => {
                let (packet_type, _) = read_packet(&mut stream).await;
                assert_eq!(packet_type, 0x81);
                stream.write_all(&frame(0x82, &[])).await.unwrap();
            }
            SessionAnswer::Reject(code) => {
                read_packet(&mut stream).await;
                stream.write_all(&frame(0x83, &[code])).await.unwrap();
                return;
            }
            SessionAnswer::Direct => {}
        }
        // Keep-alives sent by the client carry nothing to answer.
        let (packet_type, request) = loop {
            let packet = read_packet(&mut stream).await;
            if packet.0 != 0x85 {
                break packet;
            }
        };
        assert_eq!(packet_type, 0x00);
        assert_eq!(&request[..4], b"\xffSMB");
        if !direct {
            // A keep-alive first, which the client must skip.
            stream.write_all(&frame(0x85, &[])).await.unwrap();
        }
        stream.write_all(&frame(0x00, &smb_reply)).await.unwrap();
        // Wait for the client to hang up.
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
    });
    address
}

/// Answers every session request with a retarget to itself.
/// Returns the address and the number of connections accepted so far.
pub async fn spawn_retargeting_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let (packet_type, _) = read_packet(&mut stream).await;
            assert_eq!(packet_type, 0x81);
            let mut body = Ipv4Addr::LOCALHOST.octets().to_vec();
            body.extend_from_slice(&address.port().to_be_bytes());
            stream.write_all(&frame(0x84, &body)).await.unwrap();
        }
    });
    (address, connections)
}
