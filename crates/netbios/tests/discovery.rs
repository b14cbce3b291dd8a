#![cfg(feature = "async")]

mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use common::*;
use netbios::*;

async fn spawn_host() -> NsResponder {
    NsResponder::spawn(|request| match request.questions[0].question_type {
        RecordType::Nb => {
            assert!(request.flags.broadcast());
            assert!(request.questions[0].name.name.is_wildcard());
            Some(positive_answer(request, Ipv4Addr::LOCALHOST, 0))
        }
        RecordType::NbStat => Some(node_status_answer(request, encode(&sample_node_status()))),
        _ => None,
    })
    .await
}

fn discovery_config(port: u16) -> NameServiceConfig {
    NameServiceConfig {
        broadcast: true,
        broadcast_address: Ipv4Addr::LOCALHOST,
        ..config_for_wins(port).name_service
    }
}

#[test_log::test(tokio::test)]
async fn test_discover_lists_responders() {
    let host = spawn_host().await;
    let ns = NameService::new(discovery_config(host.port), PlatformCapabilities::current());

    let entries = ns.discover(Duration::from_millis(300)).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.address, Ipv4Addr::LOCALHOST);
    assert_eq!(entry.name, "FILESRV");
    assert_eq!(entry.suffix, NameSuffix::FILE_SERVER);
    assert_eq!(entry.group.as_deref(), Some("WORKGROUP"));
    assert_eq!(entry.mac_string().as_deref(), Some("52:54:00:12:34:56"));
}

#[test_log::test(tokio::test)]
async fn test_discoverer_poll_reports_new_hosts_once() {
    let host = spawn_host().await;
    let ns = NameService::new(discovery_config(host.port), PlatformCapabilities::current());
    let mut discoverer = Discoverer::new(Duration::from_millis(200), Duration::from_secs(60));

    let events = discoverer.poll(&ns).await.unwrap();
    assert!(matches!(events.as_slice(), [DiscoveryEvent::Added(e)] if e.name == "FILESRV"));
    let events = discoverer.poll(&ns).await.unwrap();
    assert!(events.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_discover_with_nobody_listening() {
    let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let ns = NameService::new(
        discovery_config(silent.local_addr().unwrap().port()),
        PlatformCapabilities::current(),
    );
    let entries = ns.discover(Duration::from_millis(100)).await.unwrap();
    assert!(entries.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_discover_refused_when_broadcast_disabled() {
    let host = spawn_host().await;
    let ns = NameService::new(
        NameServiceConfig {
            broadcast: false,
            ..discovery_config(host.port)
        },
        PlatformCapabilities::current(),
    );

    let result = ns.discover(Duration::from_millis(200)).await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert_eq!(ResultCode::classify(&result), ResultCode::GenericError);
    assert_eq!(host.query_count(), 0);
}
