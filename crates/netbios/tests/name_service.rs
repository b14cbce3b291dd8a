#![cfg(feature = "async")]

mod common;

use std::net::Ipv4Addr;

use common::*;
use netbios::*;
use netbios_tests::hex_to_u8_array;

#[test_log::test(tokio::test)]
async fn test_resolve_via_wins_and_cache() {
    let responder =
        NsResponder::spawn(|request| Some(positive_answer(request, Ipv4Addr::new(10, 1, 2, 3), 300)))
            .await;
    let client = Client::new(responder.config());

    let address = client
        .resolve("filesrv", NameSuffix::FILE_SERVER)
        .await
        .unwrap();
    assert_eq!(address, Ipv4Addr::new(10, 1, 2, 3));
    assert_eq!(responder.query_count(), 1);

    // Served from the cache.
    let again = client.resolve("FILESRV", NameSuffix::FILE_SERVER).await;
    assert_eq!(again.unwrap(), address);
    assert_eq!(responder.query_count(), 1);

    client.name_service().cache_clear();
    client.resolve("FILESRV", NameSuffix::FILE_SERVER).await.unwrap();
    assert_eq!(responder.query_count(), 2);
}

#[test_log::test(tokio::test)]
async fn test_resolve_negative_answer_is_generic() {
    let responder = NsResponder::spawn(|request| Some(negative_answer(request))).await;
    let client = Client::new(responder.config());

    let result = client.resolve("NOBODY", NameSuffix::FILE_SERVER).await;
    assert!(matches!(result, Err(Error::NameNotFound(_))));
    assert_eq!(ResultCode::classify(&result), ResultCode::GenericError);
}

/// WINS and broadcast both pointed at one loopback responder.
fn wins_and_broadcast_config(responder: &NsResponder) -> ClientConfig {
    let mut config = responder.config();
    config.name_service.broadcast = true;
    config.name_service.broadcast_address = Ipv4Addr::LOCALHOST;
    config
}

#[test_log::test(tokio::test)]
async fn test_resolve_falls_back_to_broadcast() {
    let responder = NsResponder::spawn(|request| {
        if request.flags.broadcast() {
            Some(positive_answer(request, Ipv4Addr::new(10, 1, 2, 4), 60))
        } else {
            None
        }
    })
    .await;
    let client = Client::new(wins_and_broadcast_config(&responder));

    let address = client.resolve("PRINTSRV", NameSuffix::FILE_SERVER).await;
    assert_eq!(address.unwrap(), Ipv4Addr::new(10, 1, 2, 4));
    assert_eq!(responder.query_count(), 2);
}

#[test_log::test(tokio::test)]
async fn test_wins_negative_answer_outranks_broadcast_timeout() {
    let responder = NsResponder::spawn(|request| {
        if request.flags.broadcast() {
            None
        } else {
            Some(negative_answer(request))
        }
    })
    .await;
    let client = Client::new(wins_and_broadcast_config(&responder));

    let result = client.resolve("NOBODY", NameSuffix::FILE_SERVER).await;
    assert!(matches!(result, Err(Error::NameNotFound(_))));
    assert_eq!(ResultCode::classify(&result), ResultCode::GenericError);
    assert_eq!(responder.query_count(), 2);
}

#[test_log::test(tokio::test)]
async fn test_resolve_unreachable_is_network_error() {
    // Bound, but never answers.
    let silent = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let client = Client::new(config_for_wins(silent.local_addr().unwrap().port()));

    let first = client.resolve("FILESRV", NameSuffix::FILE_SERVER).await;
    assert_eq!(ResultCode::classify(&first), ResultCode::NetworkError);
    let second = client.resolve("FILESRV", NameSuffix::FILE_SERVER).await;
    assert_eq!(ResultCode::classify(&second), ResultCode::classify(&first));
}

#[test_log::test(tokio::test)]
async fn test_resolve_invalid_names() {
    let client = Client::new(config_for_wins(9));

    let result = client.resolve("caf\u{e9}", NameSuffix::FILE_SERVER).await;
    assert_eq!(ResultCode::classify(&result), ResultCode::CharsetError);

    let result = client
        .resolve("A-NAME-THAT-IS-TOO-LONG", NameSuffix::FILE_SERVER)
        .await;
    assert_eq!(ResultCode::classify(&result), ResultCode::GenericError);
}

#[test_log::test(tokio::test)]
async fn test_node_status_and_inverse() {
    let responder = NsResponder::spawn(|request| {
        assert_eq!(request.questions[0].question_type, RecordType::NbStat);
        Some(node_status_answer(request, encode(&sample_node_status())))
    })
    .await;
    let client = Client::new(responder.config());

    let status = client.node_status(Ipv4Addr::LOCALHOST).await.unwrap();
    assert_eq!(status.names.len(), 3);
    assert_eq!(status.mac_address(), Some([0x52, 0x54, 0x00, 0x12, 0x34, 0x56]));

    let name = client
        .inverse(Ipv4Addr::LOCALHOST, NameSuffix::FILE_SERVER)
        .await
        .unwrap();
    assert_eq!(name, "FILESRV");

    let missing = client
        .inverse(Ipv4Addr::LOCALHOST, NameSuffix::MESSENGER)
        .await;
    assert!(matches!(missing, Err(Error::NameNotFound(_))));
}

#[test_log::test(tokio::test)]
async fn test_node_status_with_undecodable_name_is_charset_error() {
    let responder = NsResponder::spawn(|request| {
        let rdata = hex_to_u8_array! { "01 48c94f53542020202020202020202000 0400 000000000000" };
        Some(node_status_answer(request, rdata.to_vec()))
    })
    .await;
    let client = Client::new(responder.config());

    let result = client.node_status(Ipv4Addr::LOCALHOST).await;
    assert_eq!(ResultCode::classify(&result), ResultCode::CharsetError);
}

#[test_log::test(tokio::test)]
async fn test_missing_socket_capability() {
    let config = ClientConfig {
        capabilities: Some(PlatformCapabilities::none()),
        ..config_for_wins(9)
    };
    let client = Client::new(config);
    let result = client.resolve("FILESRV", NameSuffix::FILE_SERVER).await;
    assert!(matches!(result, Err(Error::Unsupported(_))));
    assert_eq!(ResultCode::classify(&result), ResultCode::GenericError);
}
