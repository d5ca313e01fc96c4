//! Integration tests for the relay server and the ping client
//!
//! These tests validate cross-component interactions and real network behavior.

use server::clock::ManualClock;
use server::config::ServerConfig;
use server::connections::Connections;
use server::network::Server;
use shared::{Message, HEADER_SIZE, MAX_DATAGRAM_SIZE, MAX_TIMESTAMP};
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests the exact byte layout a ping travels in
    #[test]
    fn ping_wire_layout() {
        let ping = Message::new(0x0102_0304_0506_0708, b'A').unwrap();
        let bytes = ping.encode().unwrap();

        assert_eq!(bytes, vec![1, 2, 3, 4, 5, 6, 7, 8, b'A']);
        assert_eq!(bytes.len(), HEADER_SIZE);
    }

    /// Tests that the timestamp bound is enforced on both sides
    #[test]
    fn timestamp_bound_is_shared() {
        assert!(Message::new(MAX_TIMESTAMP, b'x').is_ok());
        assert!(Message::new(MAX_TIMESTAMP + 1, b'x').is_err());

        assert_eq!(
            client::args::parse_timestamp("71697398399"),
            Ok(MAX_TIMESTAMP)
        );
        assert!(client::args::parse_timestamp("71697398400").is_err());

        let mut raw = (MAX_TIMESTAMP + 1).to_be_bytes().to_vec();
        raw.push(b'x');
        assert!(Message::decode(&raw).is_err());
    }

    /// Tests malformed datagram rejection
    #[test]
    fn malformed_datagram_handling() {
        assert!(Message::decode(&[]).is_err());
        assert!(Message::decode(&[0; HEADER_SIZE - 1]).is_err());
        assert!(Message::decode(&vec![0; MAX_DATAGRAM_SIZE + 1]).is_err());

        let largest = Message::decode(&vec![0; MAX_DATAGRAM_SIZE]).unwrap();
        assert_eq!(largest.text().len(), MAX_DATAGRAM_SIZE - HEADER_SIZE);
    }

    /// Tests a message surviving a real UDP hop
    #[test]
    fn udp_socket_communication() {
        let receiver = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind receiver socket");
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind sender socket");

        let message = Message::with_text(1_500_000_000, b'q', " hello world").unwrap();
        sender
            .send_to(&message.encode().unwrap(), receiver.local_addr().unwrap())
            .unwrap();

        let mut buf = vec![0; MAX_DATAGRAM_SIZE + 1];
        let (size, _) = receiver.recv_from(&mut buf).unwrap();
        let received = Message::decode(&buf[..size]).unwrap();

        assert_eq!(received, message);
        assert_eq!(received.to_string(), "1500000000 q  hello world");
    }
}

/// CONNECTION TRACKER TESTS
mod tracker_tests {
    use super::*;

    /// Tests a client's broadcast window from first ping to expiry
    #[test]
    fn broadcast_window_lifecycle() {
        let client: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let mut connections = Connections::new(120);

        connections.add_client(client, 1_000);
        assert_eq!(connections.get_clients(1_050, None), vec![client]);
        assert_eq!(connections.get_clients(1_120, None), vec![client]);

        assert!(connections.get_clients(1_121, None).is_empty());
        assert!(connections.is_empty());
    }

    /// Tests that a late ping starts a fresh window after expiry
    #[test]
    fn returning_client_is_tracked_again() {
        let client: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let mut connections = Connections::new(120);

        connections.add_client(client, 1_000);
        assert!(connections.get_clients(1_500, None).is_empty());

        connections.add_client(client, 1_500);
        assert_eq!(connections.get_clients(1_600, None), vec![client]);
        assert_eq!(connections.len(), 1);
    }
}

/// CLIENT TESTS
mod client_tests {
    use super::*;

    /// Tests host name resolution through the client library
    #[test]
    fn client_resolves_localhost() {
        let client = tokio_test::block_on(client::Client::new("localhost", 20160)).unwrap();
        assert!(client.server_addr().ip().is_loopback());
        assert_eq!(client.server_addr().port(), 20160);
    }

    /// Tests that a ping sent by the client library decodes on the other end
    #[test]
    fn client_ping_decodes() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        tokio_test::block_on(async {
            let client = client::Client::new("127.0.0.1", port).await.unwrap();
            client
                .ping(&Message::new(MAX_TIMESTAMP, b'#').unwrap())
                .await
                .unwrap();
        });

        let mut buf = [0u8; 64];
        let (size, _) = receiver.recv_from(&mut buf).unwrap();
        let ping = Message::decode(&buf[..size]).unwrap();
        assert_eq!(ping.timestamp(), MAX_TIMESTAMP);
        assert_eq!(ping.character(), b'#');
        assert!(ping.text().is_empty());
    }
}

/// RELAY SERVER TESTS
mod relay_tests {
    use super::*;
    use server::shutdown::ShutdownHandle;
    use std::thread::JoinHandle;

    struct RunningServer {
        addr: SocketAddr,
        clock: ManualClock,
        handle: ShutdownHandle,
        worker: JoinHandle<Result<(), server::ServerError>>,
    }

    impl RunningServer {
        fn start(broadcast: &[u8]) -> Self {
            let mut config = ServerConfig::new(0, broadcast);
            config.host = "127.0.0.1".parse().unwrap();

            let clock = ManualClock::new(1_000);
            let mut server = Server::with_clock(config, clock.clone()).unwrap();
            let addr = server.local_addr().unwrap();
            let handle = server.shutdown_handle();
            let worker = thread::spawn(move || server.run());

            RunningServer {
                addr,
                clock,
                handle,
                worker,
            }
        }

        fn stop(self) {
            self.handle.stop();
            assert!(self.worker.join().unwrap().is_ok());
        }
    }

    fn client_socket(read_timeout: Duration) -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(read_timeout)).unwrap();
        socket
    }

    fn try_receive(socket: &UdpSocket) -> Option<Message> {
        let mut buf = vec![0; MAX_DATAGRAM_SIZE + 1];
        let (size, _) = socket.recv_from(&mut buf).ok()?;
        Message::decode(&buf[..size]).ok()
    }

    /// Tests that text carried by a ping is not relayed
    #[test]
    fn relayed_text_is_broadcast_only() {
        let server = RunningServer::start(b" motd");
        let a = client_socket(Duration::from_secs(2));

        let with_text = Message::with_text(5, b'a', "client text").unwrap();
        a.send_to(&with_text.encode().unwrap(), server.addr).unwrap();

        let relayed = try_receive(&a).unwrap();
        assert_eq!(relayed.character(), b'a');
        assert_eq!(relayed.text(), b" motd");

        server.stop();
    }

    /// Tests that every client present at arrival gets the relay
    #[test]
    fn relays_to_all_present_clients() {
        let server = RunningServer::start(b" motd");
        let a = client_socket(Duration::from_secs(2));
        let b = client_socket(Duration::from_secs(2));

        a.send_to(&Message::new(1, b'a').unwrap().encode().unwrap(), server.addr)
            .unwrap();
        assert_eq!(try_receive(&a).unwrap().character(), b'a');

        b.send_to(&Message::new(2, b'b').unwrap().encode().unwrap(), server.addr)
            .unwrap();
        for socket in [&a, &b] {
            let relayed = try_receive(socket).unwrap();
            assert_eq!(relayed.timestamp(), 2);
            assert_eq!(relayed.character(), b'b');
            assert_eq!(relayed.text(), b" motd");
        }

        server.stop();
    }

    /// Tests that a client whose window lapsed no longer receives relays
    #[test]
    fn expired_client_receives_nothing() {
        let server = RunningServer::start(b"");
        let a = client_socket(Duration::from_millis(300));
        let b = client_socket(Duration::from_secs(2));

        a.send_to(&Message::new(1, b'a').unwrap().encode().unwrap(), server.addr)
            .unwrap();
        assert!(try_receive(&a).is_some());

        server.clock.set(1_200);
        b.send_to(&Message::new(2, b'b').unwrap().encode().unwrap(), server.addr)
            .unwrap();

        assert_eq!(try_receive(&b).unwrap().character(), b'b');
        assert!(try_receive(&a).is_none());

        server.stop();
    }

    /// Tests that a malformed datagram still registers its sender
    #[test]
    fn malformed_datagram_registers_presence() {
        let server = RunningServer::start(b"");
        let listener = client_socket(Duration::from_secs(2));
        let talker = client_socket(Duration::from_secs(2));

        listener.send_to(&[0xff; 3], server.addr).unwrap();
        // Let the server register the listener first.
        thread::sleep(Duration::from_millis(50));

        talker
            .send_to(&Message::new(9, b't').unwrap().encode().unwrap(), server.addr)
            .unwrap();

        assert_eq!(try_receive(&listener).unwrap().character(), b't');
        assert_eq!(try_receive(&talker).unwrap().character(), b't');

        server.stop();
    }

    /// Tests the client library against a running server
    #[tokio::test]
    async fn client_receives_own_relay() {
        let server = RunningServer::start(b" welcome");
        let client = client::Client::new("127.0.0.1", server.addr.port())
            .await
            .unwrap();

        client
            .ping(&Message::new(1_700_000_000, b'c').unwrap())
            .await
            .unwrap();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let mut stop_tx = Some(stop_tx);
        let mut received = Vec::new();

        tokio::time::timeout(
            Duration::from_secs(2),
            client.listen(
                async move {
                    let _ = stop_rx.await;
                },
                |message| {
                    received.push(message);
                    if let Some(tx) = stop_tx.take() {
                        let _ = tx.send(());
                    }
                },
            ),
        )
        .await
        .expect("no relay received");

        assert_eq!(
            received,
            vec![Message::with_text(1_700_000_000, b'c', " welcome").unwrap()]
        );

        server.stop();
    }
}
