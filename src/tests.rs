// ABOUTME: End-to-end session tests against an in-process mock SMSC
// ABOUTME: Cover bind, send, receipt correlation, keep-alive and inbound error handling

//! End-to-end session tests against an in-process SMSC

use crate::billing::{BalanceAck, BillingError, BillingGateway, StatusReport};
use crate::client::{MessageStatus, SendRequest, Session, SessionState, SmppError};
use crate::codec::{Encodable, Frame};
use crate::config::Config;
use crate::datatypes::*;
use bytes::{Buf, BytesMut};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const WAIT: Duration = Duration::from_secs(5);

/// The SMSC side of one connection, driven step by step from the test body
struct MockSmsc {
    stream: TcpStream,
    buffer: BytesMut,
}

impl MockSmsc {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = listener.accept().await.unwrap();
        Self {
            stream,
            buffer: BytesMut::new(),
        }
    }

    async fn recv(&mut self) -> Frame {
        loop {
            let mut cursor = Cursor::new(&self.buffer[..]);
            if let Ok(length) = Frame::check(&mut cursor) {
                let frame = Frame::parse(&mut cursor).unwrap();
                self.buffer.advance(length);
                return frame;
            }
            let read = tokio::time::timeout(WAIT, self.stream.read_buf(&mut self.buffer))
                .await
                .expect("client went quiet")
                .unwrap();
            assert!(read > 0, "client closed the connection");
        }
    }

    async fn send<T: Encodable>(&mut self, pdu: &T) {
        self.stream.write_all(&pdu.to_bytes().unwrap()).await.unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    async fn accept_bind(&mut self) {
        match self.recv().await {
            Frame::BindTransceiver(bind) => {
                assert_eq!(bind.system_id, "test");
                assert_eq!(bind.password, "pw");
                self.send(&BindTransceiverResponse::new(bind.sequence_number, "MOCK"))
                    .await;
            }
            other => panic!("expected bind_transceiver, got {other:?}"),
        }
    }

    async fn recv_submit(&mut self) -> SubmitSm {
        match self.recv().await {
            Frame::SubmitSm(submit) => *submit,
            other => panic!("expected submit_sm, got {other:?}"),
        }
    }

    /// Send a text receipt and check the client acknowledges it
    async fn deliver_receipt(&mut self, sequence_number: u32, carrier_id: &str, stat: &str) {
        let text = format!(
            "id:{carrier_id} sub:001 dlvrd:001 submit date:2401011200 done date:2401011201 stat:{stat} err:000 text:Hi"
        );
        self.send(&DeliverSm::receipt(sequence_number, &text, vec![]))
            .await;
        self.expect_deliver_resp(sequence_number).await;
    }

    async fn expect_deliver_resp(&mut self, sequence_number: u32) {
        match self.recv().await {
            Frame::DeliverSmResp(resp) => assert_eq!(resp.sequence_number, sequence_number),
            other => panic!("expected deliver_sm_resp, got {other:?}"),
        }
    }

    async fn expect_closed(&mut self) {
        loop {
            let read = tokio::time::timeout(WAIT, self.stream.read_buf(&mut self.buffer))
                .await
                .expect("connection stayed open");
            match read {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }
}

#[derive(Clone, Default)]
struct RecordingBilling {
    price: f64,
    reports: Arc<Mutex<Vec<StatusReport>>>,
}

impl RecordingBilling {
    fn priced(price: f64) -> Self {
        Self {
            price,
            ..Default::default()
        }
    }

    async fn wait_for_reports(&self, count: usize) -> Vec<StatusReport> {
        for _ in 0..100 {
            let reports = self.reports.lock().unwrap().clone();
            if reports.len() >= count {
                return reports;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} billing reports");
    }
}

impl BillingGateway for RecordingBilling {
    async fn price_per_message(&self) -> Result<f64, BillingError> {
        Ok(self.price)
    }

    async fn report_status(&self, report: StatusReport) -> Result<BalanceAck, BillingError> {
        self.reports.lock().unwrap().push(report);
        Ok(BalanceAck::default())
    }
}

fn test_config(listener: &TcpListener) -> Config {
    let addr = listener.local_addr().unwrap();
    Config {
        host: addr.ip().to_string(),
        port: addr.port(),
        system_id: "test".to_string(),
        password: "pw".to_string(),
        source_address: "ACME".to_string(),
        bind_timeout: Duration::from_millis(500),
        read_timeout: Duration::from_millis(50),
        unbind_timeout: Duration::from_millis(500),
        delivery_timeout: Duration::from_secs(3),
        receipt_grace: Duration::from_millis(200),
        enquire_link_interval: Duration::ZERO,
        ..Config::default()
    }
}

async fn bound_session_with<B: BillingGateway>(
    config: Config,
    listener: &TcpListener,
    billing: B,
) -> (Arc<Session<B>>, MockSmsc) {
    let credentials = config.credentials();
    let session = Arc::new(Session::new(config, billing));

    let (bound, smsc) = tokio::join!(
        async {
            session.connect().await?;
            session.bind(&credentials).await
        },
        async {
            let mut smsc = MockSmsc::accept(listener).await;
            smsc.accept_bind().await;
            smsc
        }
    );
    bound.unwrap();
    assert_eq!(session.state(), SessionState::Bound);
    (session, smsc)
}

async fn bound_session(
    billing: RecordingBilling,
) -> (Arc<Session<RecordingBilling>>, MockSmsc, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = test_config(&listener);
    let (session, smsc) = bound_session_with(config, &listener, billing).await;
    (session, smsc, listener)
}

fn spawn_send<B: BillingGateway>(
    session: &Arc<Session<B>>,
    request: SendRequest,
) -> tokio::task::JoinHandle<Result<crate::client::SendOutcome, SmppError>> {
    let session = session.clone();
    tokio::spawn(async move { session.send(request).await })
}

#[tokio::test]
async fn single_message_delivered() {
    let billing = RecordingBilling::priced(0.7);
    let (session, mut smsc, _listener) = bound_session(billing.clone()).await;

    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));

    let submit = smsc.recv_submit().await;
    assert_eq!(submit.short_message.as_ref(), b"Hi");
    assert_eq!(submit.destination_addr, "523317953591");
    assert_eq!(submit.source_addr, "ACME");
    assert_eq!(submit.source_addr_ton, TypeOfNumber::Alphanumeric);
    assert_eq!(submit.dest_addr_ton, TypeOfNumber::International);
    assert_eq!(submit.registered_delivery, 1);
    assert!(!submit.esm_class.has_udhi());

    smsc.send(&SubmitSmResponse::new(submit.sequence_number, "ABC123"))
        .await;
    smsc.deliver_receipt(100, "ABC123", "DELIVRD").await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Delivered);
    assert_eq!(outcome.carrier_message_id.as_deref(), Some("ABC123"));
    assert_eq!(outcome.cost, 0.7);
    assert_eq!(outcome.segments, 1);
    assert!(outcome.delivery_confirmed);

    let reports = billing.wait_for_reports(2).await;
    let sent = reports.iter().find(|r| r.status == "SENT").unwrap();
    assert_eq!(sent.message_id, "ABC123");
    assert_eq!(sent.phone_number, "523317953591");
    assert_eq!(sent.message_cost, 0.7);
    let delivered = reports.iter().find(|r| r.status == "DELIVERED").unwrap();
    assert_eq!(delivered.message_cost, 0.0);

    session.close().await.unwrap();
}

#[tokio::test]
async fn receipt_arriving_before_response_still_delivers() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));

    let submit = smsc.recv_submit().await;
    smsc.deliver_receipt(7, "EARLY1", "DELIVRD").await;
    smsc.send(&SubmitSmResponse::new(submit.sequence_number, "EARLY1"))
        .await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Delivered);
    assert_eq!(outcome.carrier_message_id.as_deref(), Some("EARLY1"));
}

#[tokio::test]
async fn tlv_receipt_is_matched() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));

    let submit = smsc.recv_submit().await;
    smsc.send(&SubmitSmResponse::new(submit.sequence_number, "T1"))
        .await;
    let receipt = DeliverSm::receipt(
        50,
        "",
        vec![
            Tlv::cstring(Tlv::RECEIPTED_MESSAGE_ID, "T1"),
            Tlv::u8(Tlv::MESSAGE_STATE, 2),
        ],
    );
    smsc.send(&receipt).await;
    smsc.expect_deliver_resp(50).await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Delivered);
}

#[tokio::test]
async fn without_receipt_request_sent_is_final() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(
        &session,
        SendRequest::new("523317953591", "Hi").without_delivery_receipt(),
    );

    let submit = smsc.recv_submit().await;
    assert_eq!(submit.registered_delivery, 0);
    smsc.send(&SubmitSmResponse::new(submit.sequence_number, "NR1"))
        .await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Sent);
    assert!(!outcome.delivery_confirmed);
}

#[tokio::test]
async fn missing_receipt_times_out_as_sent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        delivery_timeout: Duration::from_millis(300),
        ..test_config(&listener)
    };
    let (session, mut smsc) =
        bound_session_with(config, &listener, RecordingBilling::default()).await;

    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));
    let submit = smsc.recv_submit().await;
    smsc.send(&SubmitSmResponse::new(submit.sequence_number, "SLOW1"))
        .await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Sent);
    assert_eq!(outcome.carrier_message_id.as_deref(), Some("SLOW1"));
    assert!(!outcome.delivery_confirmed);
}

#[tokio::test]
async fn missing_response_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        delivery_timeout: Duration::from_millis(300),
        ..test_config(&listener)
    };
    let (session, mut smsc) =
        bound_session_with(config, &listener, RecordingBilling::default()).await;

    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));
    smsc.recv_submit().await;

    let result = send.await.unwrap();
    assert!(matches!(result, Err(SmppError::Timeout(_))));
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn rejected_submit_fails_without_billing() {
    let billing = RecordingBilling::priced(0.7);
    let (session, mut smsc, _listener) = bound_session(billing.clone()).await;
    let send = spawn_send(&session, SendRequest::new("000", "Hi"));

    let submit = smsc.recv_submit().await;
    smsc.send(&SubmitSmResponse::error(
        submit.sequence_number,
        CommandStatus::InvalidDestinationAddress,
    ))
    .await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Failed);
    assert!(outcome.reason.is_some());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(billing.reports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn generic_nack_fails_the_submission() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));

    let submit = smsc.recv_submit().await;
    smsc.send(&GenericNack::system_error(submit.sequence_number))
        .await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Failed);
    assert!(outcome.reason.unwrap().contains("generic_nack"));
}

#[tokio::test]
async fn undeliverable_receipt_fails_the_message() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));

    let submit = smsc.recv_submit().await;
    smsc.send(&SubmitSmResponse::new(submit.sequence_number, "U1"))
        .await;
    smsc.deliver_receipt(3, "U1", "UNDELIV").await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Failed);
    assert_eq!(outcome.carrier_message_id.as_deref(), Some("U1"));
}

#[tokio::test]
async fn multipart_message_is_tracked_as_one() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::priced(1.0)).await;
    let text = "x".repeat(320);
    let send = spawn_send(&session, SendRequest::new("523317953591", text));

    let mut submits = Vec::new();
    for _ in 0..3 {
        submits.push(smsc.recv_submit().await);
    }
    let reference = submits[0].short_message[3];
    for (i, submit) in submits.iter().enumerate() {
        assert!(submit.esm_class.has_udhi());
        assert_eq!(
            &submit.short_message[..6],
            &[0x05, 0x00, 0x03, reference, 3, (i + 1) as u8]
        );
    }

    for (i, submit) in submits.iter().enumerate() {
        let id = format!("P{}", i + 1);
        smsc.send(&SubmitSmResponse::new(submit.sequence_number, &id))
            .await;
    }
    smsc.deliver_receipt(40, "P1", "DELIVRD").await;
    smsc.deliver_receipt(41, "P3", "DELIVRD").await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Delivered);
    assert_eq!(outcome.carrier_message_id.as_deref(), Some("P3"));
    assert_eq!(outcome.segments, 3);
    assert_eq!(outcome.cost, 1.0);
}

#[tokio::test]
async fn concurrent_sends_are_correlated_independently() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let first = spawn_send(&session, SendRequest::new("111", "one").without_delivery_receipt());
    let second = spawn_send(&session, SendRequest::new("222", "two").without_delivery_receipt());

    let a = smsc.recv_submit().await;
    let b = smsc.recv_submit().await;
    assert_ne!(a.sequence_number, b.sequence_number);

    // Answer in reverse order
    for submit in [&b, &a] {
        let id = format!("ID-{}", submit.destination_addr);
        smsc.send(&SubmitSmResponse::new(submit.sequence_number, &id))
            .await;
    }

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(first.carrier_message_id.as_deref(), Some("ID-111"));
    assert_eq!(second.carrier_message_id.as_deref(), Some("ID-222"));
}

#[tokio::test]
async fn close_unblocks_waiting_sender() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));
    smsc.recv_submit().await;

    let closer = {
        let session = session.clone();
        tokio::spawn(async move { session.close().await })
    };

    match smsc.recv().await {
        Frame::Unbind(unbind) => {
            smsc.send(&UnbindResponse::new(unbind.sequence_number)).await;
        }
        other => panic!("expected unbind, got {other:?}"),
    }

    closer.await.unwrap().unwrap();
    let result = send.await.unwrap();
    assert!(matches!(result, Err(SmppError::SessionClosed)));
    assert_eq!(session.state(), SessionState::Disconnected);
    smsc.expect_closed().await;

    // Closing twice is harmless
    session.close().await.unwrap();
}

#[tokio::test]
async fn connection_loss_fails_waiters_and_disconnects() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));
    smsc.recv_submit().await;

    drop(smsc);

    let result = send.await.unwrap();
    assert!(matches!(result, Err(SmppError::SessionClosed)));
    assert_eq!(session.state(), SessionState::Disconnected);

    let again = session.send(SendRequest::new("523317953591", "Hi")).await;
    assert!(matches!(again, Err(SmppError::SessionClosed)));
}

#[tokio::test]
async fn smsc_unbind_is_acknowledged() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;

    smsc.send(&Unbind::new(77)).await;
    match smsc.recv().await {
        Frame::UnbindResp(resp) => assert_eq!(resp.sequence_number, 77),
        other => panic!("expected unbind_resp, got {other:?}"),
    }
    smsc.expect_closed().await;
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn enquire_link_is_answered() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;

    smsc.send(&EnquireLink::new(55)).await;
    match smsc.recv().await {
        Frame::EnquireLinkResp(resp) => assert_eq!(resp.sequence_number, 55),
        other => panic!("expected enquire_link_resp, got {other:?}"),
    }
    session.close().await.unwrap();
}

#[tokio::test]
async fn idle_session_sends_enquire_link() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        enquire_link_interval: Duration::from_millis(100),
        ..test_config(&listener)
    };
    let (session, mut smsc) =
        bound_session_with(config, &listener, RecordingBilling::default()).await;

    match smsc.recv().await {
        Frame::EnquireLink(ping) => {
            smsc.send(&EnquireLinkResponse::new(ping.sequence_number)).await;
        }
        other => panic!("expected enquire_link, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn malformed_frame_does_not_stop_the_listener() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;

    // enquire_link carrying a body it must not have
    smsc.send_raw(&[
        0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x02, 0xDE, 0xAD, 0xBE, 0xEF,
    ])
    .await;
    smsc.send(&EnquireLink::new(3)).await;

    match smsc.recv().await {
        Frame::GenericNack(nack) => {
            assert_eq!(nack.sequence_number, 2);
            assert!(!nack.command_status.is_ok());
        }
        other => panic!("expected generic_nack, got {other:?}"),
    }
    match smsc.recv().await {
        Frame::EnquireLinkResp(resp) => assert_eq!(resp.sequence_number, 3),
        other => panic!("expected enquire_link_resp, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn deliver_sm_with_latin1_sender_is_acknowledged() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;

    let mut mo = DeliverSm::receipt(77, "hola", vec![]);
    mo.esm_class = EsmClass::new(0);
    mo.source_addr = "Cafe".to_string();
    let mut bytes = mo.to_bytes().unwrap().to_vec();
    let at = bytes.windows(5).position(|w| w == b"Cafe\0").unwrap();
    bytes[at + 3] = 0xE9;

    smsc.send_raw(&bytes).await;
    smsc.expect_deliver_resp(77).await;
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn undecodable_deliver_sm_is_still_acknowledged() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;

    // sm_length promises five octets, only three follow
    let mut mo = DeliverSm::receipt(78, "hello", vec![]);
    mo.esm_class = EsmClass::new(0);
    let mut bytes = mo.to_bytes().unwrap().to_vec();
    bytes.truncate(bytes.len() - 2);
    let length = bytes.len() as u32;
    bytes[0..4].copy_from_slice(&length.to_be_bytes());

    smsc.send_raw(&bytes).await;
    smsc.expect_deliver_resp(78).await;

    // and the session carries on
    smsc.send(&EnquireLink::new(79)).await;
    match smsc.recv().await {
        Frame::EnquireLinkResp(resp) => assert_eq!(resp.sequence_number, 79),
        other => panic!("expected enquire_link_resp, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn message_id_without_terminator_is_accepted() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));

    let submit = smsc.recv_submit().await;
    let mut resp = vec![0x00, 0x00, 0x00, 0x16, 0x80, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00];
    resp.extend_from_slice(&submit.sequence_number.to_be_bytes());
    resp.extend_from_slice(b"ABC123");
    smsc.send_raw(&resp).await;
    smsc.deliver_receipt(80, "ABC123", "DELIVRD").await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Delivered);
    assert_eq!(outcome.carrier_message_id.as_deref(), Some("ABC123"));
}

#[tokio::test]
async fn unreadable_error_response_still_fails_the_submission() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;
    let send = spawn_send(&session, SendRequest::new("523317953591", "Hi"));

    let submit = smsc.recv_submit().await;
    // throttled, with a message_id longer than the field allows
    let mut resp = vec![0x00, 0x00, 0x00, 0x5A, 0x80, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x58];
    resp.extend_from_slice(&submit.sequence_number.to_be_bytes());
    resp.extend_from_slice(&[b'X'; 74]);
    smsc.send_raw(&resp).await;

    let outcome = send.await.unwrap().unwrap();
    assert_eq!(outcome.status, MessageStatus::Failed);
}

#[tokio::test]
async fn unsupported_request_gets_generic_nack() {
    let (_session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;

    // query_sm, which a transceiver client does not serve
    smsc.send_raw(&[
        0x00, 0x00, 0x00, 0x15, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x09, b'1', 0x00, 0x00, 0x00, 0x00,
    ])
    .await;

    match smsc.recv().await {
        Frame::GenericNack(nack) => {
            assert_eq!(nack.sequence_number, 9);
            assert_eq!(nack.command_status, CommandStatus::InvalidCommandId);
        }
        other => panic!("expected generic_nack, got {other:?}"),
    }
}

#[tokio::test]
async fn mobile_originated_message_is_acknowledged() {
    let (session, mut smsc, _listener) = bound_session(RecordingBilling::default()).await;

    let mut mo = DeliverSm::receipt(12, "hello there", vec![]);
    mo.esm_class = EsmClass::new(0);
    mo.source_addr = "523317953591".to_string();
    smsc.send(&mo).await;
    smsc.expect_deliver_resp(12).await;

    // Receipts for unknown ids are acknowledged too
    smsc.deliver_receipt(13, "NOBODY", "DELIVRD").await;
    assert_eq!(session.state(), SessionState::Bound);
}

#[tokio::test]
async fn rejected_bind_disconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = test_config(&listener);
    let credentials = config.credentials();
    let session = Session::new(config, RecordingBilling::default());

    let (bound, _smsc) = tokio::join!(
        async {
            session.connect().await?;
            session.bind(&credentials).await
        },
        async {
            let mut smsc = MockSmsc::accept(&listener).await;
            let Frame::BindTransceiver(bind) = smsc.recv().await else {
                panic!("expected bind_transceiver");
            };
            smsc.send(&BindTransceiverResponse::error(
                bind.sequence_number,
                CommandStatus::InvalidPassword,
            ))
            .await;
            smsc
        }
    );

    assert!(matches!(bound, Err(SmppError::Bind(_))));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn unanswered_bind_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = test_config(&listener);
    let credentials = config.credentials();
    let session = Session::new(config, RecordingBilling::default());

    let (bound, _smsc) = tokio::join!(
        async {
            session.connect().await?;
            session.bind(&credentials).await
        },
        async {
            let mut smsc = MockSmsc::accept(&listener).await;
            smsc.recv().await;
            smsc
        }
    );

    match bound {
        Err(SmppError::Bind(reason)) => assert!(reason.contains("no bind_transceiver_resp")),
        other => panic!("expected bind timeout, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn unreachable_smsc_is_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = test_config(&listener);
    drop(listener);

    let session = Session::new(config, RecordingBilling::default());
    assert!(matches!(session.connect().await, Err(SmppError::Connect { .. })));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn text_too_long_is_rejected_before_submit() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        max_message_length: 10,
        ..test_config(&listener)
    };
    let (session, _smsc) =
        bound_session_with(config, &listener, RecordingBilling::default()).await;

    let result = session
        .send(SendRequest::new("523317953591", "far too long for the limit"))
        .await;
    assert!(matches!(result, Err(SmppError::Encoding(_))));
}
