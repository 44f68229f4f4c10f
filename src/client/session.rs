// ABOUTME: Transceiver session with connect, bind, send and close
// ABOUTME: Encodes, prices, submits and waits for each message's final status

//! Transceiver session with an SMSC. The listener task shares its writer
//! and correlator through `Shared`.

use crate::billing::{self, BillingGateway, StatusReport};
use crate::client::correlator::{Correlator, PendingHandle, Registration, StatusChange};
use crate::client::error::{SmppError, SmppResult};
use crate::client::keepalive::KeepAliveConfig;
use crate::client::listener;
use crate::client::sequence::SequenceGenerator;
use crate::client::types::{BindCredentials, SendOutcome, SendRequest, SessionState};
use crate::codec::{Encodable, Frame};
use crate::config::Config;
use crate::connection::{Connection, FrameReader, FrameWriter};
use crate::datatypes::{
    BindTransceiver, EnquireLinkResponse, EsmClass, NumericPlanIndicator, SubmitSm, TypeOfNumber,
    Unbind,
};
use crate::encoder::{Encoder, Segment};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Per-submission options for [`Session::submit`]
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Falls back to the configured source address
    pub source_address: Option<String>,
    pub request_delivery_receipt: bool,
    /// Reported to billing when the message is accepted
    pub cost: f64,
}

/// State shared between the session handle and its listener task
pub(crate) struct Shared<B> {
    state: Mutex<SessionState>,
    writer: tokio::sync::Mutex<Option<FrameWriter>>,
    pub(crate) sequence: SequenceGenerator,
    pub(crate) correlator: Correlator,
    billing: Arc<B>,
    billing_timeout: Duration,
    stop: AtomicBool,
    pub(crate) unbound: Notify,
    pub(crate) read_timeout: Duration,
}

impl<B: BillingGateway> Shared<B> {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.lock_state()
    }

    fn set_state(&self, state: SessionState) {
        let mut current = self.lock_state();
        let previous = *current;
        if previous != state {
            *current = state;
            info!(from = %previous, to = %state, "session state changed");
        }
    }

    pub(crate) fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Write one PDU under the writer lock
    pub(crate) async fn write<T: Encodable>(&self, pdu: &T) -> SmppResult<()> {
        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(SmppError::SessionClosed);
        };
        writer.write_frame(pdu).await
    }

    /// Write PDUs back to back without interleaving other writers
    async fn write_all<T: Encodable>(&self, pdus: &[T]) -> SmppResult<()> {
        let mut writer = self.writer.lock().await;
        let Some(writer) = writer.as_mut() else {
            return Err(SmppError::SessionClosed);
        };
        for pdu in pdus {
            writer.write_frame(pdu).await?;
        }
        Ok(())
    }

    /// Tear the session down: stop the listener, wake every waiter with
    /// `SessionClosed` and close the socket. Safe to call more than once.
    pub(crate) async fn terminate(&self) {
        self.stop.store(true, Ordering::Release);
        self.set_state(SessionState::Disconnected);
        self.correlator.close_all();

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "socket shutdown failed");
            }
        }
    }

    /// Tell billing about a status change without holding up the caller
    pub(crate) fn report(&self, change: StatusChange) {
        let gateway = self.billing.clone();
        let timeout = self.billing_timeout;
        let request_id = change.request_id;
        let report = StatusReport {
            message_id: change.carrier_message_id,
            status: change.status.as_str().to_string(),
            phone_number: change.destination,
            message_cost: change.cost,
        };

        tokio::spawn(async move {
            match billing::within(timeout, gateway.report_status(report)).await {
                Ok(ack) => {
                    debug!(request_id, new_balance = ?ack.new_balance, "billing updated")
                }
                Err(e) => {
                    let e = SmppError::BillingUnavailable(e);
                    warn!(request_id, error = %e, "billing update failed");
                }
            }
        });
    }
}

/// A transceiver session with one SMSC.
///
/// `Disconnected -> Connected -> Bound -> Disconnected`. A session is used
/// for one connection only; after [`Session::close`], or after the SMSC drops
/// the link, build a new one. Every method takes `&self`, so a bound session
/// can be shared between tasks sending concurrently.
pub struct Session<B: BillingGateway> {
    config: Config,
    encoder: Encoder,
    keepalive: KeepAliveConfig,
    shared: Arc<Shared<B>>,
    // Held between connect and bind, then handed to the listener
    reader: Mutex<Option<FrameReader>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    closing: AtomicBool,
}

impl<B: BillingGateway> Session<B> {
    pub fn new(config: Config, billing: B) -> Self {
        let billing_timeout = config
            .billing
            .as_ref()
            .map_or(Duration::from_secs(5), |b| b.timeout);

        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState::Disconnected),
            writer: tokio::sync::Mutex::new(None),
            sequence: SequenceGenerator::new(),
            correlator: Correlator::new(config.receipt_grace),
            billing: Arc::new(billing),
            billing_timeout,
            stop: AtomicBool::new(false),
            unbound: Notify::new(),
            read_timeout: config.read_timeout,
        });

        Self {
            encoder: Encoder::new(config.max_message_length),
            keepalive: config.keepalive(),
            config,
            shared,
            reader: Mutex::new(None),
            listener: Mutex::new(None),
            closing: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the TCP connection. Leaves the session `Disconnected` on failure.
    pub async fn connect(&self) -> SmppResult<()> {
        if self.shared.is_stopping() {
            return Err(SmppError::InvalidState(
                "session was closed, create a new one".to_string(),
            ));
        }
        if self.state() != SessionState::Disconnected {
            return Err(SmppError::InvalidState(format!(
                "connect while {}",
                self.state()
            )));
        }

        let addr = self.config.addr();
        let connection = Connection::connect(addr.as_str(), self.config.connect_timeout).await?;
        let (reader, writer) = connection.into_split();

        *self.shared.writer.lock().await = Some(writer);
        *lock(&self.reader) = Some(reader);
        self.shared.set_state(SessionState::Connected);
        info!(addr = %addr, "connected to SMSC");
        Ok(())
    }

    /// Bind as transceiver and start the listener.
    ///
    /// A rejected or unanswered bind closes the connection and leaves the
    /// session `Disconnected`.
    pub async fn bind(&self, credentials: &BindCredentials) -> SmppResult<()> {
        if self.state() != SessionState::Connected {
            return Err(SmppError::InvalidState(format!("bind while {}", self.state())));
        }
        let Some(mut reader) = lock(&self.reader).take() else {
            return Err(SmppError::InvalidState("bind already in progress".to_string()));
        };

        let sequence_number = self.shared.sequence.next();
        let pdu = BindTransceiver::builder()
            .sequence_number(sequence_number)
            .system_id(&credentials.system_id)
            .password(&credentials.password)
            .system_type(&credentials.system_type)
            .interface_version(credentials.interface_version)
            .build()
            .map_err(|e| SmppError::Bind(e.to_string()));

        let result = match pdu {
            Ok(pdu) => self.exchange_bind(&mut reader, &pdu).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(smsc_id) => {
                self.shared.set_state(SessionState::Bound);
                info!(system_id = %credentials.system_id, smsc = %smsc_id, "bound as transceiver");
                let handle = tokio::spawn(listener::run(
                    self.shared.clone(),
                    reader,
                    self.keepalive.clone(),
                ));
                *lock(&self.listener) = Some(handle);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "bind failed");
                self.shared.terminate().await;
                Err(e)
            }
        }
    }

    async fn exchange_bind(
        &self,
        reader: &mut FrameReader,
        pdu: &BindTransceiver,
    ) -> SmppResult<String> {
        self.shared
            .write(pdu)
            .await
            .map_err(|e| SmppError::Bind(e.to_string()))?;

        let deadline = Instant::now() + self.config.bind_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(bind_timeout(self.config.bind_timeout));
            }

            match reader.read_frame(remaining).await {
                Ok(Frame::BindTransceiverResp(resp))
                    if resp.sequence_number == pdu.sequence_number =>
                {
                    if resp.command_status.is_ok() {
                        return Ok(resp.system_id);
                    }
                    return Err(SmppError::Bind(format!(
                        "rejected by SMSC: {}",
                        resp.command_status
                    )));
                }
                Ok(Frame::GenericNack(nack)) if nack.sequence_number == pdu.sequence_number => {
                    return Err(SmppError::Bind(format!(
                        "generic_nack: {}",
                        nack.command_status
                    )));
                }
                Ok(Frame::Malformed { header, error })
                    if header.sequence_number == pdu.sequence_number =>
                {
                    return Err(SmppError::Bind(format!(
                        "unreadable {:?} ({}): {error}",
                        header.command_id, header.command_status
                    )));
                }
                Ok(Frame::EnquireLink(ping)) => {
                    self.shared
                        .write(&EnquireLinkResponse::new(ping.sequence_number))
                        .await?;
                }
                Ok(frame) => {
                    debug!(command = ?frame.command_id(), "ignoring frame while binding");
                }
                Err(SmppError::Timeout(_)) => {
                    return Err(bind_timeout(self.config.bind_timeout));
                }
                Err(SmppError::Protocol(reason)) => {
                    warn!(reason = %reason, "malformed frame while binding");
                }
                Err(e) => return Err(SmppError::Bind(e.to_string())),
            }
        }
    }

    /// Write the submit_sm PDUs for one logical message and register it.
    ///
    /// The entry is registered before anything is written, so a response
    /// can never beat its registration.
    pub async fn submit(
        &self,
        destination: &str,
        segments: &[Segment],
        options: SubmitOptions,
    ) -> SmppResult<PendingHandle> {
        self.ensure_bound()?;

        let source = options
            .source_address
            .as_deref()
            .unwrap_or(&self.config.source_address);
        let sequence_numbers: Vec<u32> =
            segments.iter().map(|_| self.shared.sequence.next()).collect();

        let pdus = segments
            .iter()
            .zip(&sequence_numbers)
            .map(|(segment, &sequence_number)| {
                build_submit(
                    sequence_number,
                    source,
                    destination,
                    segment,
                    options.request_delivery_receipt,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let handle = self.shared.correlator.register(Registration {
            destination: destination.to_string(),
            sequence_numbers: sequence_numbers.clone(),
            receipt_requested: options.request_delivery_receipt,
            cost: options.cost,
        })?;

        if let Err(e) = self.shared.write_all(&pdus).await {
            self.shared.correlator.remove(handle.request_id);
            if e.is_fatal() {
                error!(error = %e, "submit_sm write failed, closing session");
                self.shared.terminate().await;
            }
            return Err(e);
        }

        debug!(
            request_id = handle.request_id,
            sequences = ?sequence_numbers,
            "submit_sm written"
        );
        Ok(handle)
    }

    /// Wait for a submitted message to settle
    pub async fn await_completion(
        &self,
        handle: PendingHandle,
        timeout: Duration,
    ) -> SmppResult<SendOutcome> {
        self.shared.correlator.await_completion(handle, timeout).await
    }

    /// Encode, price, submit and wait for the outcome of one message.
    ///
    /// The wait lasts at most the configured delivery timeout. A message
    /// accepted by the SMSC whose receipt does not arrive in time comes back
    /// as `Sent` with `delivery_confirmed` unset.
    pub async fn send(&self, request: SendRequest) -> SmppResult<SendOutcome> {
        self.ensure_bound()?;

        let segments = self.encoder.encode(&request.text)?;
        let cost = self.price().await;

        let handle = self
            .submit(
                &request.destination,
                &segments,
                SubmitOptions {
                    source_address: request.source_address,
                    request_delivery_receipt: request.request_delivery_receipt,
                    cost,
                },
            )
            .await?;
        info!(
            request_id = handle.request_id,
            destination = %request.destination,
            segments = segments.len(),
            "message submitted"
        );

        let outcome = self
            .await_completion(handle, self.config.delivery_timeout)
            .await?;
        info!(
            request_id = outcome.request_id,
            status = %outcome.status,
            carrier_id = ?outcome.carrier_message_id,
            "send finished"
        );
        Ok(outcome)
    }

    async fn price(&self) -> f64 {
        let lookup = billing::within(
            self.shared.billing_timeout,
            self.shared.billing.price_per_message(),
        )
        .await;
        match lookup.map_err(SmppError::BillingUnavailable) {
            Ok(price) => price,
            Err(e) => {
                warn!(error = %e, "price lookup failed, cost recorded as 0");
                0.0
            }
        }
    }

    /// Unbind if bound, close the socket and stop the listener.
    ///
    /// Callers blocked in [`Session::send`] get `SessionClosed`. Calling it
    /// again is a no-op.
    pub async fn close(&self) -> SmppResult<()> {
        if self.closing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if self.state() == SessionState::Bound {
            let unbind = Unbind::new(self.shared.sequence.next());
            match self.shared.write(&unbind).await {
                Ok(()) => {
                    let answered = tokio::time::timeout(
                        self.config.unbind_timeout,
                        self.shared.unbound.notified(),
                    )
                    .await;
                    if answered.is_err() {
                        debug!("no unbind_resp before closing");
                    }
                }
                Err(e) => debug!(error = %e, "unbind not sent"),
            }
        }

        self.shared.terminate().await;
        lock(&self.reader).take();

        let handle = lock(&self.listener).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "listener task ended abnormally");
            }
        }
        info!("session closed");
        Ok(())
    }

    fn ensure_bound(&self) -> SmppResult<()> {
        match self.state() {
            SessionState::Bound => Ok(()),
            _ if self.shared.is_stopping() => Err(SmppError::SessionClosed),
            state => Err(SmppError::InvalidState(format!("not bound ({state})"))),
        }
    }
}

impl<B: BillingGateway> Drop for Session<B> {
    fn drop(&mut self) {
        // The listener notices within one read timeout and drops the socket
        self.shared.stop.store(true, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bind_timeout(timeout: Duration) -> SmppError {
    SmppError::Bind(format!("no bind_transceiver_resp within {timeout:?}"))
}

/// Source numbering: alphanumeric senders go out as TON alphanumeric/NPI
/// unknown, anything else as an international ISDN number.
pub(crate) fn source_numbering(source: &str) -> (TypeOfNumber, NumericPlanIndicator) {
    if source.chars().any(|c| c.is_alphabetic()) {
        (TypeOfNumber::Alphanumeric, NumericPlanIndicator::Unknown)
    } else {
        (TypeOfNumber::International, NumericPlanIndicator::Isdn)
    }
}

fn build_submit(
    sequence_number: u32,
    source: &str,
    destination: &str,
    segment: &Segment,
    request_delivery_receipt: bool,
) -> SmppResult<SubmitSm> {
    let (source_ton, source_npi) = source_numbering(source);
    let esm_class = if segment.has_udh() {
        EsmClass::default().with_udhi()
    } else {
        EsmClass::default()
    };

    let pdu = SubmitSm::builder()
        .sequence_number(sequence_number)
        .source(source_ton, source_npi, source)
        .destination(TypeOfNumber::International, NumericPlanIndicator::Isdn, destination)
        .esm_class(esm_class)
        .data_coding(segment.data_coding)
        .with_delivery_receipt(request_delivery_receipt)
        .short_message(segment.payload.clone())
        .build()?;
    Ok(pdu)
}
