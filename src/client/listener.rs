// ABOUTME: Background read loop for a bound session
// ABOUTME: Dispatches responses, receipts and SMSC requests and drives keep-alive

use crate::billing::BillingGateway;
use crate::client::error::{SmppError, SmppResult};
use crate::client::keepalive::{KeepAliveAction, KeepAliveConfig, KeepAliveManager};
use crate::client::receipt::DeliveryReceipt;
use crate::client::session::Shared;
use crate::codec::Frame;
use crate::connection::FrameReader;
use crate::datatypes::{
    CommandId, DeliverSmResponse, EnquireLink, EnquireLinkResponse, GenericNack, UnbindResponse,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Read and dispatch frames until the session stops or the link fails.
///
/// Each read waits at most the configured read timeout so a stop request is
/// noticed promptly; held receipts are swept and the keep-alive ticked
/// after every read.
pub(crate) async fn run<B: BillingGateway>(
    shared: Arc<Shared<B>>,
    mut reader: FrameReader,
    keepalive: KeepAliveConfig,
) {
    let mut keepalive = KeepAliveManager::new(keepalive, Instant::now());
    debug!("listener started");

    while !shared.is_stopping() {
        match reader.read_frame(shared.read_timeout).await {
            Ok(frame) => {
                keepalive.on_activity(Instant::now());
                match dispatch(&shared, frame, &mut keepalive).await {
                    Ok(ControlFlow::Continue(())) => {}
                    Ok(ControlFlow::Break(())) => break,
                    Err(e) if e.is_fatal() => {
                        if !shared.is_stopping() {
                            error!(error = %e, "write failed, closing session");
                        }
                        shared.terminate().await;
                        break;
                    }
                    Err(e) => warn!(error = %e, "frame handling failed"),
                }
            }
            Err(SmppError::Timeout(_)) => {}
            Err(SmppError::Protocol(reason)) => {
                warn!(reason = %reason, "skipped malformed frame");
            }
            Err(e) => {
                if !shared.is_stopping() {
                    error!(error = %e, "connection to SMSC lost");
                }
                shared.terminate().await;
                break;
            }
        }

        let now = Instant::now();
        shared.correlator.sweep_orphans(now);

        match keepalive.tick(now) {
            KeepAliveAction::Idle => {}
            KeepAliveAction::Ping => {
                let sequence_number = shared.sequence.next();
                if let Err(e) = shared.write(&EnquireLink::new(sequence_number)).await {
                    if !shared.is_stopping() {
                        error!(error = %e, "enquire_link write failed");
                    }
                    shared.terminate().await;
                    break;
                }
                keepalive.on_ping_sent(sequence_number, now);
            }
            KeepAliveAction::LinkDead => {
                error!(status = ?keepalive.status(), "SMSC stopped answering enquire_link");
                shared.terminate().await;
                break;
            }
        }
    }

    debug!("listener stopped");
}

async fn dispatch<B: BillingGateway>(
    shared: &Shared<B>,
    frame: Frame,
    keepalive: &mut KeepAliveManager,
) -> SmppResult<ControlFlow<()>> {
    debug!(
        command = ?frame.command_id(),
        sequence = frame.sequence_number(),
        "frame received"
    );

    match frame {
        Frame::SubmitSmResp(resp) => {
            let changes = shared.correlator.resolve_submit(
                resp.sequence_number,
                resp.command_status,
                &resp.message_id,
            );
            for change in changes {
                shared.report(change);
            }
        }

        Frame::DeliverSm(pdu) => {
            shared
                .write(&DeliverSmResponse::new(pdu.sequence_number, ""))
                .await?;

            match DeliveryReceipt::parse(&pdu) {
                Some(receipt) => {
                    debug!(
                        carrier_id = %receipt.carrier_message_id,
                        state = %receipt.state,
                        "delivery receipt"
                    );
                    if let Some(change) = shared.correlator.resolve_receipt(receipt) {
                        shared.report(change);
                    }
                }
                None if pdu.is_delivery_receipt() => {
                    warn!(text = %pdu.text(), "delivery receipt without message id");
                }
                None => {
                    info!(
                        source = %pdu.source_addr,
                        destination = %pdu.destination_addr,
                        text = %pdu.text(),
                        "mobile originated message"
                    );
                }
            }
        }

        Frame::EnquireLink(ping) => {
            shared
                .write(&EnquireLinkResponse::new(ping.sequence_number))
                .await?;
        }

        Frame::EnquireLinkResp(pong) => {
            if !keepalive.on_pong(pong.sequence_number) {
                debug!(sequence = pong.sequence_number, "unsolicited enquire_link_resp");
            }
        }

        Frame::Unbind(request) => {
            info!("SMSC requested unbind");
            shared
                .write(&UnbindResponse::new(request.sequence_number))
                .await?;
            shared.terminate().await;
            return Ok(ControlFlow::Break(()));
        }

        Frame::UnbindResp(_) => shared.unbound.notify_one(),

        Frame::GenericNack(nack) => {
            let reason = format!("generic_nack: {}", nack.command_status);
            if !shared.correlator.resolve_failure(nack.sequence_number, reason) {
                warn!(
                    sequence = nack.sequence_number,
                    status = %nack.command_status,
                    "generic_nack for no pending submission"
                );
            }
        }

        Frame::Malformed { header, error } => {
            warn!(
                command = ?header.command_id,
                sequence = header.sequence_number,
                error = %error,
                "malformed frame"
            );
            match header.command_id {
                // acknowledged whatever is in it, or the SMSC keeps redelivering
                CommandId::DeliverSm => {
                    shared
                        .write(&DeliverSmResponse::new(header.sequence_number, ""))
                        .await?;
                }
                CommandId::SubmitSmResp if !header.command_status.is_ok() => {
                    shared.correlator.resolve_submit(
                        header.sequence_number,
                        header.command_status,
                        "",
                    );
                }
                id if id.is_response() => {}
                _ => {
                    shared
                        .write(&GenericNack::new(
                            error.to_command_status(),
                            header.sequence_number,
                        ))
                        .await?;
                }
            }
        }

        other if other.is_response() => {
            debug!(command = ?other.command_id(), "ignoring unexpected response");
        }

        other => {
            warn!(command = ?other.command_id(), "unsupported request, sending generic_nack");
            shared
                .write(&GenericNack::invalid_command_id(other.sequence_number()))
                .await?;
        }
    }

    Ok(ControlFlow::Continue(()))
}
