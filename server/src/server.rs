//! The listening server: accept loop and per-association workers.

use crate::config::ScpConfig;
use crate::context::ServerContext;
use crate::dispatch;
use crate::ingest::StorageEvent;
use pacs_dimse::message::DimseEvent;
use pacs_dimse::MessageIdSequence;
use pacs_dictionary_std::uids;
use pacs_ul::association::server::{AccessControl, ServerAssociationOptions};
use pacs_ul::Association;
use snafu::{ResultExt, Snafu};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

/// A server lifecycle failure.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not bind `{}`", addr))]
    Bind {
        addr: String,
        source: std::io::Error,
        backtrace: snafu::Backtrace,
    },
    #[snafu(display("could not accept a connection"))]
    Accept {
        source: std::io::Error,
        backtrace: snafu::Backtrace,
    },
    #[snafu(display("could not initialize the server context"))]
    Context {
        #[snafu(backtrace)]
        source: crate::context::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// The listening service class provider.
///
/// One accept loop hands each connection to its own worker thread;
/// every worker drives one association through negotiation,
/// message dispatch and release.
pub struct PacsServer {
    listener: TcpListener,
    context: Arc<ServerContext>,
    shutdown: Arc<AtomicBool>,
}

impl PacsServer {
    /// Bind the configured address and build the shared context.
    ///
    /// The returned receiver yields one [`StorageEvent`] per
    /// ingestion outcome.
    pub fn bind(config: ScpConfig) -> Result<(Self, mpsc::Receiver<StorageEvent>)> {
        let _ = std::fs::create_dir_all(&config.storage_root);
        let addr = config.bind_addr();
        let (context, events) = ServerContext::new(config).context(ContextSnafu)?;
        let listener = TcpListener::bind(&addr).context(BindSnafu { addr })?;
        Ok((
            PacsServer {
                listener,
                context: Arc::new(context),
                shutdown: Arc::new(AtomicBool::new(false)),
            },
            events,
        ))
    }

    /// The locally bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The shared context (catalog, worklist, MPPS, metrics).
    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// A flag which, once set, stops the accept loop
    /// at the next connection.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Serve until the shutdown flag is raised.
    pub fn run(&self) -> Result<()> {
        tracing::info!(
            ae_title = %self.context.config.ae_title,
            addr = %self.context.config.bind_addr(),
            "server listening"
        );
        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            match stream {
                Ok(stream) => {
                    let context = Arc::clone(&self.context);
                    thread::spawn(move || serve_association(&context, stream));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
        Ok(())
    }

    /// Accept exactly one connection and serve it on this thread.
    pub fn handle_next(&self) -> Result<()> {
        let (stream, peer) = self.listener.accept().context(AcceptSnafu)?;
        tracing::debug!(%peer, "connection accepted");
        serve_association(&self.context, stream);
        Ok(())
    }
}

/// The association options derived from the configuration:
/// the service menu of this provider.
fn scp_options(config: &ScpConfig) -> ServerAssociationOptions<'static> {
    let access_control = if config.allowed_peer_ae_titles.is_empty() {
        AccessControl::AcceptAny
    } else {
        AccessControl::AllowCallingAeTitles(config.allowed_peer_ae_titles.clone())
    };

    let mut options = ServerAssociationOptions::new()
        .ae_title(config.ae_title.clone())
        .ae_access_control(access_control)
        .max_pdu_length(config.max_pdu_size)
        .artim_timeout(config.artim_timeout())
        .read_timeout(config.dimse_timeout())
        .with_abstract_syntax(uids::VERIFICATION)
        .with_abstract_syntax(uids::PATIENT_ROOT_QR_FIND)
        .with_abstract_syntax(uids::PATIENT_ROOT_QR_MOVE)
        .with_abstract_syntax(uids::PATIENT_ROOT_QR_GET)
        .with_abstract_syntax(uids::STUDY_ROOT_QR_FIND)
        .with_abstract_syntax(uids::STUDY_ROOT_QR_MOVE)
        .with_abstract_syntax(uids::STUDY_ROOT_QR_GET)
        .with_abstract_syntax(uids::MODALITY_WORKLIST_FIND)
        .with_abstract_syntax(uids::MODALITY_PERFORMED_PROCEDURE_STEP);
    for sop_class in uids::STORAGE_SOP_CLASSES {
        options = options.with_abstract_syntax(*sop_class);
    }
    options
}

/// Drive one association from negotiation to close.
pub(crate) fn serve_association(context: &ServerContext, stream: TcpStream) {
    let options = scp_options(&context.config);
    let mut association = match options.establish(stream) {
        Ok(association) => association,
        Err(pacs_ul::association::Error::Rejected { .. })
        | Err(pacs_ul::association::Error::NoAcceptedPresentationContexts { .. }) => {
            context.metrics.associations.record_rejected();
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "association establishment failed");
            context.metrics.associations.record_aborted();
            return;
        }
    };

    context.metrics.associations.record_established();
    tracing::info!(
        calling = %association.client_ae_title(),
        "association established"
    );

    let mut message_ids = MessageIdSequence::new();
    loop {
        match pacs_dimse::receive_event(&mut association) {
            Ok(DimseEvent::Message {
                presentation_context_id,
                message,
            }) => {
                if let Err(e) = dispatch::dispatch(
                    context,
                    &mut association,
                    presentation_context_id,
                    message,
                    &mut message_ids,
                ) {
                    tracing::warn!(error = %e, "service failure; aborting association");
                    let _ = association.abort();
                    context.metrics.associations.record_aborted();
                    return;
                }
            }
            Ok(DimseEvent::ReleaseRequested) => {
                let _ = association.confirm_release();
                context.metrics.associations.record_released();
                tracing::debug!("association released");
                return;
            }
            Ok(DimseEvent::Aborted) => {
                context.metrics.associations.record_aborted();
                tracing::debug!("association aborted by peer");
                return;
            }
            Err(e) => {
                tracing::debug!(error = %e, "association ended");
                let _ = association.abort();
                context.metrics.associations.record_aborted();
                return;
            }
        }
    }
}
