#![allow(unused_crate_dependencies)]
#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use chirp::gap::{AdvertisementData, Uuid};
use chirp::gatt::{GattService, ReadOutcome, ReadRequest, RequestId};
use chirp::radio::{AdapterError, AdapterState, CentralId, Event, OpId, RadioAdapter};
use chirp::{Config, Peripheral};

#[derive(Debug, clap::Parser)]
struct Args {
    /// Configuration file. The per-user configuration is used by default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Advertised local name.
    #[arg(short, long)]
    name: Option<String>,

    /// Make the radio stack reject the advertising request.
    #[arg(long)]
    fail_advertising: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let mut cfg = match args.config {
        Some(ref path) => Config::load(path)?,
        None => Config::per_user("chirp")?,
    };
    if args.name.is_some() {
        cfg.local_name = args.name;
    }

    let (tx, rx) = mpsc::channel(16);
    let radio = Loopback {
        tx: tx.clone(),
        fail_advertising: args.fail_advertising,
    };
    let p = Arc::new(Peripheral::new(radio, &cfg));
    let ct = CancellationToken::new();
    let event_loop = tokio::spawn({
        let (p, ct) = (Arc::clone(&p), ct.clone());
        async move { p.run(rx, ct).await }
    });
    tx.send(Event::StateChanged(AdapterState::PoweredOn)).await?;
    p.start();
    let r = serve(&p, &cfg).await;
    ct.cancel();
    event_loop.await?;
    r
}

async fn serve(p: &Peripheral<Loopback>, cfg: &Config) -> Result<()> {
    p.ready().await?;
    info!("Serving {} in {}", cfg.characteristic, cfg.service);
    p.set_value(*b"chirp")?;
    let central = CentralId(1);
    p.handle_event(Event::Subscribe {
        central,
        characteristic: cfg.characteristic,
    });
    for (id, off) in (0..).zip([0, 2, 5, 6]) {
        let req = ReadRequest::new(RequestId(id), central, cfg.characteristic, off);
        p.handle_event(Event::ReadRequest(req));
    }
    p.clear_value()?;
    p.handle_event(Event::ReadRequest(ReadRequest::new(
        RequestId(4),
        central,
        cfg.characteristic,
        0,
    )));
    Ok(())
}

/// Radio stack that confirms every operation through the event channel.
#[derive(Debug)]
struct Loopback {
    tx: mpsc::Sender<Event>,
    fail_advertising: bool,
}

impl Loopback {
    fn confirm(&self, evt: Event) -> Result<(), AdapterError> {
        (self.tx.try_send(evt)).map_err(|e| AdapterError::Stack(e.to_string()))
    }
}

impl RadioAdapter for Loopback {
    fn add_service(&mut self, op: OpId, svc: &GattService) -> Result<(), AdapterError> {
        info!("Adding service {} ({op})", svc.uuid());
        self.confirm(Event::ServiceAdded { op, result: Ok(()) })
    }

    fn start_advertising(
        &mut self,
        op: OpId,
        svc: Uuid,
        data: &AdvertisementData,
    ) -> Result<(), AdapterError> {
        let ad = data.encode();
        info!(
            "Advertising {svc} ({op}) as {:?} with {:?}: {:02X?}",
            data.local_name().unwrap_or_default(),
            data.service_uuids(),
            ad.as_ref()
        );
        let result = if self.fail_advertising {
            Err(AdapterError::Stack("advertising not supported".into()))
        } else {
            Ok(())
        };
        self.confirm(Event::AdvertisingStarted { op, result })
    }

    fn respond_to_read(&mut self, req: &ReadRequest, out: ReadOutcome) {
        match out {
            Ok(v) => println!("{} {} @{}: {v:02X?}", req.id(), req.central(), req.offset()),
            Err(e) => println!("{} {} @{}: {e}", req.id(), req.central(), req.offset()),
        }
    }

    fn cancel(&mut self, op: OpId) {
        info!("Cancelled {op}");
    }
}
