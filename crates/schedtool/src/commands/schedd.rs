use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tokio::net::TcpListener;

use schedcore::classad::JobAd;
use schedcore::connection::Connection;
use schedcore::negotiate::{FromScheddMessage, ScheddQueue, ToScheddMessage, serve_negotiation};

use crate::commands::policy::load_ads;
use crate::output::Output;

#[derive(Parser)]
pub struct ScheddOpts {
    /// File with job ads in priority order, separated by blank lines
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub jobs: PathBuf,

    /// Address to listen on for negotiators
    #[arg(long, default_value = "127.0.0.1:9618")]
    pub listen: SocketAddr,

    /// Number of sessions to serve before exiting, 0 serves forever
    #[arg(long, default_value_t = 1)]
    pub sessions: u32,
}

#[derive(Serialize, Debug)]
pub struct ScheddSessionSummary {
    pub peer: String,
    pub sent: usize,
    pub remaining: usize,
}

pub async fn command_schedd(opts: ScheddOpts, output: &dyn Output) -> anyhow::Result<()> {
    let ads = load_ads(&opts.jobs)?;
    let listener = TcpListener::bind(opts.listen)
        .await
        .with_context(|| format!("Cannot listen on {}", opts.listen))?;
    log::info!(
        "Offering {} job ad(s) on {}",
        ads.len(),
        listener.local_addr()?
    );

    let mut served = 0;
    while opts.sessions == 0 || served < opts.sessions {
        match serve_session(&listener, &ads).await {
            Ok(summary) => output.print_schedd_session(&summary),
            Err(error) => log::error!("Negotiation session failed: {error:?}"),
        }
        served += 1;
    }
    Ok(())
}

/// Accepts one negotiator and offers it the idle jobs of `ads`.
/// Every session starts from the full queue.
pub async fn serve_session(
    listener: &TcpListener,
    ads: &[JobAd],
) -> anyhow::Result<ScheddSessionSummary> {
    let (socket, peer) = listener.accept().await?;
    log::debug!("Negotiator connected from {peer}");
    let mut connection = Connection::<ToScheddMessage, FromScheddMessage>::init(socket)?;
    let mut queue = ScheddQueue::new(ads.to_vec());
    let sent = serve_negotiation(&mut connection, &mut queue)
        .await
        .with_context(|| format!("Session with {peer} failed"))?;
    Ok(ScheddSessionSummary {
        peer: peer.to_string(),
        sent,
        remaining: queue.len(),
    })
}
