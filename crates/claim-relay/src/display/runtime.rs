//! Event loop driving a [`DisplaySurface`]
//!
//! One task owns the surface and multiplexes three inputs: relay pushes, UI
//! commands, and finished verifier calls. Verifier calls run on a `JoinSet`;
//! they are never cancelled, their late outcomes are simply refused by the
//! surface's token check. Each turn of the loop publishes a fresh
//! [`SurfaceView`] on a watch channel.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use super::{CheckTicket, DisplaySurface, Phase, SurfaceView};
use crate::client::{CheckError, Verifier};
use crate::relay::{ClaimRelay, RelayEvent};
use crate::types::VerificationResult;

/// UI actions sent to a running surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    SetInput(String),
    /// Check the input box, with the current tab URL if known
    Check { url: Option<String> },
    Clear,
}

/// Client side of a spawned surface
pub struct SurfaceHandle {
    commands: mpsc::Sender<SurfaceCommand>,
    views: watch::Receiver<SurfaceView>,
    task: JoinHandle<()>,
}

impl SurfaceHandle {
    /// Send a command. Returns `false` if the surface has shut down.
    pub async fn send(&self, command: SurfaceCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub fn view(&self) -> SurfaceView {
        self.views.borrow().clone()
    }

    /// Wait until the rendered view satisfies `pred`
    pub async fn wait_for<F>(&mut self, mut pred: F) -> Option<SurfaceView>
    where
        F: FnMut(&SurfaceView) -> bool,
    {
        self.views
            .wait_for(|view| pred(view))
            .await
            .ok()
            .map(|view| view.clone())
    }

    /// Close the panel
    pub async fn close(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            warn!("surface task ended abnormally: {}", e);
        }
    }
}

type Completion = (u64, Result<VerificationResult, CheckError>);

pub struct SurfaceRuntime<V: Verifier + 'static> {
    surface: DisplaySurface,
    verifier: Arc<V>,
    in_flight: JoinSet<Completion>,
}

impl<V: Verifier + 'static> SurfaceRuntime<V> {
    /// Open a panel against `relay`: subscribe to pushes, activate, and run
    /// until the returned handle is closed.
    ///
    /// The subscription is taken before the store is read, so a claim fired
    /// while the panel opens is either in the store or in the channel.
    pub fn spawn(relay: &ClaimRelay, verifier: Arc<V>) -> SurfaceHandle {
        let pushes = relay.channel().subscribe();
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (views_tx, views_rx) = watch::channel(SurfaceView {
            phase: Phase::Loading,
            ..SurfaceView::default()
        });

        let runtime = SurfaceRuntime {
            surface: DisplaySurface::new(relay.store().clone()),
            verifier,
            in_flight: JoinSet::new(),
        };
        let task = tokio::spawn(runtime.run(pushes, commands_rx, views_tx));

        SurfaceHandle {
            commands: commands_tx,
            views: views_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut pushes: broadcast::Receiver<RelayEvent>,
        mut commands: mpsc::Receiver<SurfaceCommand>,
        views: watch::Sender<SurfaceView>,
    ) {
        if let Some(ticket) = self.surface.activate().await {
            self.dispatch(ticket);
        }
        views.send_replace(self.surface.view());

        let mut pushes_open = true;
        loop {
            tokio::select! {
                push = pushes.recv(), if pushes_open => match push {
                    Ok(event) => {
                        if let Some(ticket) = self.surface.on_push(event).await {
                            self.dispatch(ticket);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "relay subscription lagged, reloading from store");
                        if let Some(ticket) = self.surface.reconcile().await {
                            self.dispatch(ticket);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("relay channel closed");
                        pushes_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(done) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match done {
                        Ok((token, outcome)) => {
                            self.surface.complete(token, outcome);
                        }
                        Err(e) => warn!("verifier task failed: {}", e),
                    }
                }
            }

            views.send_replace(self.surface.view());
        }

        debug!("surface closed");
    }

    async fn handle_command(&mut self, command: SurfaceCommand) {
        match command {
            SurfaceCommand::SetInput(text) => self.surface.set_input(text),
            SurfaceCommand::Check { url } => {
                if let Ok(ticket) = self.surface.check(None, url).await {
                    self.dispatch(ticket);
                }
            }
            SurfaceCommand::Clear => self.surface.clear().await,
        }
    }

    fn dispatch(&mut self, ticket: CheckTicket) {
        let verifier = Arc::clone(&self.verifier);
        self.in_flight.spawn(async move {
            let outcome = verifier.verify(&ticket.request).await;
            (ticket.token, outcome)
        });
    }
}
