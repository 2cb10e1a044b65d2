use std::{collections::HashMap, time::Duration};
use tracing::{error, info, warn};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};

use common::actors::{Actor, ActorType, ControlMessage};

type ActorFactory = Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

/// Stops an actor's heartbeat however its task ends, panics included.
struct HeartbeatGuard(JoinHandle<()>);

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Supervisor {
    actor_factories: HashMap<ActorType, ActorFactory>,
    pulses: HashMap<ActorType, Instant>,
    handles: HashMap<ActorType, JoinHandle<()>>,
    timeout: Duration,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            actor_factories: HashMap::new(),
            pulses: HashMap::new(),
            handles: HashMap::new(),
            timeout: Duration::from_secs(3),
        }
    }

    pub fn register_actor<F, A>(&mut self, actor_type: ActorType, factory: F)
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Actor + 'static,
    {
        self.actor_factories
            .insert(actor_type, Box::new(move || Box::new(factory()) as Box<dyn Actor>));
    }

    pub async fn start(&mut self) {
        let mut check_interval = time::interval(Duration::from_secs(1));

        let (supervisor_tx, mut supervisor_rx) = mpsc::channel::<ControlMessage>(512);

        let actors: Vec<ActorType> = self.actor_factories.keys().copied().collect();

        actors.into_iter().for_each(|actor| {
            self.spawn_actor(actor, supervisor_tx.clone());
        });

        loop {
            tokio::select! {
                Some(msg) = supervisor_rx.recv() => {
                    match msg {
                        ControlMessage::Heartbeat(actor_type) => {
                            // Late beats from a stopped actor must not revive it.
                            if self.handles.contains_key(&actor_type) {
                                self.pulses.insert(actor_type, Instant::now());
                            }
                        }
                        ControlMessage::Shutdown(actor_type) => {
                            warn!("{:?} is shutting down gracefully.", actor_type);
                            self.pulses.remove(&actor_type);
                            if let Some(handle) = self.handles.remove(&actor_type) {
                                handle.abort();
                            }
                        },
                        ControlMessage::Error(actor_type, error_msg) => {
                            error!("Actor {:?} reported error: {}", actor_type, error_msg);
                        },
                    }
                }

                _ = check_interval.tick() => {
                    let dead_timeout = Instant::now() - self.timeout;

                    let dead_actors: Vec<ActorType> = self
                        .pulses
                        .iter()
                        .filter(|&(_, &pulse)| pulse < dead_timeout)
                        .map(|(&actor_type, _)| actor_type)
                        .collect();

                    dead_actors.into_iter().for_each(|actor_type| {
                        warn!("{:?} is unresponsive! Restarting.", actor_type);
                        if let Some(handle) = self.handles.remove(&actor_type) {
                            handle.abort();
                        }
                        self.spawn_actor(actor_type, supervisor_tx.clone());
                    });
                }
            }
        }
    }

    fn spawn_actor(&mut self, actor_type: ActorType, tx: mpsc::Sender<ControlMessage>) {
        let Some(factory) = self.actor_factories.get(&actor_type) else {
            error!("No factory registered for {:?}", actor_type);
            return;
        };
        let mut new_actor = factory();
        let heartbeat = HeartbeatGuard(new_actor.spawn_heartbeat(tx.clone()));

        let new_actor_handle = tokio::spawn(async move {
            let result = new_actor.run().await;
            drop(heartbeat);
            match result {
                Ok(()) => {
                    let _ = tx.send(ControlMessage::Shutdown(actor_type)).await;
                }
                Err(e) => {
                    error!("Actor {:?} crashed: {}", actor_type, e);
                    let _ = tx.send(ControlMessage::Error(actor_type, e.to_string())).await;
                }
            }
        });
        info!("Spawned {:?}", actor_type);
        self.handles.insert(actor_type, new_actor_handle);
        self.pulses.insert(actor_type, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    struct FlakyActor {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Actor for FlakyActor {
        fn name(&self) -> ActorType {
            ActorType::BroadcastActor
        }

        async fn run(&mut self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn supervised(fail: bool) -> (Supervisor, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let mut supervisor = Supervisor::new();
        supervisor.register_actor(
            ActorType::BroadcastActor,
            move || FlakyActor {
                runs: counter.clone(),
                fail,
            },
        );
        (supervisor, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_actor_is_restarted() {
        let (mut supervisor, runs) = supervised(true);
        let handle = tokio::spawn(async move { supervisor.start().await });

        time::sleep(Duration::from_secs(20)).await;
        handle.abort();

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_actor_is_not_restarted() {
        let (mut supervisor, runs) = supervised(false);
        let handle = tokio::spawn(async move { supervisor.start().await });

        time::sleep(Duration::from_secs(20)).await;
        handle.abort();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
