use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::CalendarConfig;
use crate::contract::client::CalendarApi;
use crate::domain::dispatcher::NotificationDispatcher;
use crate::domain::events::CalendarDomainEvent;
use crate::domain::ports::{Clock, EventPublisher, NotificationDelivery, ReconciliationSink};
use crate::domain::repo::{
    EventsRepository, NotificationsRepository, SchedulesRepository, UsersRepository,
};
use crate::domain::service::{CalendarService, ServicePorts};
use crate::gateways::local::CalendarLocalClient;
use crate::infra::clock::SystemClock;
use crate::infra::delivery::LogDelivery;
use crate::infra::publisher::TracingEventPublisher;
use crate::infra::reconcile::InMemoryRepairQueue;
use crate::infra::storage::InMemoryStore;

/// External handles the module is wired from.
#[derive(Clone)]
pub struct CalendarDeps {
    pub users: Arc<dyn UsersRepository>,
    pub events: Arc<dyn EventsRepository>,
    pub schedules: Arc<dyn SchedulesRepository>,
    pub notifications: Arc<dyn NotificationsRepository>,
    pub clock: Arc<dyn Clock>,
    pub delivery: Arc<dyn NotificationDelivery>,
    pub publisher: Arc<dyn EventPublisher<CalendarDomainEvent>>,
    pub repairs: Arc<dyn ReconciliationSink>,
}

impl CalendarDeps {
    /// Everything in process: one shared in-memory store and the wall clock.
    pub fn in_memory() -> Self {
        Self::in_memory_with_clock(Arc::new(SystemClock))
    }

    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            events: store.clone(),
            schedules: store.clone(),
            notifications: store,
            clock,
            delivery: Arc::new(LogDelivery),
            publisher: Arc::new(TracingEventPublisher),
            repairs: Arc::new(InMemoryRepairQueue::new()),
        }
    }
}

/// Reason the dispatcher task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The loop returned on its own before cancellation took effect.
    Finished,
    Cancelled,
    /// The loop did not exit in time and was aborted.
    Timeout,
}

/// Running dispatcher task.
pub struct DispatcherHandle {
    cancel: CancellationToken,
    join: JoinHandle<anyhow::Result<()>>,
}

impl DispatcherHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loop and wait up to `timeout` for it to exit.
    pub async fn stop(mut self, timeout: Duration) -> anyhow::Result<StopReason> {
        let already_finished = self.join.is_finished();
        self.cancel.cancel();

        match tokio::time::timeout(timeout, &mut self.join).await {
            Ok(Ok(Ok(()))) if already_finished => Ok(StopReason::Finished),
            Ok(Ok(Ok(()))) => Ok(StopReason::Cancelled),
            Ok(Ok(Err(e))) => {
                warn!(error = %format!("{e:#}"), "dispatcher exited with error");
                Ok(StopReason::Finished)
            }
            Ok(Err(join_err)) => Err(anyhow::anyhow!("dispatcher task failed: {join_err}")),
            Err(_) => {
                warn!(?timeout, "dispatcher did not stop in time; aborting");
                self.join.abort();
                Ok(StopReason::Timeout)
            }
        }
    }
}

/// Calendar module: wires the service, the local client and the dispatcher.
pub struct CalendarModule {
    config: CalendarConfig,
    service: Arc<CalendarService>,
    api: Arc<dyn CalendarApi>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl CalendarModule {
    pub fn new(config: CalendarConfig, deps: CalendarDeps) -> anyhow::Result<Self> {
        Self::with_instance(config, deps, "calendar-0")
    }

    /// `instance` labels this process's dispatcher in logs. Fails when `config`
    /// does not validate.
    pub fn with_instance(
        config: CalendarConfig,
        deps: CalendarDeps,
        instance: &str,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let service = Arc::new(CalendarService::new(
            ServicePorts {
                users: deps.users,
                events: deps.events,
                schedules: deps.schedules,
                notifications: deps.notifications.clone(),
                clock: deps.clock.clone(),
                publisher: deps.publisher.clone(),
                repairs: deps.repairs,
            },
            config.service_config(),
        ));
        let api: Arc<dyn CalendarApi> = Arc::new(CalendarLocalClient::new(service.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            deps.notifications,
            deps.delivery,
            deps.publisher,
            deps.clock,
            config.dispatcher_tick,
            instance,
        ));

        info!(instance, tick = ?config.dispatcher_tick, "calendar module initialized");
        Ok(Self {
            config,
            service,
            api,
            dispatcher,
        })
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn api(&self) -> Arc<dyn CalendarApi> {
        self.api.clone()
    }

    pub fn service(&self) -> Arc<CalendarService> {
        self.service.clone()
    }

    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        self.dispatcher.clone()
    }

    /// Spawn the dispatcher loop on the current runtime.
    pub fn start_dispatcher(&self) -> DispatcherHandle {
        self.start_dispatcher_with_token(CancellationToken::new())
    }

    pub fn start_dispatcher_with_token(&self, cancel: CancellationToken) -> DispatcherHandle {
        let join = tokio::spawn(self.dispatcher.clone().run(cancel.clone()));
        DispatcherHandle { cancel, join }
    }
}
