//! Flow orchestration: arrivals, per-class routing and the run driver.
//!
//! [`Network`] owns the stations and the network recorder. Its arrival
//! generator creates users and spawns one flow task per user; each flow
//! walks the user's class route and records entrance and exit.
//! [`NetworkSimulation`] wires a validated configuration into a
//! [`Simulation`] and produces a [`NetworkReport`] at the horizon.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use qnet_core::dists::{ArrivalPattern, FoldedNormal, PoissonArrivals, WeightedChoice};
use qnet_core::logging::events;
use qnet_core::randomness::DrawSite;
use qnet_core::{simulation_span, Execute, Executor, SchedulerHandle, SimError, Simulation};
use qnet_metrics::NetworkRecorder;
use tracing::{debug, error, instrument};

use crate::config::{NetworkConfig, NetworkParams};
use crate::error::ComponentError;
use crate::report::NetworkReport;
use crate::routing::Hop;
use crate::station::{
    DelayStation, PipelineStation, SegmentPaceStation, SegmentedTransferStation, ServiceStation,
    TransferStation, Visit,
};
use crate::user::{split_into_segments, User, UserClass, UserIdAllocator};

const ARRIVALS: DrawSite = DrawSite::new("arrivals");
const CLASS_CHOICE: DrawSite = DrawSite::new("class_choice");
const TRANSFER_FILE_SIZES: DrawSite = DrawSite::new("transfer_file_sizes");
const SEGMENTED_FILE_SIZES: DrawSite = DrawSite::new("segmented_file_sizes");

/// The content-delivery network: stations, users and occupancy.
pub struct Network {
    handle: SchedulerHandle,
    params: NetworkParams,
    input: DelayStation,
    pipeline: PipelineStation,
    inter_stage: DelayStation,
    transfer: TransferStation,
    segmented_transfer: SegmentedTransferStation,
    output: DelayStation,
    pacing: SegmentPaceStation,
    segmented_file_sizes: RefCell<FoldedNormal>,
    recorder: RefCell<NetworkRecorder>,
    users: RefCell<Vec<Rc<User>>>,
    ids: RefCell<UserIdAllocator>,
    failure: RefCell<Option<ComponentError>>,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("users", &self.users.borrow().len())
            .field("occupancy", &self.recorder.borrow().occupancy())
            .field("failed", &self.failure.borrow().is_some())
            .finish()
    }
}

impl Network {
    /// Build every station from validated parameters.
    pub fn new(params: NetworkParams, handle: SchedulerHandle) -> Result<Self, ComponentError> {
        let seed = params.seed;
        let fixed = |hop: Hop| {
            params.station(hop).service_time.ok_or_else(|| {
                SimError::Configuration(format!("station '{hop}' has no service time"))
            })
        };

        Ok(Self {
            input: DelayStation::new(
                Hop::Input.label(),
                params.input.capacity,
                fixed(Hop::Input)?,
                handle.clone(),
            ),
            pipeline: PipelineStation::new(
                Hop::Pipeline.label(),
                params.pipeline.capacity,
                fixed(Hop::Pipeline)?,
                handle.clone(),
            )?,
            inter_stage: DelayStation::new(
                Hop::InterStage.label(),
                params.inter_stage.capacity,
                fixed(Hop::InterStage)?,
                handle.clone(),
            ),
            transfer: TransferStation::new(
                Hop::Transfer.label(),
                params.transfer.capacity,
                FoldedNormal::new(params.file_size_std_dev, TRANSFER_FILE_SIZES.seed(seed))?,
                handle.clone(),
            )?,
            segmented_transfer: SegmentedTransferStation::new(
                Hop::SegmentedTransfer.label(),
                params.segmented_transfer.capacity,
                handle.clone(),
            )?,
            output: DelayStation::new(
                Hop::Output.label(),
                params.output.capacity,
                fixed(Hop::Output)?,
                handle.clone(),
            ),
            pacing: SegmentPaceStation::new(
                Hop::Pacing.label(),
                params.pacing.capacity,
                handle.clone(),
            )?,
            segmented_file_sizes: RefCell::new(FoldedNormal::new(
                params.file_size_std_dev,
                SEGMENTED_FILE_SIZES.seed(seed),
            )?),
            recorder: RefCell::new(NetworkRecorder::new()),
            users: RefCell::new(Vec::new()),
            ids: RefCell::new(UserIdAllocator::new()),
            failure: RefCell::new(None),
            handle,
            params,
        })
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// Every station, in route order.
    pub fn stations(&self) -> [&dyn ServiceStation; 7] {
        [
            &self.input,
            &self.pipeline,
            &self.inter_stage,
            &self.transfer,
            &self.segmented_transfer,
            &self.output,
            &self.pacing,
        ]
    }

    pub fn station(&self, hop: Hop) -> &dyn ServiceStation {
        match hop {
            Hop::Input => &self.input,
            Hop::Pipeline => &self.pipeline,
            Hop::InterStage => &self.inter_stage,
            Hop::Transfer => &self.transfer,
            Hop::SegmentedTransfer => &self.segmented_transfer,
            Hop::Output => &self.output,
            Hop::Pacing => &self.pacing,
        }
    }

    pub fn recorder(&self) -> Ref<'_, NetworkRecorder> {
        self.recorder.borrow()
    }

    /// Every user created so far, in arrival order.
    pub fn users(&self) -> Ref<'_, Vec<Rc<User>>> {
        self.users.borrow()
    }

    pub fn arrivals(&self, class: UserClass) -> u64 {
        self.ids.borrow().arrivals(class)
    }

    /// The first fatal flow error, if any.
    pub fn failure(&self) -> Ref<'_, Option<ComponentError>> {
        self.failure.borrow()
    }

    pub fn take_failure(&self) -> Option<ComponentError> {
        self.failure.borrow_mut().take()
    }

    /// Generate users forever: wait for the next arrival, pick a class,
    /// create and retain the user, spawn its flow.
    pub async fn gen_arrivals(
        self: Rc<Self>,
        mut arrivals: impl ArrivalPattern,
        mut classes: WeightedChoice<UserClass>,
    ) {
        loop {
            self.handle.sleep(arrivals.next_arrival_time()).await;
            let class = classes.choose();
            let id = self.ids.borrow_mut().allocate(class);
            let user = Rc::new(User::new(id, class, *self.params.class(class)));
            debug!(user = %id, %class, time = %self.handle.time(), "User arrived");

            self.users.borrow_mut().push(user.clone());
            self.handle.spawn(self.clone().flow(user));
        }
    }

    /// Drive one user from entrance to exit.
    ///
    /// A failure is logged, kept as the run's error and halts the
    /// simulation.
    #[instrument(skip_all, fields(user = %user.id(), class = %user.class()))]
    pub async fn flow(self: Rc<Self>, user: Rc<User>) {
        let entered = self.handle.time();
        user.mark_entered(entered);
        self.recorder
            .borrow_mut()
            .enter(entered, user.id().0, user.class().label());
        debug!(time = %entered, "Entered network");

        let outcome = match self.run_route(&user).await {
            Ok(()) => self.leave(&user),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            error!(error = %e, "Flow failed");
            self.fail(e);
        }
    }

    fn leave(&self, user: &User) -> Result<(), ComponentError> {
        let exited = self.handle.time();
        self.recorder
            .borrow_mut()
            .exit(exited, user.id().0, user.class().label())?;
        user.mark_exited(exited);
        debug!(time = %exited, "Left network");
        Ok(())
    }

    fn fail(&self, error: ComponentError) {
        let mut failure = self.failure.borrow_mut();
        if failure.is_none() {
            *failure = Some(error);
        }
        self.handle.halt();
    }

    async fn run_route(&self, user: &User) -> Result<(), ComponentError> {
        let Some(segment) = user.params().segment else {
            for &hop in user.class().route() {
                self.hop(hop, user, None).await?;
            }
            return Ok(());
        };

        let file_size = self
            .segmented_file_sizes
            .borrow_mut()
            .sample(user.params().mean_file_size)?;
        user.set_file_size(file_size);
        let segments = split_into_segments(file_size, segment.segment_size)?;
        debug!(file_size, segments = segments.len(), "Segment plan drawn");
        user.set_segments(segments.clone());

        for (index, size) in segments.into_iter().enumerate() {
            user.set_current_segment(Some(index));
            for &hop in user.class().route() {
                self.hop(hop, user, Some(size)).await?;
            }
        }
        user.set_current_segment(None);
        Ok(())
    }

    async fn hop(&self, hop: Hop, user: &User, segment: Option<f64>) -> Result<Visit, SimError> {
        match hop {
            Hop::Input => self.input.visit(user).await,
            Hop::Pipeline => self.pipeline.visit(user).await,
            Hop::InterStage => self.inter_stage.visit(user).await,
            Hop::Transfer => self.transfer.visit(user).await,
            Hop::SegmentedTransfer => {
                let size = segment.ok_or_else(|| {
                    SimError::InvalidState(format!("{user} routed to {hop} without a segment"))
                })?;
                self.segmented_transfer.visit(user, size).await
            }
            Hop::Output => self.output.visit(user).await,
            Hop::Pacing => self.pacing.visit(user).await,
        }
    }
}

/// A ready-to-run network simulation.
///
/// # Example
///
/// ```
/// use qnet_components::{NetworkConfig, NetworkSimulation};
///
/// let mut config = NetworkConfig::default();
/// config.horizon = 60.0;
/// let mut simulation = NetworkSimulation::new(config).unwrap();
/// let report = simulation.run().unwrap();
/// assert_eq!(report.network.entrances, report.network.exits + report.network.in_flight);
/// ```
pub struct NetworkSimulation {
    simulation: Simulation,
    network: Rc<Network>,
}

impl fmt::Debug for NetworkSimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkSimulation")
            .field("simulation", &self.simulation)
            .field("network", &self.network)
            .finish()
    }
}

impl NetworkSimulation {
    /// Validate `config` and build the network. No event runs yet.
    pub fn new(config: NetworkConfig) -> Result<Self, ComponentError> {
        let params = config.validate()?;
        Self::from_params(params)
    }

    pub fn from_params(params: NetworkParams) -> Result<Self, ComponentError> {
        let seed = params.seed;
        let arrivals = PoissonArrivals::new(params.mean_interarrival, ARRIVALS.seed(seed))?;
        let classes = WeightedChoice::new(params.weights, CLASS_CHOICE.seed(seed))?;

        let simulation = Simulation::default();
        let network = Rc::new(Network::new(params, simulation.scheduler_handle())?);
        simulation.spawn(network.clone().gen_arrivals(arrivals, classes));

        Ok(Self {
            simulation,
            network,
        })
    }

    pub fn network(&self) -> &Rc<Network> {
        &self.network
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Run to the configured horizon and report.
    pub fn run(&mut self) -> Result<NetworkReport, ComponentError> {
        let horizon = self.network.params().horizon;
        self.run_with(Executor::timed(horizon))
    }

    /// Run under a custom executor, for example one with a side effect
    /// checking invariants after every step.
    pub fn run_with<E: Execute>(&mut self, executor: E) -> Result<NetworkReport, ComponentError> {
        let _span = simulation_span("qnet").entered();
        events::simulation_started("qnet", Some(self.network.params().horizon));
        self.simulation.execute(executor);
        events::simulation_completed(
            "qnet",
            self.simulation.time(),
            self.simulation.events_processed(),
        );

        if let Some(error) = self.network.take_failure() {
            return Err(error);
        }
        Ok(self.report())
    }

    /// Report on the current state.
    pub fn report(&self) -> NetworkReport {
        NetworkReport::from_network(&self.network, self.simulation.time())
    }
}
