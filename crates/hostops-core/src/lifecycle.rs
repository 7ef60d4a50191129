//! Power control and the bounded wait-for-offline protocol.
//!
//! Destructive workflows call [`LifecycleController::wait_for_offline`] first.
//! It sends a graceful stop, polls, escalates to exactly one kill and polls
//! again. If the server is still not offline the caller gets
//! [`HostError::LifecycleTimeout`] and must not touch world data.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::HostError;
use crate::power::{PowerAction, PowerApi, ServerPowerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    /// Polls after the graceful stop.
    pub graceful_polls: u32,
    /// Polls after the kill signal.
    pub kill_polls: u32,
}

impl WaitPolicy {
    pub const fn restore() -> Self {
        Self {
            interval: Duration::from_secs(2),
            graceful_polls: 30,
            kill_polls: 10,
        }
    }

    pub const fn regenerate() -> Self {
        Self {
            interval: Duration::from_secs(2),
            graceful_polls: 15,
            kill_polls: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    AlreadyOffline,
    /// Neither running nor starting, so no stop was attempted.
    NotRunning,
    Graceful,
    Killed,
}

pub struct LifecycleController<P> {
    power: P,
    pause: Box<dyn Fn(Duration)>,
}

impl<P: PowerApi> LifecycleController<P> {
    pub fn new(power: P) -> Self {
        Self {
            power,
            pause: Box::new(thread::sleep),
        }
    }

    /// Replace the sleep between polls.
    pub fn with_pause(mut self, pause: impl Fn(Duration) + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    pub fn power(&self) -> &P {
        &self.power
    }

    pub fn query_state(&self) -> Result<ServerPowerState, HostError> {
        Ok(self.power.query_state()?)
    }

    pub fn send_power(&self, action: PowerAction) -> Result<(), HostError> {
        info!("sending {action} signal");
        Ok(self.power.send_power(action)?)
    }

    pub fn send_command(&self, command: &str) -> Result<(), HostError> {
        debug!("sending console command: {command}");
        Ok(self.power.send_command(command)?)
    }

    /// Stop the server and block until it reports offline.
    ///
    /// A server that is already stopping, or whose state cannot be read, is
    /// polled without a second stop signal. The kill signal is sent at most once.
    pub fn wait_for_offline(&self, policy: &WaitPolicy) -> Result<StopOutcome, HostError> {
        self.wait_from(self.observe(), policy)
    }

    /// [`Self::wait_for_offline`] starting from a state the caller already read.
    pub fn wait_from(
        &self,
        observed: ServerPowerState,
        policy: &WaitPolicy,
    ) -> Result<StopOutcome, HostError> {
        let mut last = observed;
        if last == ServerPowerState::Offline {
            debug!("server already offline");
            return Ok(StopOutcome::AlreadyOffline);
        }
        if last.is_active() {
            self.send_power(PowerAction::Stop)?;
        }

        info!("waiting for server to stop");
        if self.poll_until_offline(policy, policy.graceful_polls, &mut last) {
            return Ok(StopOutcome::Graceful);
        }

        warn!("server didn't stop gracefully (still {last}), sending kill signal");
        self.send_power(PowerAction::Kill)?;
        if self.poll_until_offline(policy, policy.kill_polls, &mut last) {
            return Ok(StopOutcome::Killed);
        }

        Err(HostError::LifecycleTimeout {
            target: ServerPowerState::Offline.to_string(),
            last_seen: last.to_string(),
        })
    }

    /// Current state with API failures folded into `Unknown`, which never counts
    /// as offline.
    pub fn observe(&self) -> ServerPowerState {
        match self.power.query_state() {
            Ok(state) => state,
            Err(err) => {
                warn!("power state query failed: {err}");
                ServerPowerState::Unknown
            }
        }
    }

    fn poll_until_offline(
        &self,
        policy: &WaitPolicy,
        polls: u32,
        last: &mut ServerPowerState,
    ) -> bool {
        for attempt in 1..=polls {
            (self.pause)(policy.interval);
            *last = self.observe();
            debug!("poll {attempt}/{polls}: server is {last}");
            if *last == ServerPowerState::Offline {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::testing::ScriptedPower;

    fn policy(graceful_polls: u32, kill_polls: u32) -> WaitPolicy {
        WaitPolicy {
            interval: Duration::from_millis(1),
            graceful_polls,
            kill_polls,
        }
    }

    fn controller(power: &ScriptedPower) -> (LifecycleController<&ScriptedPower>, Rc<Cell<u32>>) {
        let pauses = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pauses);
        let controller =
            LifecycleController::new(power).with_pause(move |_| counter.set(counter.get() + 1));
        (controller, pauses)
    }

    #[test]
    fn offline_server_needs_no_signal() {
        let power = ScriptedPower::always(ServerPowerState::Offline);
        let (lifecycle, pauses) = controller(&power);
        let outcome = lifecycle.wait_for_offline(&policy(3, 2)).expect("wait");
        assert_eq!(outcome, StopOutcome::AlreadyOffline);
        assert!(power.actions().is_empty());
        assert_eq!(pauses.get(), 0);
    }

    #[test]
    fn graceful_stop_is_polled_to_completion() {
        let power = ScriptedPower::new(
            &[ServerPowerState::Running, ServerPowerState::Stopping],
            ServerPowerState::Offline,
        );
        let (lifecycle, _) = controller(&power);
        let outcome = lifecycle.wait_for_offline(&policy(5, 2)).expect("wait");
        assert_eq!(outcome, StopOutcome::Graceful);
        assert_eq!(power.actions(), vec![PowerAction::Stop]);
    }

    #[test]
    fn kill_is_sent_once_after_graceful_budget() {
        let mut power = ScriptedPower::always(ServerPowerState::Running);
        power.after_kill = Some(ServerPowerState::Offline);
        let (lifecycle, pauses) = controller(&power);
        let outcome = lifecycle.wait_for_offline(&policy(3, 2)).expect("wait");
        assert_eq!(outcome, StopOutcome::Killed);
        assert_eq!(power.actions(), vec![PowerAction::Stop, PowerAction::Kill]);
        assert_eq!(pauses.get(), 4);
    }

    #[test]
    fn escalation_aborts_when_kill_does_not_help() {
        let power = ScriptedPower::always(ServerPowerState::Running);
        let (lifecycle, pauses) = controller(&power);
        let err = lifecycle.wait_for_offline(&policy(3, 2)).expect_err("timeout");
        assert!(matches!(
            err,
            HostError::LifecycleTimeout { ref last_seen, .. } if last_seen == "running"
        ));
        assert_eq!(power.count(PowerAction::Kill), 1);
        assert_eq!(power.count(PowerAction::Stop), 1);
        assert_eq!(pauses.get(), 5);
        assert_eq!(*power.queries.borrow(), 6);
    }

    #[test]
    fn stopping_server_is_not_stopped_twice() {
        let power = ScriptedPower::new(&[ServerPowerState::Stopping], ServerPowerState::Offline);
        let (lifecycle, _) = controller(&power);
        let outcome = lifecycle.wait_for_offline(&policy(2, 2)).expect("wait");
        assert_eq!(outcome, StopOutcome::Graceful);
        assert!(power.actions().is_empty());
    }
}
