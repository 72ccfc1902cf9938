//! Property tests over arbitrary input traces.

mod support;

use controller_core::interlock::{ChargerSelector, CtrlState};
use controller_core::lines::OutputLine;
use controller_core::{InterlockInputs, InterlockState};
use proptest::prelude::*;

use support::Bench;

const DEAD_TIME_US: u64 = 5_000;

/// One sampled cycle: raw levels plus the gap to the next cycle in ms.
fn arb_cycle() -> impl Strategy<Value = (InterlockInputs, u64)> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        1u64..=700,
    )
        .prop_map(|(switch, dsg_inh, chg_inh, select, gap)| {
            (InterlockInputs::new(switch, dsg_inh, chg_inh, select), gap)
        })
}

fn arb_trace() -> impl Strategy<Value = Vec<(InterlockInputs, u64)>> {
    proptest::collection::vec(arb_cycle(), 1..200)
}

fn run_trace(
    trace: &[(InterlockInputs, u64)],
    mut check: impl FnMut(&Bench, &InterlockInputs),
) -> Bench {
    let mut bench = Bench::new();
    bench.boot();
    for (inputs, gap) in trace {
        bench.step(*inputs);
        check(&bench, inputs);
        bench.clock.advance_ms(*gap);
    }
    bench
}

fn power_path_released(bench: &Bench) -> bool {
    [
        OutputLine::PowerReady,
        OutputLine::DischargeContactor,
        OutputLine::MpptContactor,
        OutputLine::ExternalContactor,
    ]
    .into_iter()
    .all(|line| !bench.driver.level(line))
}

fn forced_defaults(state: &InterlockState) -> bool {
    !state.discharge.is_enabled()
        && !state.charge.is_enabled()
        && state.selector == ChargerSelector::Mppt
}

proptest! {
    /// Both charger contactors are never asserted at the same instant.
    #[test]
    fn charger_contactors_never_bridge(trace in arb_trace()) {
        let bench = run_trace(&trace, |_, _| {});
        prop_assert!(!bench.driver.bridged);
    }

    /// The controller only leaves the uninitialized state once the switch
    /// has been sampled low.
    #[test]
    fn uninitialized_until_switch_seen_low(trace in arb_trace()) {
        let mut seen_low = false;
        let mut violation = None;
        run_trace(&trace, |bench, inputs| {
            seen_low |= !inputs.system_switch;
            let uninitialized = bench.controller.state().ctrl == CtrlState::Uninitialized;
            if uninitialized == seen_low && violation.is_none() {
                violation = Some(*bench.controller.state());
            }
        });
        prop_assert_eq!(violation, None);
    }

    /// Outside of the on state every path is disabled and released; while on,
    /// the derived states mirror the inputs.
    #[test]
    fn derived_states_forced_unless_on(trace in arb_trace()) {
        let mut failures = 0usize;
        run_trace(&trace, |bench, inputs| {
            let state = bench.controller.state();
            let ok = if state.ctrl.is_on() {
                state.discharge == inputs.requested_discharge()
                    && state.charge == inputs.requested_charge()
                    && state.selector == inputs.requested_charger()
                    && bench.driver.level(OutputLine::PowerReady)
                    && bench.driver.level(OutputLine::DischargeContactor)
                        == state.discharge.is_enabled()
            } else {
                forced_defaults(state) && power_path_released(bench)
            };
            if !ok {
                failures += 1;
            }
        });
        prop_assert_eq!(failures, 0);
    }

    /// A charger contactor never closes sooner than the dead-time after the
    /// other one opened.
    #[test]
    fn handover_gap_respects_dead_time(trace in arb_trace()) {
        let bench = run_trace(&trace, |_, _| {});
        let mut last_release = [None::<u64>; 2];
        let slot = |line: OutputLine| usize::from(line == OutputLine::ExternalContactor);

        for edge in bench.driver.edges() {
            if !edge.line.is_charger_contactor() {
                continue;
            }
            let own = slot(edge.line);
            if edge.asserted {
                if let Some(released_at) = last_release[1 - own] {
                    prop_assert!(
                        edge.at - released_at >= DEAD_TIME_US,
                        "{} closed {}us after the other contactor opened",
                        edge.line,
                        edge.at - released_at
                    );
                }
            } else {
                last_release[own] = Some(edge.at);
            }
        }
    }

    /// The indicator always shows the pattern mapped from the current state.
    #[test]
    fn indicator_tracks_state_mapping(trace in arb_trace()) {
        let mut mismatches = 0usize;
        run_trace(&trace, |bench, _| {
            let controller = &bench.controller;
            let expected = controller.status_patterns().for_state(controller.state());
            if controller.indicator().active_pattern() != expected {
                mismatches += 1;
            }
        });
        prop_assert_eq!(mismatches, 0);
    }
}
