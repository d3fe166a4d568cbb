use intcode::{Machine, Pipeline, PipelineError, RunOutcome};

const RING: [i64; 29] = [
    3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28, 1005,
    28, 6, 99, 0, 0, 5,
];

const SERIES: [i64; 25] = [
    3, 23, 3, 24, 1002, 24, 10, 24, 1002, 23, -1, 23, 101, 5, 23, 23, 1, 24, 23, 23, 4, 23, 99, 0,
    0,
];

#[test]
fn test_manual_round_robin_matches_pipeline() -> Result<(), Box<dyn std::error::Error>> {
    let phases = [9, 8, 7, 6, 5];

    let mut machines: Vec<Machine> = phases
        .iter()
        .map(|&phase| {
            let mut machine = Machine::streaming(&RING);
            machine.push_input(phase);
            machine
        })
        .collect();
    machines[0].push_input(0);

    let mut last_signal = None;
    while !machines.iter().all(Machine::is_halted) {
        for i in 0..machines.len() {
            machines[i].run(Some(3))?;
            let output = machines[i].take_output();
            if i + 1 == machines.len() {
                last_signal = output.last().copied().or(last_signal);
            }
            let next = (i + 1) % machines.len();
            machines[next].extend_input(output);
        }
    }

    let mut pipeline = Pipeline::amplifiers(&RING, &phases, true).with_turn_budget(Some(3));
    let emitted = pipeline.run(&[0])?;
    assert_eq!(last_signal, Some(139629729));
    assert_eq!(emitted.last().copied(), last_signal);

    Ok(())
}

#[test]
fn test_series_without_feedback() -> Result<(), Box<dyn std::error::Error>> {
    let mut pipeline = Pipeline::amplifiers(&SERIES, &[0, 1, 2, 3, 4], false);
    assert_eq!(pipeline.run(&[0])?, vec![54321]);
    assert_eq!(pipeline.len(), 5);

    Ok(())
}

#[test]
fn test_starved_chain_deadlocks() {
    // The first machine wants two values but only receives its phase
    let mut pipeline = Pipeline::amplifiers(&SERIES, &[0, 1], false);
    let err = pipeline.run(&[]).unwrap_err();
    assert_eq!(err, PipelineError::Deadlock { round: 2 });

    let statuses: Vec<bool> = pipeline.machines().iter().map(Machine::is_halted).collect();
    assert_eq!(statuses, vec![false, false]);
}

#[test]
fn test_zero_turn_budget_is_rejected() {
    let mut pipeline = Pipeline::amplifiers(&RING, &[9, 8, 7, 6, 5], true).with_turn_budget(Some(0));
    assert_eq!(pipeline.run(&[0]), Err(PipelineError::ZeroTurnBudget));
    assert!(pipeline.machines().iter().all(|m| m.instructions_executed() == 0));

    let mut machine = Machine::streaming(&RING);
    assert_eq!(machine.run(Some(0)), Ok(RunOutcome::BudgetExhausted));
}
