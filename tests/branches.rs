use rvpipe::pipeline::PipelineEvent;
use rvpipe::predictor::PredictorEntry;
use rvpipe::{assemble, Cpu, CpuConfig};

fn run(src: &str, forwarding: bool) -> Cpu {
    let program = assemble(src).unwrap();
    let mut cpu = Cpu::new(CpuConfig {
        forwarding,
        ..CpuConfig::default()
    });
    cpu.load_program(&program).unwrap();
    cpu.run().unwrap();
    cpu
}

#[test]
fn taken_branch_flushes_the_wrong_path() {
    let src = "\
    addi x5, x0, 1
    beq x0, x0, skip
    addi x6, x0, 99
skip:
    addi x7, x0, 7
";
    for forwarding in [false, true] {
        let cpu = run(src, forwarding);
        assert_eq!(cpu.register(6), 0);
        assert_eq!(cpu.register(7), 7);

        let stats = cpu.stats();
        assert_eq!(stats.instructions, 3);
        assert_eq!(stats.cycles, 10);
        assert_eq!(stats.mispredictions, 1);
        assert_eq!(stats.control_hazards, 1);
        assert_eq!(stats.control_stalls, 2);
        assert_eq!(stats.stalls, 2);
        assert_eq!(stats.control_instructions, 1);
    }
}

#[test]
fn misprediction_event_names_both_addresses() {
    let program = assemble("beq x0, x0, 8\naddi x6, x0, 99\naddi x7, x0, 7").unwrap();
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.load_program(&program).unwrap();
    for _ in 0..3 {
        cpu.step().unwrap();
    }
    assert_eq!(
        cpu.events(),
        &[PipelineEvent::ControlHazard {
            pc: 0,
            fetched: Some(4),
            target: 8,
        }]
    );
    assert!(cpu.latches().if_id.is_none());
    assert!(cpu.latches().id_ex.is_none());
}

#[test]
fn not_taken_branch_costs_nothing() {
    let cpu = run("addi x5, x0, 1\nbeq x5, x0, 8\naddi x6, x0, 6\n", true);
    assert_eq!(cpu.register(6), 6);
    assert_eq!(cpu.stats().mispredictions, 0);
    assert_eq!(cpu.stats().cycles, 8);
    assert_eq!(
        cpu.predictor().entries(),
        vec![PredictorEntry {
            pc: 4,
            taken: false,
            target: None
        }]
    );
}

#[test]
fn loop_trains_the_predictor() {
    let src = "\
      addi x5, x0, 3
loop: addi x5, x5, -1
      bne x5, x0, loop
";
    let cpu = run(src, true);
    assert_eq!(cpu.register(5), 0);

    let stats = cpu.stats();
    assert_eq!(stats.instructions, 7);
    // first iteration has no history, the exit is predicted taken
    assert_eq!(stats.mispredictions, 2);
    assert_eq!(stats.cycles, 16);
    assert_eq!(
        cpu.predictor().entries(),
        vec![PredictorEntry {
            pc: 8,
            taken: false,
            target: Some(4)
        }]
    );
}

#[test]
fn call_and_return() {
    let src = "\
        addi x10, x0, 5
        jal x1, double
        addi x11, x10, 0
        jal x0, end
double:
        add x10, x10, x10
        jalr x0, x1, 0
end:
";
    for forwarding in [false, true] {
        let cpu = run(src, forwarding);
        assert_eq!(cpu.register(10), 10);
        assert_eq!(cpu.register(11), 10);
        assert_eq!(cpu.register(1), 8);
        assert_eq!(cpu.stats().mispredictions, 3);
        assert_eq!(cpu.stats().control_instructions, 3);
    }
}

#[test]
fn signed_comparisons() {
    let src = "\
        addi x1, x0, -1
        addi x3, x0, 1
        blt x1, x3, less
        addi x4, x0, 1
less:   bge x3, x1, done
        addi x4, x0, 2
done:
";
    let cpu = run(src, true);
    assert_eq!(cpu.register(4), 0);
}

#[test]
fn auipc_adds_its_own_address() {
    let cpu = run("addi x0, x0, 0\nauipc x5, 1\n", false);
    assert_eq!(cpu.register(5), 0x1004);
}
