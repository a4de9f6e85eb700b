use rvpipe::hazard::{ForwardSource, Operand};
use rvpipe::pipeline::PipelineEvent;
use rvpipe::{assemble, Cpu, CpuConfig, Stats};

fn load(src: &str, forwarding: bool) -> Cpu {
    let program = assemble(src).unwrap();
    let mut cpu = Cpu::new(CpuConfig {
        forwarding,
        ..CpuConfig::default()
    });
    cpu.load_program(&program).unwrap();
    cpu
}

fn run(src: &str, forwarding: bool) -> (Cpu, Stats) {
    let mut cpu = load(src, forwarding);
    let stats = cpu.run().unwrap();
    (cpu, stats)
}

const BACK_TO_BACK: &str = "addi x5, x0, 1\nadd x6, x5, x5\n";
const ONE_APART: &str = "addi x5, x0, 1\naddi x7, x0, 2\nadd x6, x5, x5\n";
const LOAD_USE: &str = "\
.data
.word 21
.text
lui x5, 0x10000
lw x6, 0(x5)
add x7, x6, x6
";

// Detected once against EX/MEM and again against MEM/WB, one stall each;
// the value is only read from the register file after write-back.
#[test]
fn back_to_back_dependency_without_forwarding_stalls_twice() {
    let (cpu, stats) = run(BACK_TO_BACK, false);
    assert_eq!(cpu.register(6), 2);
    assert_eq!(stats.cycles, 9);
    assert_eq!(stats.stalls, 2);
    assert_eq!(stats.data_stalls, 2);
    assert_eq!(stats.data_hazards, 2);
    assert_eq!(stats.control_stalls, 0);
}

#[test]
fn back_to_back_dependency_with_forwarding_does_not_stall() {
    let (cpu, stats) = run(BACK_TO_BACK, true);
    assert_eq!(cpu.register(6), 2);
    assert_eq!(stats.cycles, 7);
    assert_eq!(stats.stalls, 0);
    assert_eq!(stats.data_hazards, 1);
}

#[test]
fn forward_events_name_the_source_buffer() {
    let mut cpu = load(BACK_TO_BACK, true);
    for _ in 0..3 {
        cpu.step().unwrap();
    }
    let forwards: Vec<_> = cpu
        .events()
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Forward(f) => Some((f.source, f.operand, f.register, f.value)),
            _ => None,
        })
        .collect();
    assert_eq!(
        forwards,
        vec![
            (ForwardSource::ExMem, Operand::Rs1, 5, 1),
            (ForwardSource::ExMem, Operand::Rs2, 5, 1),
        ]
    );
}

#[test]
fn dependency_one_apart() {
    let (cpu, stats) = run(ONE_APART, false);
    assert_eq!(cpu.register(6), 2);
    assert_eq!(stats.cycles, 9);
    assert_eq!(stats.stalls, 1);
    assert_eq!(stats.data_hazards, 1);

    let (cpu, stats) = run(ONE_APART, true);
    assert_eq!(cpu.register(6), 2);
    assert_eq!(stats.cycles, 8);
    assert_eq!(stats.stalls, 0);
    assert_eq!(stats.data_hazards, 1);
}

#[test]
fn dependency_two_apart_is_covered_by_write_back() {
    let src = "addi x5, x0, 1\naddi x7, x0, 2\naddi x8, x0, 3\nadd x6, x5, x5\n";
    for forwarding in [false, true] {
        let (cpu, stats) = run(src, forwarding);
        assert_eq!(cpu.register(6), 2);
        assert_eq!(stats.stalls, 0);
        assert_eq!(stats.data_hazards, 0);
        assert_eq!(stats.cycles, 9);
    }
}

#[test]
fn load_use_costs_one_stall_with_forwarding() {
    let (cpu, stats) = run(LOAD_USE, true);
    assert_eq!(cpu.register(7), 42);
    assert_eq!(stats.cycles, 9);
    assert_eq!(stats.stalls, 1);
    assert_eq!(stats.data_hazards, 3);
    assert_eq!(stats.data_transfer_instructions, 1);
}

#[test]
fn load_use_without_forwarding() {
    let (cpu, stats) = run(LOAD_USE, false);
    assert_eq!(cpu.register(7), 42);
    assert_eq!(stats.cycles, 12);
    assert_eq!(stats.stalls, 4);
    assert_eq!(stats.data_hazards, 4);
}

#[test]
fn operands_from_two_different_producers() {
    let src = "addi x1, x0, 3\naddi x3, x0, 4\nadd x4, x1, x3\n";
    let (cpu, stats) = run(src, true);
    assert_eq!(cpu.register(4), 7);
    assert_eq!(stats.data_hazards, 2);
    assert_eq!(stats.stalls, 0);
    assert_eq!(stats.cycles, 8);
}

#[test]
fn youngest_producer_wins() {
    let src = "addi x1, x0, 1\naddi x1, x0, 2\nadd x4, x1, x1\n";
    for forwarding in [false, true] {
        let (cpu, _) = run(src, forwarding);
        assert_eq!(cpu.register(4), 4, "forwarding = {forwarding}");
    }
    let (_, stats) = run(src, true);
    assert_eq!(stats.data_hazards, 2);
    assert_eq!(stats.stalls, 0);
}

#[test]
fn store_data_is_forwarded() {
    let src = "lui x5, 0x10000\naddi x6, x0, 77\nsw x6, 4(x5)\n";
    for forwarding in [false, true] {
        let (cpu, _) = run(src, forwarding);
        assert_eq!(cpu.read_data_word(0x1000_0004).unwrap(), 77);
    }
}

#[test]
fn x0_never_creates_a_hazard() {
    let (_, stats) = run("addi x0, x0, 1\nadd x1, x0, x0\n", false);
    assert_eq!(stats.data_hazards, 0);
    assert_eq!(stats.stalls, 0);
}

#[test]
fn stall_events_are_reported() {
    let mut cpu = load(BACK_TO_BACK, false);
    for _ in 0..3 {
        cpu.step().unwrap();
    }
    assert!(cpu
        .events()
        .iter()
        .any(|e| matches!(e, PipelineEvent::Stall { pc: 4 })));
    assert!(cpu.latches().id_ex.is_none());
    assert_eq!(cpu.latches().if_id.map(|f| f.pc), Some(4));
}
