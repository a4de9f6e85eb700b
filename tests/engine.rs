use rvpipe::pipeline::{PipelineEvent, Stage};
use rvpipe::{assemble, Cpu, CpuConfig, Image, Trap};

#[test]
fn watched_instruction_reports_every_stage() {
    let program = assemble("addi x1, x0, 1\naddi x3, x0, 2\n").unwrap();
    let mut cpu = Cpu::new(CpuConfig {
        watch_pc: Some(4),
        ..CpuConfig::default()
    });
    cpu.load_program(&program).unwrap();

    let mut seen = Vec::new();
    while cpu.step().unwrap() {
        for event in cpu.events() {
            if let PipelineEvent::Watched { stage, pc } = event {
                assert_eq!(*pc, 4);
                seen.push(*stage);
            }
        }
    }
    assert_eq!(
        seen,
        vec![Stage::Fetch, Stage::Decode, Stage::Execute, Stage::Memory, Stage::WriteBack]
    );
}

#[test]
fn runaway_program_hits_the_cycle_limit() {
    let program = assemble("spin: jal x0, spin").unwrap();
    let mut cpu = Cpu::new(CpuConfig {
        max_cycles: 100,
        ..CpuConfig::default()
    });
    cpu.load_program(&program).unwrap();
    assert_eq!(cpu.run(), Err(Trap::CycleLimitExceeded { cycles: 100 }));
}

#[test]
fn illegal_and_unsupported_words_stop_the_pipeline() {
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.load_image(&Image {
        text: vec![(0, 0xFFFF_FFFF)],
        data: vec![],
    })
    .unwrap();
    assert_eq!(
        cpu.run(),
        Err(Trap::IllegalInstruction {
            pc: 0,
            word: 0xFFFF_FFFF
        })
    );

    // sltu x1, x2, x3
    cpu.load_image(&Image {
        text: vec![(0, 0x0031_30B3)],
        data: vec![],
    })
    .unwrap();
    assert_eq!(
        cpu.run(),
        Err(Trap::UnsupportedOperation {
            pc: 0,
            mnemonic: "sltu"
        })
    );
}

#[test]
fn malformed_listing_lines_are_reported() {
    let mut cpu = Cpu::new(CpuConfig::default());
    assert_eq!(
        cpu.load_text("0x0 0x00000073\n\n0x10000000 1FF\n"),
        Err(Trap::MalformedImage {
            line: 3,
            text: "0x10000000 1FF".into()
        })
    );
    assert!(matches!(cpu.load_text("zz 0x13\n"), Err(Trap::MalformedImage { line: 1, .. })));
}

#[test]
fn config_deserializes_with_defaults() {
    let cfg: CpuConfig = serde_json::from_str(r#"{ "forwarding": true, "watch_pc": 8 }"#).unwrap();
    assert_eq!(
        cfg,
        CpuConfig {
            forwarding: true,
            watch_pc: Some(8),
            ..CpuConfig::default()
        }
    );
}

#[test]
fn snapshot_serializes_the_machine_state() {
    let program = assemble("addi x1, x0, 1\nbeq x0, x0, 8\naddi x3, x0, 3\n").unwrap();
    let mut cpu = Cpu::new(CpuConfig::default());
    cpu.load_program(&program).unwrap();
    cpu.run().unwrap();

    let json = serde_json::to_value(cpu.snapshot()).unwrap();
    assert_eq!(json["halted"], true);
    assert_eq!(json["registers"][1], 1);
    assert_eq!(json["registers"][3], 0);
    assert_eq!(json["stats"]["mispredictions"], 1);
    assert_eq!(json["predictor"][0]["pc"], 4);
    assert_eq!(json["predictor"][0]["target"], 12);
}

#[test]
fn toggling_forwarding_between_runs() {
    let program = assemble("addi x5, x0, 1\nadd x6, x5, x5\n").unwrap();
    let mut cpu = Cpu::new(CpuConfig::default());

    cpu.load_program(&program).unwrap();
    assert_eq!(cpu.run().unwrap().cycles, 9);

    cpu.set_forwarding(true);
    cpu.load_program(&program).unwrap();
    assert_eq!(cpu.run().unwrap().cycles, 7);
    assert!(cpu.config().forwarding);
}
